//! Build planning
//!
//! Discovers image configurations, resolves them and orders them for
//! building. Also materialises merged rootfs overlays into each tag's build
//! context.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::defaults;
use crate::core::config::ConfigLoader;
use crate::core::graph::{extract_dependencies, order_images};
use crate::core::model::{image_refs, Image, ModelResolver};
use crate::core::rootfs;
use crate::error::{ConfigError, FilesystemError, ImageManagerError, ModelError, RootfsError};
use crate::infra::filesystem;

/// Every `image.yml` below `images_dir`, sorted by path.
///
/// Rootfs overlay trees are not searched.
pub fn discover_configs(images_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    if !images_dir.is_dir() {
        return Err(ConfigError::Read {
            path: images_dir.to_path_buf(),
            error: "images directory does not exist".to_string(),
        });
    }

    let mut configs = Vec::new();
    let walker = WalkDir::new(images_dir)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !(e.file_type().is_dir() && e.file_name() == defaults::ROOTFS_DIR));

    for entry in walker {
        let entry = entry.map_err(|e| ConfigError::Read {
            path: images_dir.to_path_buf(),
            error: e.to_string(),
        })?;
        if entry.file_type().is_file() && entry.file_name() == defaults::IMAGE_CONFIG_FILE {
            configs.push(entry.into_path());
        }
    }

    configs.sort();
    Ok(configs)
}

/// Load and resolve every image below `images_dir`
pub fn load_images(images_dir: &Path) -> Result<Vec<Image>, ModelError> {
    let resolver = ModelResolver::new();
    let mut images = Vec::new();

    for config_path in discover_configs(images_dir)? {
        let config = ConfigLoader::load(&config_path)?;
        let version_dir = config_path.parent().unwrap_or(images_dir);
        images.push(resolver.resolve(&config, version_dir)?);
    }

    tracing::debug!("Loaded {} image configuration(s)", images.len());
    Ok(images)
}

/// Resolved images in build order
#[derive(Debug, Clone, Serialize)]
pub struct BuildPlan {
    /// Images, dependencies first
    pub images: Vec<Image>,
    /// Image name -> names it depends on, managed or not
    pub dependencies: BTreeMap<String, BTreeSet<String>>,
}

impl BuildPlan {
    /// Discover, resolve and sort everything below `images_dir`
    pub fn load(images_dir: &Path) -> Result<Self, ImageManagerError> {
        let images = load_images(images_dir)?;
        Self::from_images(&images)
    }

    /// Order already resolved images
    pub fn from_images(images: &[Image]) -> Result<Self, ImageManagerError> {
        let dependencies = extract_dependencies(images)?;
        let sorted = order_images(images, &dependencies)?;

        Ok(Self {
            images: sorted.into_iter().cloned().collect(),
            dependencies,
        })
    }

    /// Dependencies of one image name
    pub fn dependencies_of(&self, name: &str) -> Option<&BTreeSet<String>> {
        self.dependencies.get(name)
    }

    /// `name:tag` for every tag in build order
    pub fn refs(&self) -> Vec<String> {
        image_refs(&self.images)
    }

    /// Serialize as pretty JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// One tag's merged rootfs
#[derive(Debug, Clone, Serialize)]
pub struct MaterializedRootfs {
    /// `name:tag`
    pub reference: String,
    /// Merged tree inside the build context
    pub path: PathBuf,
    /// Sensitive-looking files found in the merged tree
    pub warnings: Vec<String>,
}

/// Build context directory of one tag
pub fn build_context(dist_dir: &Path, image: &str, tag: &str) -> PathBuf {
    dist_dir.join(image).join(tag)
}

/// Merge rootfs overlays for every tag of every image into
/// `<dist>/<image>/<tag>/rootfs`.
///
/// Tags without overlay content get no rootfs directory; a stale one from an
/// earlier run is removed.
pub fn materialize_rootfs(images: &[Image], dist_dir: &Path) -> Result<Vec<MaterializedRootfs>, RootfsError> {
    let mut materialized = Vec::new();

    for image in images {
        for (variant, tag) in image.all_tags() {
            let paths = rootfs::collect_paths(
                image.image_dir(),
                &image.path,
                variant.map(|v| v.name.as_str()),
            );
            let dest = build_context(dist_dir, &image.name, &tag.name).join(defaults::ROOTFS_DIR);
            filesystem::remove_path(&dest)?;

            if !rootfs::has_content(&paths) {
                continue;
            }

            rootfs::merge(&paths, &dest)?;
            let warnings = rootfs::warn_sensitive(&dest);
            for warning in &warnings {
                tracing::warn!("{warning}");
            }

            let reference = format!("{}:{}", image.name, tag.name);
            tracing::info!("Merged rootfs for {reference} ({} layer(s))", paths.len());
            materialized.push(MaterializedRootfs {
                reference,
                path: dest,
                warnings,
            });
        }
    }

    Ok(materialized)
}

/// One alias file in an image's dist directory
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct WrittenAlias {
    /// `name:alias`
    pub reference: String,
    /// Tag name the alias points to
    pub target: String,
    pub path: PathBuf,
}

/// Write `<dist>/<image>/<alias>` files holding the target tag name, for the
/// image aliases and every variant's aliases.
///
/// A variant alias that shares an image alias's name is not written. An
/// alias whose path is already a directory is skipped with a warning.
pub fn write_aliases(images: &[Image], dist_dir: &Path) -> Result<Vec<WrittenAlias>, FilesystemError> {
    let mut written = Vec::new();

    for image in images {
        let image_dir = dist_dir.join(&image.name);
        let variant_aliases = image
            .variants
            .iter()
            .flat_map(|v| v.aliases.iter())
            .filter(|(alias, _)| !image.aliases.contains_key(*alias));
        let aliases = image.aliases.iter().chain(variant_aliases);

        for (alias, target) in aliases {
            let path = image_dir.join(alias);
            let reference = format!("{}:{alias}", image.name);
            if path.is_dir() {
                tracing::warn!("Alias {reference} collides with a directory, skipping");
                continue;
            }

            filesystem::write_file(&path, target)?;
            tracing::debug!("{reference} -> {target}");
            written.push(WrittenAlias {
                reference,
                target: target.clone(),
                path,
            });
        }
    }

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GraphError;
    use tempfile::TempDir;

    fn write(path: &Path, content: &str) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    fn chain_project(temp: &TempDir) -> PathBuf {
        let images = temp.path().join("images");
        write(
            &images.join("app/1/image.yml"),
            "tags:\n  - name: \"1.0\"\n",
        );
        write(
            &images.join("app/1/Dockerfile.jinja2"),
            "FROM {{ \"middle\" | resolve_base_image }}\n",
        );
        write(
            &images.join("middle/1/image.yml"),
            "is_base_image: true\nname: middle\ntags:\n  - name: \"1.0\"\n",
        );
        write(
            &images.join("middle/1/Dockerfile.jinja2"),
            "FROM {{ 'base' | resolve_base_image }}\n",
        );
        write(
            &images.join("base/image.yml"),
            "is_base_image: true\ntags:\n  - name: \"24.04\"\n",
        );
        write(&images.join("base/Dockerfile.jinja2"), "FROM ubuntu:24.04\n");
        images
    }

    #[test]
    fn test_discover_configs_sorted_and_skips_rootfs() {
        let temp = TempDir::new().unwrap();
        let images = chain_project(&temp);
        write(&images.join("app/1/rootfs/etc/image.yml"), "not: config\n");

        let configs = discover_configs(&images).unwrap();
        assert_eq!(
            configs,
            vec![
                images.join("app/1/image.yml"),
                images.join("base/image.yml"),
                images.join("middle/1/image.yml"),
            ]
        );
    }

    #[test]
    fn test_discover_missing_dir() {
        let temp = TempDir::new().unwrap();
        assert!(discover_configs(&temp.path().join("nope")).is_err());
    }

    #[test]
    fn test_plan_orders_chain() {
        let temp = TempDir::new().unwrap();
        let images = chain_project(&temp);

        let plan = BuildPlan::load(&images).unwrap();
        let names: Vec<&str> = plan.images.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["base", "middle", "app"]);
        assert_eq!(plan.refs(), vec!["base:24.04", "middle:1.0", "app:1.0"]);
        assert!(plan.dependencies_of("app").unwrap().contains("middle"));

        let json = plan.to_json().unwrap();
        assert!(json.contains("\"dependencies\""));
    }

    #[test]
    fn test_plan_rejects_cycles() {
        let temp = TempDir::new().unwrap();
        let images = temp.path().join("images");
        for (name, dep) in [("a", "b"), ("b", "a")] {
            write(
                &images.join(format!("{name}/1/image.yml")),
                "tags:\n  - name: \"1\"\n",
            );
            write(
                &images.join(format!("{name}/1/Dockerfile.jinja2")),
                &format!("FROM {{{{ \"{dep}\" | resolve_base_image }}}}\n"),
            );
        }

        let err = BuildPlan::load(&images).unwrap_err();
        assert!(matches!(
            err,
            ImageManagerError::Graph(GraphError::CyclicDependency { .. })
        ));
    }

    #[test]
    fn test_invalid_config_fails_with_path() {
        let temp = TempDir::new().unwrap();
        let images = temp.path().join("images");
        write(&images.join("broken/1/image.yml"), "tags: []\nvariants:\n  - name: x\n");

        let err = load_images(&images).unwrap_err();
        assert!(err.to_string().contains("broken"));
    }

    #[test]
    fn test_materialize_rootfs_layers_and_variants() {
        let temp = TempDir::new().unwrap();
        let images = temp.path().join("images");
        write(
            &images.join("tool/1/image.yml"),
            "tags:\n  - name: \"1.0\"\nvariants:\n  - name: dev\n    tag_suffix: -dev\n",
        );
        write(&images.join("tool/1/Dockerfile.jinja2"), "FROM ubuntu:24.04\n");
        write(&images.join("tool/rootfs/etc/motd"), "image");
        write(&images.join("tool/1/rootfs/etc/version"), "1");
        write(&images.join("tool/1/dev/rootfs/etc/motd"), "dev");
        write(&images.join("tool/1/dev/rootfs/root/.env"), "TOKEN=x");

        let dist = temp.path().join("dist");
        std::fs::create_dir_all(dist.join("tool/1.0/rootfs/stale")).unwrap();

        let loaded = load_images(&images).unwrap();
        let done = materialize_rootfs(&loaded, &dist).unwrap();

        assert_eq!(done.len(), 2);
        let base = dist.join("tool/1.0/rootfs");
        assert_eq!(std::fs::read_to_string(base.join("etc/motd")).unwrap(), "image");
        assert_eq!(std::fs::read_to_string(base.join("etc/version")).unwrap(), "1");
        assert!(!base.join("stale").exists());

        let dev = dist.join("tool/1.0-dev/rootfs");
        assert_eq!(std::fs::read_to_string(dev.join("etc/motd")).unwrap(), "dev");
        assert_eq!(done[1].reference, "tool:1.0-dev");
        assert_eq!(done[1].warnings.len(), 1);
    }

    #[test]
    fn test_materialize_skips_empty_overlays() {
        let temp = TempDir::new().unwrap();
        let images = temp.path().join("images");
        write(&images.join("tool/1/image.yml"), "tags:\n  - name: \"1\"\n");
        write(&images.join("tool/1/Dockerfile.jinja2"), "FROM scratch\n");
        std::fs::create_dir_all(images.join("tool/rootfs/empty/dirs")).unwrap();

        let dist = temp.path().join("dist");
        let done = materialize_rootfs(&load_images(&images).unwrap(), &dist).unwrap();
        assert!(done.is_empty());
        assert!(!dist.join("tool/1/rootfs").exists());
    }

    #[test]
    fn test_write_aliases_for_images_and_variants() {
        let temp = TempDir::new().unwrap();
        let images = temp.path().join("images");
        write(
            &images.join("tool/1/image.yml"),
            "tags:\n  - name: \"1.2.3\"\n  - name: \"1.2.0\"\nvariants:\n  - name: slim\n    tag_suffix: \"-slim\"\n",
        );
        write(&images.join("tool/1/Dockerfile.jinja2"), "FROM scratch\n");
        let dist = temp.path().join("dist");
        std::fs::create_dir_all(dist.join("tool/1.2")).unwrap();

        let written = write_aliases(&load_images(&images).unwrap(), &dist).unwrap();

        assert_eq!(std::fs::read_to_string(dist.join("tool/1")).unwrap(), "1.2.3");
        assert_eq!(
            std::fs::read_to_string(dist.join("tool/1-slim")).unwrap(),
            "1.2.3-slim"
        );
        assert!(dist.join("tool/1.2").is_dir());
        assert!(written.iter().all(|a| a.reference != "tool:1.2"));
        assert!(written.iter().any(|a| a.reference == "tool:1.2-slim"));
        assert_eq!(written.iter().filter(|a| a.reference == "tool:1").count(), 1);
        assert_eq!(
            std::fs::read_to_string(dist.join("tool/1.2-slim")).unwrap(),
            "1.2.3-slim"
        );
    }
}
