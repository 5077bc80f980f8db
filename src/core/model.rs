//! Resolved image model
//!
//! [`ModelResolver`] turns a validated [`ImageConfig`] into an immutable
//! [`Image`]: tags with merged versions and variables, variants with their
//! generated tags, automatic aliases and resolved template paths. Resolved
//! objects are built once and then only shared by reference.

use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::config::defaults;
use crate::core::alias::generate_semver_aliases;
use crate::core::config::ImageConfig;
use crate::core::merge::merge;
use crate::core::tags::TagGenerator;
use crate::core::template::TemplateResolver;
use crate::error::{ModelError, TemplateError};

/// Resolved tag with merged versions and variables
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Tag {
    pub name: String,
    pub versions: BTreeMap<String, String>,
    pub variables: BTreeMap<String, String>,
    pub rootfs_user: String,
    pub rootfs_copy: bool,
}

/// Resolved variant with generated tags
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Variant {
    pub name: String,
    pub template_path: PathBuf,
    pub tags: Vec<Tag>,
    /// alias → tag name, every target is one of `tags`
    pub aliases: BTreeMap<String, String>,
    pub rootfs_user: String,
    pub rootfs_copy: bool,
}

/// Fully resolved image with all computed data
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Image {
    pub name: String,
    /// Version directory holding the image.yml
    pub path: PathBuf,
    pub template_path: PathBuf,
    pub versions: BTreeMap<String, String>,
    pub variables: BTreeMap<String, String>,
    pub tags: Vec<Tag>,
    pub variants: Vec<Variant>,
    pub is_base_image: bool,
    pub extends: Option<String>,
    pub aliases: BTreeMap<String, String>,
    pub rootfs_user: String,
    pub rootfs_copy: bool,
}

impl Image {
    /// `name:tag` for a base image with exactly one tag
    pub fn qualified_base_name(&self) -> Option<String> {
        match (self.is_base_image, self.tags.as_slice()) {
            (true, [tag]) => Some(format!("{}:{}", self.name, tag.name)),
            _ => None,
        }
    }

    /// Image-wide directory, the parent of the version directory
    pub fn image_dir(&self) -> &Path {
        self.path.parent().unwrap_or(&self.path)
    }

    /// All buildable tags: base tags first, then each variant's tags
    pub fn all_tags(&self) -> impl Iterator<Item = (Option<&Variant>, &Tag)> {
        self.tags.iter().map(|t| (None, t)).chain(
            self.variants
                .iter()
                .flat_map(|v| v.tags.iter().map(move |t| (Some(v), t))),
        )
    }

    /// Find a base or variant tag by name
    pub fn find_tag(&self, name: &str) -> Option<(Option<&Variant>, &Tag)> {
        self.all_tags().find(|(_, tag)| tag.name == name)
    }
}

/// Find the one managed base image named `name` and return its qualified
/// reference, suffixed with `-<snapshot_id>` when given.
///
/// Zero matches or several matches are errors.
pub fn resolve_base_image<'a, I>(
    images: I,
    name: &str,
    snapshot_id: Option<&str>,
) -> Result<String, ModelError>
where
    I: IntoIterator<Item = &'a Image>,
{
    let found: Vec<&Image> = images
        .into_iter()
        .filter(|i| i.is_base_image && i.name == name)
        .collect();

    let image = match found.as_slice() {
        [] => {
            return Err(ModelError::BaseImageNotFound {
                name: name.to_string(),
            })
        }
        [image] => *image,
        many => {
            return Err(ModelError::AmbiguousBaseImage {
                name: name.to_string(),
                count: many.len(),
            })
        }
    };

    let reference = image
        .qualified_base_name()
        .ok_or_else(|| ModelError::BaseImageTagCount {
            name: name.to_string(),
            count: image.tags.len(),
        })?;

    Ok(match snapshot_id {
        Some(id) if !id.is_empty() => format!("{reference}-{id}"),
        _ => reference,
    })
}

/// `name:tag` references for every tag of every image, in the given order
pub fn image_refs<'a, I>(images: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a Image>,
{
    images
        .into_iter()
        .flat_map(|image| {
            image
                .all_tags()
                .map(move |(_, tag)| format!("{}:{}", image.name, tag.name))
        })
        .collect()
}

/// Transforms config objects into resolved domain models
#[derive(Debug, Default, Clone)]
pub struct ModelResolver {
    template_resolver: TemplateResolver,
}

impl ModelResolver {
    /// Create a new resolver
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve a config into a fully computed [`Image`].
    ///
    /// `path` is the version directory holding the image.yml, e.g.
    /// `images/python/3`.
    pub fn resolve(&self, config: &ImageConfig, path: &Path) -> Result<Image, ModelError> {
        let templates_dir = templates_dir_for(path);
        let template_err = |source: TemplateError| ModelError::Template {
            path: path.to_path_buf(),
            source,
        };

        let template_path = self
            .template_resolver
            .resolve(&templates_dir, config.template.as_deref(), None)
            .map_err(template_err)?;

        let image_rootfs_user = config
            .rootfs_user
            .clone()
            .unwrap_or_else(|| defaults::DEFAULT_ROOTFS_USER.to_string());
        let image_rootfs_copy = config.rootfs_copy.unwrap_or(defaults::DEFAULT_ROOTFS_COPY);

        let tags: Vec<Tag> = config
            .tags
            .iter()
            .map(|tag| Tag {
                name: tag.name.clone(),
                versions: merge(&config.versions, &tag.versions),
                variables: merge(&config.variables, &tag.variables),
                rootfs_user: tag
                    .rootfs_user
                    .clone()
                    .unwrap_or_else(|| image_rootfs_user.clone()),
                rootfs_copy: tag.rootfs_copy.unwrap_or(image_rootfs_copy),
            })
            .collect();

        let aliases = generate_semver_aliases(&tags);

        let mut variants = Vec::with_capacity(config.variants.len());
        for variant in &config.variants {
            let variant_template = self
                .template_resolver
                .resolve(
                    &templates_dir,
                    variant.template.as_deref(),
                    Some(&variant.name),
                )
                .map_err(template_err)?;

            let variant_tags = TagGenerator::generate_variant_tags(
                &tags,
                variant,
                &config.versions,
                &config.variables,
            );

            // Re-suffixed base aliases are registered last and win collisions.
            let mut variant_aliases = generate_semver_aliases(&variant_tags);
            for (alias, target) in &aliases {
                variant_aliases.insert(
                    format!("{alias}{}", variant.tag_suffix),
                    format!("{target}{}", variant.tag_suffix),
                );
            }

            variants.push(Variant {
                name: variant.name.clone(),
                template_path: variant_template,
                tags: variant_tags,
                aliases: variant_aliases,
                rootfs_user: variant
                    .rootfs_user
                    .clone()
                    .unwrap_or_else(|| image_rootfs_user.clone()),
                rootfs_copy: variant.rootfs_copy.unwrap_or(image_rootfs_copy),
            });
        }

        let name = image_name(config, path)?;
        tracing::debug!(
            "Resolved image '{name}' from {} ({} tags, {} variants)",
            path.display(),
            tags.len(),
            variants.len()
        );

        Ok(Image {
            name,
            path: path.to_path_buf(),
            template_path,
            versions: config.versions.clone(),
            variables: config.variables.clone(),
            tags,
            variants,
            is_base_image: config.is_base_image,
            extends: config.extends.clone(),
            aliases,
            rootfs_user: image_rootfs_user,
            rootfs_copy: image_rootfs_copy,
        })
    }
}

/// Sibling `templates/` directory if present, else the version directory
fn templates_dir_for(path: &Path) -> PathBuf {
    path.parent()
        .map(|parent| parent.join(defaults::TEMPLATES_DIR))
        .filter(|dir| dir.is_dir())
        .unwrap_or_else(|| path.to_path_buf())
}

/// Derive the image name.
///
/// Explicit names win. Base images (flagged, or living under a `base`
/// directory) use their own directory name, e.g. `images/base/ubuntu` →
/// `ubuntu`. Everything else uses the parent directory, e.g.
/// `images/python/3` → `python`.
fn image_name(config: &ImageConfig, path: &Path) -> Result<String, ModelError> {
    if let Some(name) = &config.name {
        return Ok(name.clone());
    }

    let under_base = path.components().any(|c| c.as_os_str() == "base");
    let source = if config.is_base_image || under_base {
        path.file_name()
    } else {
        path.parent().and_then(Path::file_name)
    };

    source
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| ModelError::UnnamedImage {
            path: path.to_path_buf(),
        })
}
