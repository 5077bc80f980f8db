//! Package locking
//!
//! Pins OS package versions and base image digests for the tags of one
//! image. Tags are grouped by their effective OS base; each base gets one
//! lock section.
//!
//! Package versions are looked up over a bounded worker pool and collected
//! in completion order, so one slow lookup never holds up the others.

use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::config::defaults;
use crate::core::lock::{extract_base_image, extract_packages, LockFile, LockSection};
use crate::core::model::Image;
use crate::error::{LockError, LockWarning};
use crate::infra::tools::ImageInspector;
use crate::registry::{PackageIndexClient, ReleaseCache};

/// Outcome of locking one image
#[derive(Debug, Clone)]
pub struct LockReport {
    /// Lock file that was written
    pub lock_path: PathBuf,
    /// Sections written, by base reference
    pub sections: BTreeMap<String, LockSection>,
    /// Bases whose existing sections were kept as they were
    pub reused: Vec<String>,
    /// Non-fatal problems, in the order they were found
    pub warnings: Vec<LockWarning>,
}

/// Split `image:tag`
pub fn parse_reference(reference: &str) -> Result<(&str, &str), LockError> {
    match reference.split_once(':') {
        Some((name, tag)) if !name.is_empty() && !tag.is_empty() => Ok((name, tag)),
        _ => Err(LockError::InvalidReference {
            reference: reference.to_string(),
        }),
    }
}

/// Group references by the managed image that owns their tag.
///
/// Groups keep the order in which their first reference appears.
pub fn group_references<'a>(
    images: &'a [Image],
    references: &[String],
) -> Result<Vec<(&'a Image, Vec<String>)>, LockError> {
    let mut groups: Vec<(&Image, Vec<String>)> = Vec::new();

    for reference in references {
        let (name, tag) = parse_reference(reference)?;
        let owner = images
            .iter()
            .find(|image| image.name == name && image.find_tag(tag).is_some())
            .ok_or_else(|| LockError::UnknownReference {
                reference: reference.clone(),
            })?;

        match groups.iter_mut().find(|(image, _)| std::ptr::eq(*image, owner)) {
            Some((_, tags)) => tags.push(tag.to_string()),
            None => groups.push((owner, vec![tag.to_string()])),
        }
    }

    Ok(groups)
}

/// Lock file location for an image: next to its image.yml
pub fn lock_path_for(image: &Image) -> PathBuf {
    image.path.join(defaults::LOCK_FILE)
}

/// Resolves and writes lock data
pub struct PackageLocker<'a> {
    client: PackageIndexClient,
    cache: &'a ReleaseCache,
    inspector: &'a dyn ImageInspector,
    dist_dir: PathBuf,
    workers: usize,
}

impl<'a> PackageLocker<'a> {
    /// Create a locker reading generated build files from `dist_dir`
    pub fn new(
        client: PackageIndexClient,
        cache: &'a ReleaseCache,
        inspector: &'a dyn ImageInspector,
        dist_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            client,
            cache,
            inspector,
            dist_dir: dist_dir.into(),
            workers: defaults::DEFAULT_LOCK_WORKERS,
        }
    }

    /// Set the worker pool width
    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Generated build file of one tag
    pub fn build_file(&self, image: &str, tag: &str) -> PathBuf {
        self.dist_dir.join(image).join(tag).join(defaults::BUILD_FILE)
    }

    /// Effective OS base of a build file, e.g. `ubuntu:24.04`.
    ///
    /// Follows managed-image `FROM` chains through already generated build
    /// files, preferring a built archive's detected distribution when one
    /// exists.
    pub async fn resolve_base(&self, build_file: &Path) -> Option<String> {
        let mut visited = BTreeSet::new();
        let mut current = build_file.to_path_buf();

        loop {
            if !visited.insert(current.clone()) {
                tracing::debug!("FROM chain loops back to {}", current.display());
                return None;
            }

            let content = std::fs::read_to_string(&current).ok()?;
            let (image, tag) = extract_base_image(&content)?;

            if image == defaults::SUPPORTED_DISTRO {
                if tag.starts_with("sha256:") {
                    let archive = current.parent()?.join(defaults::IMAGE_ARCHIVE);
                    return self.archive_base(&archive).await;
                }
                return Some(format!("{image}:{tag}"));
            }

            if image.contains('/') || defaults::EXTERNAL_DISTROS.contains(&image.as_str()) {
                return None;
            }

            let context = self.dist_dir.join(&image).join(&tag);
            if let Some(base) = self.archive_base(&context.join(defaults::IMAGE_ARCHIVE)).await {
                return Some(base);
            }

            current = context.join(defaults::BUILD_FILE);
            if !current.exists() {
                return None;
            }
        }
    }

    async fn archive_base(&self, archive: &Path) -> Option<String> {
        if !archive.exists() {
            return None;
        }
        let distro = self.inspector.distro(archive).await?;
        if distro.id.as_deref() != Some(defaults::SUPPORTED_DISTRO) {
            return None;
        }
        Some(format!("{}:{}", defaults::SUPPORTED_DISTRO, distro.version_id?))
    }

    /// Look up package versions over the worker pool.
    ///
    /// Returns the resolved versions and the sorted names that could not be
    /// resolved.
    pub async fn resolve_versions<I>(&self, codename: &str, packages: I) -> (BTreeMap<String, String>, Vec<String>)
    where
        I: IntoIterator<Item = String>,
    {
        let client = self.client.clone();
        let codename = codename.to_string();

        lookup_all(self.workers, packages, move |package| {
            let client = client.clone();
            let codename = codename.clone();
            async move { client.package_version(&codename, &package).await }
        })
        .await
    }

    /// Lock `tags` of `image` into `lock_path`
    pub async fn lock(&self, image: &str, tags: &[String], lock_path: &Path) -> Result<LockReport, LockError> {
        let mut warnings = Vec::new();
        let mut groups: BTreeMap<String, Vec<String>> = BTreeMap::new();
        let mut found_build_file = false;

        for tag in tags {
            let build_file = self.build_file(image, tag);
            if !build_file.exists() {
                tracing::debug!("No build file at {}", build_file.display());
                continue;
            }
            found_build_file = true;

            if let Some(base) = self.resolve_base(&build_file).await {
                groups.entry(base).or_default().push(tag.clone());
            } else {
                warn(
                    &mut warnings,
                    LockWarning::BaseUndetermined {
                        reference: format!("{image}:{tag}"),
                    },
                );
            }
        }

        if !found_build_file {
            return Err(LockError::NoBuildFiles {
                image: image.to_string(),
            });
        }

        tracing::info!("Found {} base image(s) for {image}", groups.len());
        for (base, base_tags) in &groups {
            tracing::info!("  {base}: {} tags", base_tags.len());
        }

        let existing = LockFile::load(lock_path)?.sections();
        let mut sections = BTreeMap::new();
        let mut reused = Vec::new();

        for (base, base_tags) in &groups {
            if let Some(section) = existing.get(base).filter(|s| !s.packages.is_empty()) {
                tracing::info!(
                    "Using {} existing locked packages for {base}",
                    section.packages.len()
                );
                sections.insert(base.clone(), section.clone());
                reused.push(base.clone());
                continue;
            }

            if let Some(section) = self.lock_base(image, base, base_tags, &mut warnings).await {
                sections.insert(base.clone(), section);
            }
        }

        if sections.is_empty() {
            return Err(LockError::NothingLocked {
                image: image.to_string(),
            });
        }

        LockFile::new(sections.clone()).save(lock_path)?;
        tracing::info!("Wrote {}", lock_path.display());

        Ok(LockReport {
            lock_path: lock_path.to_path_buf(),
            sections,
            reused,
            warnings,
        })
    }

    async fn lock_base(
        &self,
        image: &str,
        base: &str,
        tags: &[String],
        warnings: &mut Vec<LockWarning>,
    ) -> Option<LockSection> {
        let version = base.split_once(':').map_or(base, |(_, v)| v);
        let codename = match self.cache.codename(&self.client, version).await {
            Ok(codename) => codename,
            Err(e) => {
                warn(
                    warnings,
                    LockWarning::CodenameUnresolved {
                        base: base.to_string(),
                        reason: e.to_string(),
                    },
                );
                return None;
            }
        };
        tracing::info!("Processing {base} ({codename})");

        let packages: BTreeSet<String> = tags
            .iter()
            .filter_map(|tag| std::fs::read_to_string(self.build_file(image, tag)).ok())
            .flat_map(|content| extract_packages(&content))
            .collect();

        if packages.is_empty() {
            warn(
                warnings,
                LockWarning::NoPackages {
                    base: base.to_string(),
                },
            );
            return None;
        }
        tracing::info!("  {} unique packages", packages.len());

        let (locked, missing) = self.resolve_versions(&codename, packages).await;
        for package in missing {
            warn(
                warnings,
                LockWarning::PackageUnresolved {
                    base: base.to_string(),
                    package,
                },
            );
        }

        let digest = self.inspector.digest(base).await;
        match &digest {
            Some(digest) => tracing::info!("  Digest: {digest}"),
            None => warn(
                warnings,
                LockWarning::DigestUnresolved {
                    base: base.to_string(),
                },
            ),
        }

        Some(LockSection {
            digest,
            codename: Some(codename),
            packages: locked,
        })
    }
}

/// Run `lookup` for every package with at most `workers` in flight.
///
/// A package whose lookup yields nothing, or whose task fails, is reported
/// in the sorted missing list.
async fn lookup_all<I, F, Fut>(workers: usize, packages: I, lookup: F) -> (BTreeMap<String, String>, Vec<String>)
where
    I: IntoIterator<Item = String>,
    F: Fn(String) -> Fut,
    Fut: Future<Output = Option<String>> + Send + 'static,
{
    let semaphore = Arc::new(Semaphore::new(workers.max(1)));
    let mut tasks = JoinSet::new();
    let mut pending = BTreeSet::new();

    for package in packages {
        pending.insert(package.clone());
        let semaphore = Arc::clone(&semaphore);
        let version = lookup(package.clone());

        tasks.spawn(async move {
            let _permit = semaphore.acquire_owned().await.ok();
            (package, version.await)
        });
    }

    let mut locked = BTreeMap::new();
    let mut missing = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((package, version)) => {
                pending.remove(&package);
                match version {
                    Some(version) => {
                        tracing::debug!("{package} = {version}");
                        locked.insert(package, version);
                    }
                    None => missing.push(package),
                }
            }
            Err(e) => tracing::warn!("Package lookup task failed: {e}"),
        }
    }
    missing.extend(pending);
    missing.sort();

    (locked, missing)
}

fn warn(warnings: &mut Vec<LockWarning>, warning: LockWarning) {
    tracing::warn!("{warning}");
    warnings.push(warning);
}
