//! Rootfs overlay merging
//!
//! Overlays live at up to three levels, merged in this order (later wins):
//!
//! - image-wide: `images/python/rootfs`
//! - version: `images/python/3/rootfs`
//! - variant: `images/python/3/<variant>/rootfs`
//!
//! Entries are replaced whole. A file from a later level replaces the earlier
//! file or link at the same relative path; contents are never combined.

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::defaults;
use crate::error::RootfsError;
use crate::infra::filesystem;

/// Existing rootfs directories for one tag, in merge order
pub fn collect_paths(image_dir: &Path, version_dir: &Path, variant_name: Option<&str>) -> Vec<PathBuf> {
    let mut candidates = vec![
        image_dir.join(defaults::ROOTFS_DIR),
        version_dir.join(defaults::ROOTFS_DIR),
    ];
    if let Some(variant) = variant_name.filter(|v| !v.is_empty()) {
        candidates.push(version_dir.join(variant).join(defaults::ROOTFS_DIR));
    }

    candidates.into_iter().filter(|p| p.is_dir()).collect()
}

/// True iff any regular file or symlink exists below any of `paths`
pub fn has_content(paths: &[PathBuf]) -> bool {
    paths.iter().any(|root| {
        WalkDir::new(root)
            .min_depth(1)
            .into_iter()
            .filter_map(Result::ok)
            .any(|entry| {
                let kind = entry.file_type();
                kind.is_file() || kind.is_symlink()
            })
    })
}

/// Merge `paths` into `dest`, later paths overriding earlier ones
pub fn merge(paths: &[PathBuf], dest: &Path) -> Result<(), RootfsError> {
    if paths.is_empty() {
        return Ok(());
    }
    filesystem::create_dir_all(dest)?;

    for root in paths {
        if !root.exists() {
            continue;
        }
        tracing::debug!("Merging rootfs layer {}", root.display());

        for entry in WalkDir::new(root).min_depth(1).follow_links(false) {
            let entry = entry.map_err(|e| RootfsError::Walk {
                path: root.clone(),
                error: e.to_string(),
            })?;
            let relative = entry.path().strip_prefix(root).map_err(|e| RootfsError::Walk {
                path: entry.path().to_path_buf(),
                error: e.to_string(),
            })?;
            let target = dest.join(relative);
            let kind = entry.file_type();

            if kind.is_dir() {
                if target.is_symlink() || target.is_file() {
                    filesystem::remove_path(&target)?;
                }
                filesystem::create_dir_all(&target)?;
                continue;
            }

            if let Some(parent) = target.parent() {
                filesystem::create_dir_all(parent)?;
            }
            filesystem::remove_path(&target)?;

            if kind.is_symlink() {
                filesystem::copy_symlink(entry.path(), &target)?;
            } else if kind.is_file() {
                filesystem::copy_file(entry.path(), &target)?;
            }
        }
    }

    Ok(())
}

fn matches_pattern(file_name: &str, pattern: &str) -> bool {
    match pattern.strip_prefix('*') {
        Some(suffix) => file_name.ends_with(suffix),
        None => file_name == pattern,
    }
}

/// Advisory scan for files that look like secrets.
///
/// Returns one message per match; never fails.
pub fn warn_sensitive(path: &Path) -> Vec<String> {
    if !path.exists() {
        return Vec::new();
    }

    let entries: Vec<PathBuf> = WalkDir::new(path)
        .min_depth(1)
        .into_iter()
        .filter_map(Result::ok)
        .map(walkdir::DirEntry::into_path)
        .collect();

    let mut warnings = Vec::new();
    for pattern in defaults::SENSITIVE_PATTERNS {
        for entry in &entries {
            let Some(name) = entry.file_name().map(|n| n.to_string_lossy()) else {
                continue;
            };
            if matches_pattern(&name, pattern) {
                warnings.push(format!(
                    "Potentially sensitive file in rootfs: {}",
                    entry.display()
                ));
            }
        }
    }
    warnings
}
