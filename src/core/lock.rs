//! Lock file handling
//!
//! The lock file (packages.lock) records pinned package versions and base
//! image digests for reproducible builds, one section per OS base:
//!
//! ```yaml
//! _meta:
//!   generated_by: image-manager lock
//!   source: packages.ubuntu.com
//!   date: 2025-01-01T00:00:00+00:00
//! bases:
//!   ubuntu:24.04:
//!     digest: sha256:...
//!     codename: noble
//!     packages:
//!       curl: 8.5.0-2ubuntu10.6
//! ```
//!
//! The older single-base layout (`_meta.base {original, digest}` plus a
//! top-level `packages` map) is still read.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::OnceLock;

use crate::error::LockError;
use crate::infra::filesystem;

/// Written into `_meta.generated_by`
pub const GENERATED_BY: &str = "image-manager lock";

/// Written into `_meta.source`
pub const PACKAGE_SOURCE: &str = "packages.ubuntu.com";

/// Pinned data for one OS base
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct LockSection {
    /// Content digest, `None` when it could not be resolved
    #[serde(default)]
    pub digest: Option<String>,

    /// Release codename the packages were resolved against
    #[serde(default)]
    pub codename: Option<String>,

    /// Package name -> version
    #[serde(default)]
    pub packages: BTreeMap<String, String>,
}

/// `_meta` block
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LockMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_by: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,

    /// Legacy single-base pin: `{original, digest}`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base: Option<serde_yaml::Value>,
}

/// Lock file structure, current or legacy layout
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LockFile {
    #[serde(rename = "_meta", default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<LockMeta>,

    /// Current layout: base reference -> section
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bases: Option<BTreeMap<String, LockSection>>,

    /// Legacy layout: packages of the single base
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub packages: Option<BTreeMap<String, String>>,
}

impl LockFile {
    /// Create a current-layout lock file stamped with the current time
    pub fn new(bases: BTreeMap<String, LockSection>) -> Self {
        Self {
            meta: Some(LockMeta {
                generated_by: Some(GENERATED_BY.to_string()),
                source: Some(PACKAGE_SOURCE.to_string()),
                date: Some(chrono::Utc::now().to_rfc3339()),
                base: None,
            }),
            bases: Some(bases),
            packages: None,
        }
    }

    /// Parse from YAML. Empty content is an empty lock file.
    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content)
    }

    /// Serialize to YAML
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }

    /// Load from disk. A missing file is an empty lock file.
    pub fn load(path: &Path) -> Result<Self, LockError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = filesystem::read_file(path).map_err(|e| LockError::Read {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;
        Self::from_yaml(&content).map_err(|e| LockError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })
    }

    /// Write to disk, creating parent directories
    pub fn save(&self, path: &Path) -> Result<(), LockError> {
        let write_err = |error: String| LockError::Write {
            path: path.to_path_buf(),
            error,
        };
        let content = self.to_yaml().map_err(|e| write_err(e.to_string()))?;
        filesystem::write_file(path, &content).map_err(|e| write_err(e.to_string()))
    }

    /// Packages pinned for `base_ref`.
    ///
    /// In the current layout an unknown or absent `base_ref` falls back to
    /// the first section. The legacy layout ignores `base_ref`.
    pub fn packages_for(&self, base_ref: Option<&str>) -> BTreeMap<String, String> {
        match &self.bases {
            Some(bases) => base_ref
                .and_then(|r| bases.get(r))
                .or_else(|| bases.values().next())
                .map(|section| section.packages.clone())
                .unwrap_or_default(),
            None => self.packages.clone().unwrap_or_default(),
        }
    }

    /// `(original reference, digest)` pinned for `base_ref`, if any
    pub fn digest_for(&self, base_ref: Option<&str>) -> Option<(String, String)> {
        if let Some(bases) = &self.bases {
            let base_ref = base_ref?;
            let digest = bases.get(base_ref)?.digest.clone()?;
            return Some((base_ref.to_string(), digest));
        }

        let base = self.meta.as_ref()?.base.as_ref()?;
        let original = base.get("original")?.as_str()?;
        let digest = base.get("digest")?.as_str()?;
        if original.is_empty() || digest.is_empty() {
            return None;
        }
        Some((original.to_string(), digest.to_string()))
    }

    /// Every section of the current layout; empty for legacy files
    pub fn sections(&self) -> BTreeMap<String, LockSection> {
        self.bases.clone().unwrap_or_default()
    }
}

fn from_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)^FROM\s+(?:--\S+\s+)*([^\s:@]+)(?:[:@](\S+))?(?:\s+AS\s+\w+)?$")
            .expect("FROM pattern is valid")
    })
}

fn apt_install_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?mi)apt-get\s+install\s+(?:-[a-zA-Z]+\s+)*(.+?)(?:\s*&&|\s*$|\s*;)")
            .expect("apt-get install pattern is valid")
    })
}

/// Effective base of a build file: `(image, tag or digest)` of the last
/// `FROM` line. A missing tag means `latest`.
pub fn extract_base_image(build_file: &str) -> Option<(String, String)> {
    build_file
        .lines()
        .filter_map(|line| from_pattern().captures(line.trim()))
        .last()
        .map(|cap| {
            let image = cap[1].to_string();
            let tag = cap
                .get(2)
                .map_or_else(|| "latest".to_string(), |m| m.as_str().to_string());
            (image, tag)
        })
}

/// Package names from every `apt-get install` invocation.
///
/// Line continuations are joined first. Flags and already-pinned
/// `name=version` tokens are skipped.
pub fn extract_packages(build_file: &str) -> Vec<String> {
    let joined = build_file.replace("\\\n", " ");

    apt_install_pattern()
        .captures_iter(&joined)
        .flat_map(|cap| {
            cap[1]
                .split_whitespace()
                .filter(|token| !token.starts_with('-') && !token.contains('='))
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .collect()
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-' || c == '='
}

/// Pin every unpinned occurrence of each package to `name=version`
pub fn rewrite_apt_install(build_file: &str, packages: &BTreeMap<String, String>) -> String {
    let mut result = build_file.to_string();

    for (package, version) in packages {
        if package.is_empty() {
            continue;
        }
        let mut out = String::with_capacity(result.len());
        let mut rest = result.as_str();

        while let Some(pos) = rest.find(package.as_str()) {
            let end = pos + package.len();
            let before = rest[..pos].chars().next_back();
            let after = rest[end..].chars().next();
            let standalone = !before.is_some_and(is_name_char) && !after.is_some_and(is_name_char);

            out.push_str(&rest[..pos]);
            if standalone {
                out.push_str(&format!("{package}={version}"));
            } else {
                out.push_str(package);
            }
            rest = &rest[end..];
        }
        out.push_str(rest);
        result = out;
    }

    result
}

/// Rewrite `FROM image:tag [AS name]` lines to `FROM image@digest [AS name]`
pub fn rewrite_from_digest(build_file: &str, original_ref: &str, digest: &str) -> String {
    let (image, tag) = original_ref
        .split_once(':')
        .unwrap_or((original_ref, "latest"));

    let pattern = format!(
        r"(?mi)^(FROM\s+){}:{}(\s+AS\s+\w+)?$",
        regex::escape(image),
        regex::escape(tag)
    );
    let Ok(re) = Regex::new(&pattern) else {
        return build_file.to_string();
    };

    re.replace_all(build_file, |cap: &regex::Captures<'_>| {
        format!(
            "{}{image}@{digest}{}",
            &cap[1],
            cap.get(2).map_or("", |m| m.as_str())
        )
    })
    .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::generators::{image_name, sha256_digest};
    use proptest::prelude::*;
    use tempfile::TempDir;

    fn pkgs(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    const CURRENT: &str = r"
_meta:
  generated_by: image-manager lock
  source: packages.ubuntu.com
  date: '2025-01-01T00:00:00+00:00'
bases:
  ubuntu:22.04:
    digest: sha256:aaa
    codename: jammy
    packages:
      curl: 7.81.0-1ubuntu1.16
  ubuntu:24.04:
    digest: null
    codename: noble
    packages:
      curl: 8.5.0-2ubuntu10.6
      git: 1:2.43.0-1ubuntu7
";

    const LEGACY: &str = r"
_meta:
  base:
    original: ubuntu:24.04
    digest: sha256:bbb
packages:
  curl: 8.5.0-2ubuntu10.6
";

    #[test]
    fn test_current_layout_packages() {
        let lock = LockFile::from_yaml(CURRENT).unwrap();

        assert_eq!(
            lock.packages_for(Some("ubuntu:24.04")),
            pkgs(&[("curl", "8.5.0-2ubuntu10.6"), ("git", "1:2.43.0-1ubuntu7")])
        );
        // Unknown and absent references fall back to the first section.
        assert_eq!(
            lock.packages_for(Some("ubuntu:20.04")),
            pkgs(&[("curl", "7.81.0-1ubuntu1.16")])
        );
        assert_eq!(lock.packages_for(None), pkgs(&[("curl", "7.81.0-1ubuntu1.16")]));
        assert_eq!(lock.sections().len(), 2);
    }

    #[test]
    fn test_current_layout_digest() {
        let lock = LockFile::from_yaml(CURRENT).unwrap();

        assert_eq!(
            lock.digest_for(Some("ubuntu:22.04")),
            Some(("ubuntu:22.04".to_string(), "sha256:aaa".to_string()))
        );
        assert_eq!(lock.digest_for(Some("ubuntu:24.04")), None);
        assert_eq!(lock.digest_for(None), None);
    }

    #[test]
    fn test_legacy_layout_is_readable() {
        let lock = LockFile::from_yaml(LEGACY).unwrap();

        assert_eq!(
            lock.packages_for(Some("anything")),
            pkgs(&[("curl", "8.5.0-2ubuntu10.6")])
        );
        assert_eq!(
            lock.digest_for(None),
            Some(("ubuntu:24.04".to_string(), "sha256:bbb".to_string()))
        );
        assert!(lock.sections().is_empty());
    }

    #[test]
    fn test_empty_and_missing_files() {
        let lock = LockFile::from_yaml("  \n").unwrap();
        assert!(lock.packages_for(None).is_empty());

        let temp = TempDir::new().unwrap();
        let lock = LockFile::load(&temp.path().join("packages.lock")).unwrap();
        assert_eq!(lock, LockFile::default());
    }

    #[test]
    fn test_invalid_yaml_is_a_parse_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("packages.lock");
        std::fs::write(&path, "bases: [not, a, map").unwrap();

        assert!(matches!(LockFile::load(&path), Err(LockError::Parse { .. })));
    }

    #[test]
    fn test_save_writes_meta_and_sections() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested/packages.lock");

        let mut bases = BTreeMap::new();
        bases.insert(
            "ubuntu:24.04".to_string(),
            LockSection {
                digest: Some("sha256:ccc".to_string()),
                codename: Some("noble".to_string()),
                packages: pkgs(&[("curl", "8.5.0")]),
            },
        );
        LockFile::new(bases.clone()).save(&path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("_meta:"));
        assert!(content.contains("generated_by: image-manager lock"));

        let loaded = LockFile::load(&path).unwrap();
        assert_eq!(loaded.sections(), bases);
        let meta = loaded.meta.unwrap();
        assert_eq!(meta.source.as_deref(), Some(PACKAGE_SOURCE));
        assert!(meta.date.is_some());
    }

    #[test]
    fn test_extract_base_image_last_from_wins() {
        let build_file = "\
FROM golang:1.22 AS builder
RUN go build
FROM ubuntu:24.04
COPY --from=builder /app /app
";
        assert_eq!(
            extract_base_image(build_file),
            Some(("ubuntu".to_string(), "24.04".to_string()))
        );
    }

    #[test]
    fn test_extract_base_image_digest_and_latest() {
        assert_eq!(
            extract_base_image("FROM ubuntu@sha256:abc123\n"),
            Some(("ubuntu".to_string(), "sha256:abc123".to_string()))
        );
        assert_eq!(
            extract_base_image("from python AS base\n"),
            Some(("python".to_string(), "latest".to_string()))
        );
        assert_eq!(
            extract_base_image("FROM --platform=linux/amd64 ubuntu:22.04\n"),
            Some(("ubuntu".to_string(), "22.04".to_string()))
        );
        assert_eq!(extract_base_image("RUN echo hi\n"), None);
    }

    #[test]
    fn test_extract_packages() {
        let build_file = "\
RUN apt-get update && apt-get install -y --no-install-recommends \\
    curl \\
    ca-certificates \\
    git=1:2.43.0 \\
    && rm -rf /var/lib/apt/lists/*
RUN apt-get install -y jq; echo done
";
        assert_eq!(
            extract_packages(build_file),
            vec!["curl", "ca-certificates", "jq"]
        );
    }

    #[test]
    fn test_extract_packages_none() {
        assert!(extract_packages("FROM scratch\nCOPY . /\n").is_empty());
    }

    #[test]
    fn test_rewrite_apt_install_pins_standalone_names() {
        let build_file = "RUN apt-get install -y curl libcurl4 git=1:2.0 git\n";
        let rewritten = rewrite_apt_install(
            build_file,
            &pkgs(&[("curl", "8.5.0"), ("git", "1:2.43.0")]),
        );
        assert_eq!(
            rewritten,
            "RUN apt-get install -y curl=8.5.0 libcurl4 git=1:2.0 git=1:2.43.0\n"
        );
    }

    #[test]
    fn test_rewrite_from_digest() {
        let build_file = "FROM ubuntu:24.04\nFROM ubuntu:24.04 AS base\nFROM ubuntu:22.04\n";
        let rewritten = rewrite_from_digest(build_file, "ubuntu:24.04", "sha256:abc");
        assert_eq!(
            rewritten,
            "FROM ubuntu@sha256:abc\nFROM ubuntu@sha256:abc AS base\nFROM ubuntu:22.04\n"
        );
    }

    #[test]
    fn test_rewrite_from_digest_defaults_to_latest() {
        let rewritten = rewrite_from_digest("FROM alpine:latest\n", "alpine", "sha256:def");
        assert_eq!(rewritten, "FROM alpine@sha256:def\n");
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(50))]

        #[test]
        fn prop_digest_rewrite_is_read_back(image in image_name(), digest in sha256_digest()) {
            let build_file = format!("FROM {image}:24.04\nRUN true\n");
            let rewritten = rewrite_from_digest(&build_file, &format!("{image}:24.04"), &digest);

            prop_assert_eq!(extract_base_image(&rewritten), Some((image, digest)));
        }
    }
}
