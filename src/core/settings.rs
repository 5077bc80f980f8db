//! Tool settings
//!
//! Reads optional settings from `.image-manager.yml` in the working
//! directory. A missing file means defaults; an unreadable or invalid file
//! is an error.
//!
//! String values written exactly as `${VAR}` are replaced by the value of
//! the environment variable `VAR`. An unset variable leaves the key unset.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use crate::config::{defaults, urls};
use crate::error::SettingsError;

/// Settings for image-manager
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    /// Directory holding image configurations
    #[serde(default)]
    pub images_dir: Option<PathBuf>,

    /// Directory holding generated build contexts
    #[serde(default)]
    pub dist_dir: Option<PathBuf>,

    /// Package locking
    #[serde(default)]
    pub lock: LockSettings,

    /// External tool locations
    #[serde(default)]
    pub tools: ToolSettings,
}

/// Package locking settings
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LockSettings {
    /// Width of the package lookup worker pool
    pub workers: Option<usize>,

    /// Per-request timeout in seconds
    pub timeout_secs: Option<u64>,

    /// Release series listing URL
    pub series_url: Option<String>,

    /// Package index base URL
    pub packages_url: Option<String>,
}

/// External tool locations
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ToolSettings {
    pub crane: Option<PathBuf>,
    pub syft: Option<PathBuf>,
}

fn env_reference_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\$\{([A-Za-z_][A-Za-z0-9_]*)\}$").expect("env reference pattern is valid")
    })
}

/// Replace `${VAR}` strings anywhere in a YAML tree
fn expand_env(value: serde_yaml::Value) -> serde_yaml::Value {
    use serde_yaml::Value;

    match value {
        Value::String(s) => match env_reference_pattern().captures(&s) {
            Some(cap) => std::env::var(&cap[1]).map_or(Value::Null, Value::String),
            None => Value::String(s),
        },
        Value::Mapping(map) => Value::Mapping(
            map.into_iter()
                .map(|(k, v)| (k, expand_env(v)))
                .collect(),
        ),
        Value::Sequence(seq) => Value::Sequence(seq.into_iter().map(expand_env).collect()),
        other => other,
    }
}

impl Settings {
    /// Load `.image-manager.yml` from `dir`
    pub fn load(dir: &Path) -> Result<Self, SettingsError> {
        Self::load_from_path(&dir.join(defaults::SETTINGS_FILE))
    }

    /// Load settings from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self, SettingsError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| SettingsError::Read {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Self::parse(&content).map_err(|e| SettingsError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })
    }

    /// Parse settings from YAML text, expanding `${VAR}` values
    pub fn parse(content: &str) -> Result<Self, serde_yaml::Error> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let raw: serde_yaml::Value = serde_yaml::from_str(content)?;
        if raw.is_null() {
            return Ok(Self::default());
        }
        serde_yaml::from_value(expand_env(raw))
    }

    /// Effective images directory
    #[must_use]
    pub fn images_dir(&self) -> PathBuf {
        self.images_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(defaults::DEFAULT_IMAGES_DIR))
    }

    /// Effective dist directory
    #[must_use]
    pub fn dist_dir(&self) -> PathBuf {
        self.dist_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(defaults::DEFAULT_DIST_DIR))
    }

    /// Effective worker pool width, never zero
    #[must_use]
    pub fn lock_workers(&self) -> usize {
        self.lock
            .workers
            .unwrap_or(defaults::DEFAULT_LOCK_WORKERS)
            .max(1)
    }

    /// Effective per-request timeout
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        self.lock
            .timeout_secs
            .map_or(defaults::DEFAULT_REQUEST_TIMEOUT, Duration::from_secs)
    }

    /// Effective release series URL
    #[must_use]
    pub fn series_url(&self) -> &str {
        self.lock
            .series_url
            .as_deref()
            .unwrap_or(urls::UBUNTU_SERIES_API)
    }

    /// Effective package index URL
    #[must_use]
    pub fn packages_url(&self) -> &str {
        self.lock
            .packages_url
            .as_deref()
            .unwrap_or(urls::UBUNTU_PACKAGES)
    }
}
