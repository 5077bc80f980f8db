//! Image configuration (image.yml) parsing and validation
//!
//! One `image.yml` lives in every image version directory. It is parsed into
//! an [`ImageConfig`] tree and validated before any resolution happens.
//! Validation reports every problem found, not just the first one.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use crate::error::ConfigError;

/// Root configuration from image.yml
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ImageConfig {
    /// Explicit image name; derived from the directory layout when absent
    #[serde(default)]
    pub name: Option<String>,

    /// Explicit template file name inside the templates directory
    #[serde(default)]
    pub template: Option<String>,

    /// Image-wide versions
    #[serde(default)]
    pub versions: BTreeMap<String, String>,

    /// Image-wide build variables
    #[serde(default)]
    pub variables: BTreeMap<String, String>,

    /// Concrete tags
    pub tags: Vec<TagConfig>,

    /// Alternate flavors sharing the base tags
    #[serde(default)]
    pub variants: Vec<VariantConfig>,

    /// Whether other managed images may build from this one
    #[serde(default)]
    pub is_base_image: bool,

    /// Name of an image this one builds on
    #[serde(default)]
    pub extends: Option<String>,

    /// Owner of rootfs overlay files
    #[serde(default)]
    pub rootfs_user: Option<String>,

    /// Whether the rootfs overlay is copied into the image
    #[serde(default)]
    pub rootfs_copy: Option<bool>,
}

/// Configuration for a single tag
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TagConfig {
    /// Tag name
    pub name: String,

    #[serde(default)]
    pub versions: BTreeMap<String, String>,

    #[serde(default)]
    pub variables: BTreeMap<String, String>,

    #[serde(default)]
    pub rootfs_user: Option<String>,

    #[serde(default)]
    pub rootfs_copy: Option<bool>,
}

/// Configuration for a variant
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct VariantConfig {
    /// Variant name
    pub name: String,

    /// Appended to every base tag name
    pub tag_suffix: String,

    /// Explicit template file name
    #[serde(default)]
    pub template: Option<String>,

    #[serde(default)]
    pub versions: BTreeMap<String, String>,

    #[serde(default)]
    pub variables: BTreeMap<String, String>,

    #[serde(default)]
    pub rootfs_user: Option<String>,

    #[serde(default)]
    pub rootfs_copy: Option<bool>,
}

impl ImageConfig {
    /// Parse from YAML string without semantic validation
    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(content)
    }

    /// Serialize to YAML string
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }

    /// Check the semantic rules the schema cannot express.
    ///
    /// Returns every problem found.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        let mut tag_names = HashSet::new();
        for (idx, tag) in self.tags.iter().enumerate() {
            if tag.name.trim().is_empty() {
                errors.push(format!("tags[{idx}]: name cannot be empty"));
            } else if !tag_names.insert(tag.name.as_str()) {
                errors.push(format!("Duplicate tag name '{}'", tag.name));
            }
        }

        let mut variant_names = HashSet::new();
        for (idx, variant) in self.variants.iter().enumerate() {
            if variant.name.trim().is_empty() {
                errors.push(format!("variants[{idx}]: name cannot be empty"));
            } else if !variant_names.insert(variant.name.as_str()) {
                errors.push(format!("Duplicate variant name '{}'", variant.name));
            }

            let mut variant_tags = HashSet::new();
            for tag in &self.tags {
                let generated = format!("{}{}", tag.name, variant.tag_suffix);
                if !variant_tags.insert(generated.clone()) {
                    errors.push(format!(
                        "Variant '{}' generates duplicate tag '{generated}'",
                        variant.name
                    ));
                }
            }
        }

        if let Some(name) = &self.name {
            if name.trim().is_empty() {
                errors.push("Field 'name' cannot be empty when set".to_string());
            }
        }

        if let Some(extends) = &self.extends {
            if extends.trim().is_empty() {
                errors.push("Field 'extends' cannot be empty when set".to_string());
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Loads and validates image.yml files
#[derive(Debug, Default, Clone, Copy)]
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load and validate an image.yml file
    pub fn load(path: &Path) -> Result<ImageConfig, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;
        Self::parse(path, &content)
    }

    /// Parse and validate configuration text; `path` is used for error context only
    pub fn parse(path: &Path, content: &str) -> Result<ImageConfig, ConfigError> {
        let config = ImageConfig::from_yaml(content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        config.validate().map_err(|errors| ConfigError::Invalid {
            path: path.to_path_buf(),
            errors,
        })?;

        tracing::debug!(
            "Loaded {} ({} tags, {} variants)",
            path.display(),
            config.tags.len(),
            config.variants.len()
        );
        Ok(config)
    }
}
