//! Error types for image-manager
//!
//! Domain-specific error types using thiserror. Each enum covers one concern;
//! [`ImageManagerError`] wraps them all for callers that handle a whole run.

use std::path::PathBuf;
use thiserror::Error;

/// Image configuration (image.yml) errors
///
/// Fatal for the one configuration file they name.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file could not be read
    #[error("Failed to read image config '{path}': {error}")]
    Read { path: PathBuf, error: String },

    /// YAML syntax or schema violation
    #[error("Failed to parse image config '{path}': {error}")]
    Parse { path: PathBuf, error: String },

    /// Parsed, but semantically invalid
    #[error("Invalid image config '{path}': {}", errors.join("; "))]
    Invalid { path: PathBuf, errors: Vec<String> },
}

/// Template discovery errors
#[derive(Error, Debug)]
pub enum TemplateError {
    /// An explicitly configured template does not exist
    #[error("Template not found: explicit template '{name}' does not exist in {dir}")]
    ExplicitMissing { name: String, dir: PathBuf },

    /// Neither the variant-specific nor the default template exists
    #[error("Template not found. Searched in {dir}: {}", searched.join(", "))]
    NotFound { dir: PathBuf, searched: Vec<String> },
}

/// Image model resolution errors
#[derive(Error, Debug)]
pub enum ModelError {
    /// Configuration problem
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Template problem for a given image
    #[error("Image at '{path}': {source}")]
    Template {
        path: PathBuf,
        #[source]
        source: TemplateError,
    },

    /// Image name could not be derived from the directory layout
    #[error("Cannot derive an image name from '{path}'")]
    UnnamedImage { path: PathBuf },

    /// No managed base image carries this name
    #[error("Could not resolve base image '{name}': no managed base image has that name")]
    BaseImageNotFound { name: String },

    /// More than one managed base image carries this name
    #[error("Could not resolve base image '{name}': {count} managed base images share that name")]
    AmbiguousBaseImage { name: String, count: usize },

    /// A base image must have exactly one tag to be referenced
    #[error("Base image '{name}' must define exactly one tag, found {count}")]
    BaseImageTagCount { name: String, count: usize },
}

/// Dependency graph errors
#[derive(Error, Debug)]
pub enum GraphError {
    /// The dependency graph contains a cycle
    #[error("Circular dependency detected among images: {}", remaining.join(", "))]
    CyclicDependency { remaining: Vec<String> },

    /// A template could not be read while extracting references
    #[error("Failed to read template '{path}': {error}")]
    TemplateRead { path: PathBuf, error: String },
}

/// Filesystem operation errors
#[derive(Error, Debug)]
pub enum FilesystemError {
    /// Failed to create directory
    #[error("Failed to create directory '{path}': {error}")]
    CreateDir { path: PathBuf, error: String },

    /// Failed to remove an existing entry
    #[error("Failed to remove '{path}': {error}")]
    Remove { path: PathBuf, error: String },

    /// Failed to read file
    #[error("Failed to read file '{path}': {error}")]
    ReadFile { path: PathBuf, error: String },

    /// Failed to write file
    #[error("Failed to write file '{path}': {error}")]
    WriteFile { path: PathBuf, error: String },

    /// Failed to copy a regular file
    #[error("Failed to copy '{from}' to '{to}': {error}")]
    Copy {
        from: PathBuf,
        to: PathBuf,
        error: String,
    },

    /// Failed to read or recreate a symlink
    #[error("Failed to recreate symlink '{path}': {error}")]
    Symlink { path: PathBuf, error: String },
}

/// Rootfs overlay errors
#[derive(Error, Debug)]
pub enum RootfsError {
    /// Underlying filesystem failure
    #[error(transparent)]
    Filesystem(#[from] FilesystemError),

    /// Failed to walk a source tree
    #[error("Failed to walk '{path}': {error}")]
    Walk { path: PathBuf, error: String },
}

/// Tool settings (.image-manager.yml) errors
#[derive(Error, Debug)]
pub enum SettingsError {
    /// Failed to read settings file
    #[error("Failed to read settings file '{path}': {error}")]
    Read { path: PathBuf, error: String },

    /// Failed to parse settings file
    #[error("Failed to parse settings file '{path}': {error}")]
    Parse { path: PathBuf, error: String },
}

/// Package locking errors
#[derive(Error, Debug)]
pub enum LockError {
    /// Lock file could not be read
    #[error("Failed to read lock file '{path}': {error}")]
    Read { path: PathBuf, error: String },

    /// Lock file is not valid YAML in either supported format
    #[error("Failed to parse lock file '{path}': {error}")]
    Parse { path: PathBuf, error: String },

    /// Lock file could not be written
    #[error("Failed to write lock file '{path}': {error}")]
    Write { path: PathBuf, error: String },

    /// Malformed image reference
    #[error("Invalid image reference '{reference}': expected <image>:<tag>")]
    InvalidReference { reference: String },

    /// Reference names an image or tag that is not managed
    #[error("Image reference '{reference}' does not match any managed image tag")]
    UnknownReference { reference: String },

    /// No generated build files were found for the requested tags
    #[error("No generated build files found for '{image}'")]
    NoBuildFiles { image: String },

    /// No base section could be produced
    #[error("Could not lock any packages for '{image}'")]
    NothingLocked { image: String },

    /// HTTP client could not be constructed
    #[error("Failed to build HTTP client: {error}")]
    HttpClient { error: String },

    /// Release series lookup failed outright
    #[error("Failed to fetch release series from '{url}': {error}")]
    SeriesFetch { url: String, error: String },

    /// Release version is not known to the series index
    #[error("Unknown {distro} release: {version}")]
    UnknownRelease { distro: String, version: String },
}

/// Non-fatal conditions collected while locking
///
/// These never abort a run; they are reported alongside the result.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LockWarning {
    /// A single package version could not be resolved
    #[error("Package '{package}' not found for {base}")]
    PackageUnresolved { base: String, package: String },

    /// Base image digest could not be resolved; section is written unpinned
    #[error("Could not resolve digest for {base}")]
    DigestUnresolved { base: String },

    /// The OS base of a tag could not be determined
    #[error("Could not determine base for {reference}, skipping")]
    BaseUndetermined { reference: String },

    /// Release codename lookup failed; the base's section is skipped
    #[error("Could not resolve release codename for {base}: {reason}")]
    CodenameUnresolved { base: String, reason: String },

    /// No package installs were found in the grouped build files
    #[error("No packages found for {base}")]
    NoPackages { base: String },
}

/// Top-level image-manager error type
#[derive(Error, Debug)]
pub enum ImageManagerError {
    /// Image loading or resolution error
    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    /// Graph error
    #[error("Dependency error: {0}")]
    Graph(#[from] GraphError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_error_lists_remaining_nodes() {
        let err = GraphError::CyclicDependency {
            remaining: vec!["a".to_string(), "b".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("Circular dependency"));
        assert!(msg.contains("a, b"));
    }

    #[test]
    fn test_template_not_found_lists_searched_names() {
        let err = TemplateError::NotFound {
            dir: PathBuf::from("/images/python/templates"),
            searched: vec![
                "Dockerfile.browser.jinja2".to_string(),
                "Dockerfile.jinja2".to_string(),
            ],
        };
        assert_eq!(
            err.to_string(),
            "Template not found. Searched in /images/python/templates: \
             Dockerfile.browser.jinja2, Dockerfile.jinja2"
        );
    }

    #[test]
    fn test_config_invalid_joins_all_problems() {
        let err = ConfigError::Invalid {
            path: PathBuf::from("image.yml"),
            errors: vec!["first".to_string(), "second".to_string()],
        };
        assert!(err.to_string().ends_with("first; second"));
    }

    #[test]
    fn test_top_level_wraps_graph_error() {
        let err: ImageManagerError = GraphError::CyclicDependency {
            remaining: vec!["x".to_string()],
        }
        .into();
        assert!(err.to_string().starts_with("Dependency error:"));
    }

    #[test]
    fn test_top_level_wraps_model_error() {
        let err: ImageManagerError = ModelError::BaseImageNotFound {
            name: "base".to_string(),
        }
        .into();
        assert!(matches!(err, ImageManagerError::Model(_)));
        assert!(err.to_string().contains("no managed base image"));
    }
}
