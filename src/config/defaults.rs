//! Default configuration values

use std::time::Duration;

/// Per-image configuration file name
pub const IMAGE_CONFIG_FILE: &str = "image.yml";

/// Tool settings file, looked up in the working directory
pub const SETTINGS_FILE: &str = ".image-manager.yml";

/// Default images directory
pub const DEFAULT_IMAGES_DIR: &str = "images";

/// Default output directory for generated build contexts
pub const DEFAULT_DIST_DIR: &str = "dist";

/// Sibling directory that holds an image's templates
pub const TEMPLATES_DIR: &str = "templates";

/// Default build-file template
pub const DEFAULT_TEMPLATE: &str = "Dockerfile.jinja2";

/// Rootfs overlay directory name at every level
pub const ROOTFS_DIR: &str = "rootfs";

/// Generated build file inside a tag's build context
pub const BUILD_FILE: &str = "Dockerfile";

/// Built image archive inside a tag's build context
pub const IMAGE_ARCHIVE: &str = "image.tar";

/// Lock file name, written next to the image config
pub const LOCK_FILE: &str = "packages.lock";

/// Default rootfs owner
pub const DEFAULT_ROOTFS_USER: &str = "0:0";

/// Rootfs copying is on unless disabled
pub const DEFAULT_ROOTFS_COPY: bool = true;

/// Default width of the package lookup worker pool
pub const DEFAULT_LOCK_WORKERS: usize = 8;

/// Default per-request network timeout
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Deadline for one `crane digest` call
pub const CRANE_TIMEOUT: Duration = Duration::from_secs(30);

/// Deadline for one `syft scan` of an image archive
pub const SYFT_TIMEOUT: Duration = Duration::from_secs(60);

/// Distribution whose package index and release series are supported
pub const SUPPORTED_DISTRO: &str = "ubuntu";

/// Well-known public images that are never managed locally
pub const EXTERNAL_DISTROS: &[&str] = &["alpine", "debian"];

/// Filename patterns that usually indicate secrets
pub const SENSITIVE_PATTERNS: &[&str] = &[
    ".env",
    "*.key",
    "*.pem",
    "*.p12",
    "*.pfx",
    "id_rsa",
    "id_ed25519",
];

/// Returns the template file name for a variant
pub fn variant_template(variant: &str) -> String {
    format!("Dockerfile.{variant}.jinja2")
}
