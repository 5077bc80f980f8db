//! Package index and release series URLs

/// Launchpad release series API (JSON)
pub const UBUNTU_SERIES_API: &str = "https://api.launchpad.net/1.0/ubuntu/series";

/// Ubuntu package index website
pub const UBUNTU_PACKAGES: &str = "https://packages.ubuntu.com";
