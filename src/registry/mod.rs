//! Package index access
//!
//! Handles release codename lookups and package version queries against the
//! distribution's public package index.

pub mod cache;
pub mod client;

pub use cache::ReleaseCache;
pub use client::PackageIndexClient;
