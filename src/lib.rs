//! image-manager - Dependency-ordered container image planning
//!
//! This library turns a tree of per-image `image.yml` files into a
//! dependency-ordered build plan: resolved images, tags, variants and
//! aliases, merged rootfs overlays, and pinned package lock data.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`cli`] - Command-line interface parsing and output formatting
//! - [`core`] - Business logic
//! - [`registry`] - Package index client and release codename cache
//! - [`infra`] - Infrastructure layer (filesystem, external tools)
//! - [`config`] - Configuration and constants
//! - [`error`] - Error types and handling

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod infra;
pub mod registry;

#[cfg(test)]
pub mod test_utils;
