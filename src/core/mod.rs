//! Core business logic module
//!
//! This module contains the business logic for image-manager. Filesystem and
//! process helpers live in [`crate::infra`]; network access lives in
//! [`crate::registry`].
//!
//! # Submodules
//!
//! - [`config`] - Image configuration (image.yml) parsing and validation
//! - [`merge`] - Two-level map merging
//! - [`template`] - Template discovery by convention
//! - [`alias`] - Automatic shorthand aliases
//! - [`tags`] - Variant tag generation
//! - [`model`] - Resolved image model
//! - [`graph`] - Dependency extraction and build ordering
//! - [`rootfs`] - Rootfs overlay merging
//! - [`lock`] - Lock file handling
//! - [`locker`] - Package version and digest pinning
//! - [`plan`] - Discovery, build plans and rootfs materialisation
//! - [`settings`] - Tool settings

pub mod alias;
pub mod config;
pub mod graph;
pub mod lock;
pub mod locker;
pub mod merge;
pub mod model;
pub mod plan;
pub mod rootfs;
pub mod settings;
pub mod tags;
pub mod template;
