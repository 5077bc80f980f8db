//! Infrastructure layer
//!
//! Handles filesystem operations and external processes.

pub mod filesystem;
pub mod tools;
