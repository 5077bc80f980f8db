//! Common test utilities and helpers
//!
//! This module provides shared utilities for integration tests.

#![allow(dead_code)]

use std::path::PathBuf;
use std::process::{Command, Output};
use tempfile::TempDir;

/// Test project context
///
/// Creates a temporary working directory holding an `images/` tree and
/// provides utilities for setting up test scenarios.
pub struct TestProject {
    /// Temporary directory for the test project
    pub dir: TempDir,
}

impl TestProject {
    /// Create a new, empty test project in a temporary directory
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Create a project holding the base → middle → app chain
    pub fn with_chain() -> Self {
        let project = Self::new();
        project.create_file("images/base/image.yml", BASE_IMAGE_YML);
        project.create_file("images/base/Dockerfile.jinja2", BASE_TEMPLATE);
        project.create_file("images/middle/1/image.yml", MIDDLE_IMAGE_YML);
        project.create_file("images/middle/1/Dockerfile.jinja2", MIDDLE_TEMPLATE);
        project.create_file("images/app/1/image.yml", APP_IMAGE_YML);
        project.create_file("images/app/1/Dockerfile.jinja2", APP_TEMPLATE);
        project
    }

    /// Get the path to the test project directory
    pub fn path(&self) -> PathBuf {
        self.dir.path().to_path_buf()
    }

    /// Path of the project's images directory
    pub fn images_dir(&self) -> PathBuf {
        self.dir.path().join("images")
    }

    /// Path of the project's dist directory
    pub fn dist_dir(&self) -> PathBuf {
        self.dir.path().join("dist")
    }

    /// Create a file in the test project
    pub fn create_file(&self, name: &str, content: &str) {
        let path = self.dir.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent directories");
        }
        std::fs::write(path, content).expect("Failed to write file");
    }

    /// Create a directory in the test project
    pub fn create_dir(&self, name: &str) {
        std::fs::create_dir_all(self.dir.path().join(name)).expect("Failed to create directory");
    }

    /// Check if a file exists in the test project
    pub fn file_exists(&self, name: &str) -> bool {
        self.dir.path().join(name).exists()
    }

    /// Read a file from the test project
    pub fn read_file(&self, name: &str) -> String {
        std::fs::read_to_string(self.dir.path().join(name)).expect("Failed to read file")
    }

    /// Run the image-manager binary inside the project
    pub fn run(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_image-manager"))
            .args(args)
            .current_dir(self.dir.path())
            .env_remove("IMAGE_MANAGER_IMAGES_DIR")
            .env_remove("IMAGE_MANAGER_DIST_DIR")
            .env_remove("RUST_LOG")
            .output()
            .expect("Failed to execute image-manager")
    }
}

impl Default for TestProject {
    fn default() -> Self {
        Self::new()
    }
}

/// Stdout of a finished command as text
pub fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

/// Stderr of a finished command as text
pub fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

/// Base OS image with a single tag
pub const BASE_IMAGE_YML: &str = r#"is_base_image: true
tags:
  - name: "24.04"
"#;

pub const BASE_TEMPLATE: &str = "FROM ubuntu:24.04\nRUN apt-get update && apt-get install -y curl ca-certificates\n";

/// Shared base built on top of `base`
pub const MIDDLE_IMAGE_YML: &str = r#"name: middle
is_base_image: true
tags:
  - name: "1.0"
"#;

pub const MIDDLE_TEMPLATE: &str = "FROM {{ \"base\" | resolve_base_image }}\nRUN apt-get install -y git\n";

/// Application image with a variant
pub const APP_IMAGE_YML: &str = r#"versions:
  app: "1.0.0"
variables:
  ENV: production
tags:
  - name: "1.0.1"
  - name: "1.0.0"
    versions:
      app: "1.0.0-rc"
variants:
  - name: debug
    tag_suffix: "-debug"
    variables:
      ENV: debug
"#;

pub const APP_TEMPLATE: &str = "FROM {{ 'middle' | resolve_base_image }}\nCOPY rootfs/ /\n";
