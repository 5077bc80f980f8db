//! Command-line interface module
//!
//! This module handles argument parsing and output formatting.
//! It contains no business logic - that belongs in the [`crate::core`] module.

pub mod commands;
pub mod output;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use commands::{CommandContext, Commands};
use output::OutputConfig;

use crate::core::settings::Settings;

/// image-manager - Dependency-ordered container image planning
///
/// Resolves image configurations into an ordered build plan, merges rootfs
/// overlays and pins OS packages.
#[derive(Parser, Debug)]
#[command(name = "image-manager")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output in JSON format for scripting
    #[arg(long, global = true)]
    pub json: bool,

    /// Images directory (overrides settings)
    #[arg(long, global = true, env = "IMAGE_MANAGER_IMAGES_DIR")]
    pub images_dir: Option<PathBuf>,

    /// Output directory for build contexts (overrides settings)
    #[arg(long, global = true, env = "IMAGE_MANAGER_DIST_DIR")]
    pub dist_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// Output preferences derived from the global flags
    pub fn output_config(&self) -> OutputConfig {
        OutputConfig::new(self.quiet, self.json, self.verbose)
    }

    /// Execute the CLI command
    pub async fn run(self) -> Result<()> {
        let Some(command) = self.command else {
            // No subcommand provided, show help
            use clap::CommandFactory;
            let mut cmd = Self::command();
            cmd.print_help()?;
            return Ok(());
        };

        let root = std::env::current_dir().context("Failed to determine working directory")?;
        let settings = Settings::load(&root).context("Failed to load settings")?;

        let images_dir = root.join(self.images_dir.unwrap_or_else(|| settings.images_dir()));
        let dist_dir = root.join(self.dist_dir.unwrap_or_else(|| settings.dist_dir()));

        let ctx = CommandContext {
            output: OutputConfig::new(self.quiet, self.json, self.verbose),
            root,
            settings,
            images_dir,
            dist_dir,
        };

        command.run(&ctx).await
    }
}
