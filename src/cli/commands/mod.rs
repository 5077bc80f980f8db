//! CLI command implementations
//!
//! Each command is implemented in its own submodule.

pub mod aliases;
pub mod lock;
pub mod plan;
pub mod refs;
pub mod rootfs;

use anyhow::Result;
use clap::Subcommand;
use std::path::PathBuf;

use crate::cli::output::OutputConfig;
use crate::core::settings::Settings;

/// Resolved inputs shared by every command
#[derive(Debug, Clone)]
pub struct CommandContext {
    /// Working directory the run started in
    pub root: PathBuf,
    /// Settings from `.image-manager.yml`
    pub settings: Settings,
    /// Effective images directory
    pub images_dir: PathBuf,
    /// Effective dist directory
    pub dist_dir: PathBuf,
    /// Output preferences
    pub output: OutputConfig,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the build order with each image's dependencies
    Plan,

    /// List `image:tag` references in build order
    Refs,

    /// Merge rootfs overlays into each tag's build context
    Rootfs,

    /// Write alias files that name each alias's target tag
    Aliases,

    /// Pin OS package versions and base digests
    Lock {
        /// Image references to lock, e.g. python:3.13.7
        #[arg(required = true, num_args = 1..)]
        references: Vec<String>,

        /// Width of the package lookup worker pool
        #[arg(short, long)]
        workers: Option<usize>,
    },
}

impl Commands {
    /// Execute the command
    pub async fn run(self, ctx: &CommandContext) -> Result<()> {
        match self {
            Self::Plan => plan::execute(ctx).await,
            Self::Refs => refs::execute(ctx).await,
            Self::Rootfs => rootfs::execute(ctx).await,
            Self::Aliases => aliases::execute(ctx).await,
            Self::Lock {
                references,
                workers,
            } => lock::execute(ctx, &references, workers).await,
        }
    }
}
