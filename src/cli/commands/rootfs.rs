//! Rootfs command implementation
//!
//! Implements `image-manager rootfs`.

use anyhow::{Context, Result};

use super::CommandContext;
use crate::cli::output::status;
use crate::core::plan::{materialize_rootfs, BuildPlan};

/// Execute the rootfs command
pub async fn execute(ctx: &CommandContext) -> Result<()> {
    let plan = BuildPlan::load(&ctx.images_dir)
        .with_context(|| format!("Failed to plan images in {}", ctx.images_dir.display()))?;

    let merged = materialize_rootfs(&plan.images, &ctx.dist_dir)
        .with_context(|| format!("Failed to merge rootfs into {}", ctx.dist_dir.display()))?;

    if ctx.output.json {
        println!("{}", serde_json::to_string_pretty(&merged)?);
        return Ok(());
    }
    if ctx.output.quiet {
        return Ok(());
    }

    for entry in &merged {
        println!("{} {} -> {}", status::SUCCESS, entry.reference, entry.path.display());
        for warning in &entry.warnings {
            println!("  {} {warning}", status::WARNING);
        }
    }
    println!("Merged rootfs for {} tag(s)", merged.len());

    Ok(())
}
