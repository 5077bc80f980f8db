//! Plan command implementation
//!
//! Implements `image-manager plan`.

use anyhow::{Context, Result};

use super::CommandContext;
use crate::core::plan::BuildPlan;

/// Execute the plan command
pub async fn execute(ctx: &CommandContext) -> Result<()> {
    let plan = BuildPlan::load(&ctx.images_dir)
        .with_context(|| format!("Failed to plan images in {}", ctx.images_dir.display()))?;

    if ctx.output.json {
        println!("{}", plan.to_json()?);
        return Ok(());
    }
    if ctx.output.quiet {
        return Ok(());
    }

    println!("Build order (dependencies resolved):");
    for (i, image) in plan.images.iter().enumerate() {
        let deps = plan
            .dependencies_of(&image.name)
            .filter(|deps| !deps.is_empty())
            .map(|deps| deps.iter().cloned().collect::<Vec<_>>().join(", "));

        match deps {
            Some(deps) => println!("  {}. {} (depends on: {deps})", i + 1, image.name),
            None => println!("  {}. {} (no dependencies)", i + 1, image.name),
        }
    }

    Ok(())
}
