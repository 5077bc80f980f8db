//! Aliases command implementation
//!
//! Implements `image-manager aliases`.

use anyhow::{Context, Result};

use super::CommandContext;
use crate::cli::output::status;
use crate::core::plan::{write_aliases, BuildPlan};

/// Execute the aliases command
pub async fn execute(ctx: &CommandContext) -> Result<()> {
    let plan = BuildPlan::load(&ctx.images_dir)
        .with_context(|| format!("Failed to plan images in {}", ctx.images_dir.display()))?;

    let written = write_aliases(&plan.images, &ctx.dist_dir)
        .with_context(|| format!("Failed to write aliases into {}", ctx.dist_dir.display()))?;

    if ctx.output.json {
        println!("{}", serde_json::to_string_pretty(&written)?);
        return Ok(());
    }
    if ctx.output.quiet {
        return Ok(());
    }

    for alias in &written {
        println!("{} {} -> {}", status::SUCCESS, alias.reference, alias.target);
    }
    println!("Wrote {} alias file(s)", written.len());

    Ok(())
}
