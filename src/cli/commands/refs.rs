//! Refs command implementation
//!
//! Implements `image-manager refs`.

use anyhow::{Context, Result};

use super::CommandContext;
use crate::core::plan::BuildPlan;

/// Execute the refs command
pub async fn execute(ctx: &CommandContext) -> Result<()> {
    let plan = BuildPlan::load(&ctx.images_dir)
        .with_context(|| format!("Failed to plan images in {}", ctx.images_dir.display()))?;
    let refs = plan.refs();

    if ctx.output.json {
        println!("{}", serde_json::to_string_pretty(&refs)?);
    } else {
        for reference in refs {
            println!("{reference}");
        }
    }
    Ok(())
}
