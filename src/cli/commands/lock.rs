//! Lock command implementation
//!
//! Implements `image-manager lock <image:tag>...`.

use anyhow::{Context, Result};

use super::CommandContext;
use crate::cli::output::{create_spinner, status};
use crate::core::locker::{group_references, lock_path_for, PackageLocker};
use crate::core::plan::load_images;
use crate::infra::tools::ExternalTools;
use crate::registry::{PackageIndexClient, ReleaseCache};

/// Execute the lock command
pub async fn execute(ctx: &CommandContext, references: &[String], workers: Option<usize>) -> Result<()> {
    let images = load_images(&ctx.images_dir)
        .with_context(|| format!("Failed to load images from {}", ctx.images_dir.display()))?;
    let groups = group_references(&images, references)?;

    let settings = &ctx.settings;
    let client = PackageIndexClient::with_urls(
        settings.series_url().to_string(),
        settings.packages_url().to_string(),
        settings.request_timeout(),
    )?;
    let tools = ExternalTools::discover(settings, &ctx.root);
    let locker = PackageLocker::new(client, ReleaseCache::global(), &tools, &ctx.dist_dir)
        .with_workers(workers.unwrap_or_else(|| settings.lock_workers()));

    let mut reports = Vec::new();
    for (image, tags) in groups {
        let lock_path = lock_path_for(image);
        let spinner = create_spinner(&format!("Locking {} ({} tags)", image.name, tags.len()));
        let result = locker.lock(&image.name, &tags, &lock_path).await;
        spinner.finish_and_clear();

        let report = result.with_context(|| format!("Failed to lock {}", image.name))?;

        if !ctx.output.json && !ctx.output.quiet {
            for (base, section) in &report.sections {
                let note = if report.reused.contains(base) {
                    " (reused)"
                } else {
                    ""
                };
                println!(
                    "{} {}: {base} -> {} package(s){note}",
                    status::SUCCESS,
                    image.name,
                    section.packages.len()
                );
            }
            for warning in &report.warnings {
                println!("  {} {warning}", status::WARNING);
            }
            println!("Wrote {}", report.lock_path.display());
        }
        reports.push((image.name.clone(), report));
    }

    if ctx.output.json {
        let body: Vec<_> = reports
            .iter()
            .map(|(name, report)| {
                serde_json::json!({
                    "image": name,
                    "lock_file": report.lock_path,
                    "sections": report.sections,
                    "reused": report.reused,
                    "warnings": report.warnings.iter().map(ToString::to_string).collect::<Vec<_>>(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&body)?);
    }

    Ok(())
}
