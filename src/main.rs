//! image-manager CLI
//!
//! Entry point for the image-manager command-line application.

use anyhow::Result;
use clap::Parser;

use image_manager::cli::output::display_error;
use image_manager::cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Apply output configuration globally
    let output_config = cli.output_config();
    output_config.apply_global();

    // Initialize tracing subscriber; RUST_LOG directives refine the default
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(output_config.log_level().into())
                .from_env_lossy(),
        )
        .init();

    // Run the command and handle errors
    match cli.run().await {
        Ok(()) => Ok(()),
        Err(e) => {
            display_error(&e);
            std::process::exit(1);
        }
    }
}
