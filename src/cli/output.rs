//! Output formatting and progress indicators
//!
//! This module provides utilities for displaying spinners, status lines and
//! errors, honouring `--quiet` and `--json`.

use indicatif::{ProgressBar, ProgressStyle};
use std::sync::OnceLock;

static GLOBAL: OnceLock<OutputConfig> = OnceLock::new();

/// Output preferences for one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutputConfig {
    /// Suppress everything but errors
    pub quiet: bool,
    /// Machine-readable output
    pub json: bool,
    /// Verbosity level from `-v` flags
    pub verbose: u8,
}

impl OutputConfig {
    /// Create from CLI flags
    pub fn new(quiet: bool, json: bool, verbose: u8) -> Self {
        Self {
            quiet,
            json,
            verbose,
        }
    }

    /// Make this configuration visible to [`OutputConfig::global`]
    pub fn apply_global(self) {
        let _ = GLOBAL.set(self);
    }

    /// Configuration applied at startup, or defaults
    pub fn global() -> Self {
        GLOBAL.get().copied().unwrap_or_default()
    }

    /// Default log level for the tracing filter
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            return tracing::Level::ERROR;
        }
        match self.verbose {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            _ => tracing::Level::DEBUG,
        }
    }

    /// Whether human-readable progress should be shown
    pub fn show_progress(&self) -> bool {
        !self.quiet && !self.json
    }
}

/// Print an error and its causes to stderr
pub fn display_error(error: &anyhow::Error) {
    if OutputConfig::global().json {
        let causes: Vec<String> = error.chain().skip(1).map(ToString::to_string).collect();
        let body = serde_json::json!({
            "error": error.to_string(),
            "causes": causes,
        });
        eprintln!("{body}");
        return;
    }

    eprintln!("{} Error: {error}", status::ERROR);
    for cause in error.chain().skip(1) {
        eprintln!("  caused by: {cause}");
    }
}

/// Create a spinner for operations with unknown duration.
///
/// Hidden when progress output is disabled.
pub fn create_spinner(message: &str) -> ProgressBar {
    if !OutputConfig::global().show_progress() {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
            .template("{spinner:.blue} {msg}")
            .expect("Invalid spinner template"),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(80));
    pb
}

/// Status message prefixes
pub mod status {
    /// Success prefix (green checkmark)
    pub const SUCCESS: &str = "✓";

    /// Error prefix (red X)
    pub const ERROR: &str = "✗";

    /// Warning prefix (yellow triangle)
    pub const WARNING: &str = "⚠";
}
