//! External image tools
//!
//! Wraps `crane` (registry digests) and `syft` (distribution detection in
//! image archives). A tool that is missing, fails or runs past its deadline
//! yields `None`; callers treat that as "unresolved".

use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;

use crate::config::defaults;
use crate::core::settings::Settings;

/// Distribution detected inside an image
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistroInfo {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, rename = "versionID")]
    pub version_id: Option<String>,
    #[serde(default)]
    pub version_codename: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ScanReport {
    #[serde(default)]
    distro: Option<DistroInfo>,
}

/// Image inspection capabilities needed by the package locker
#[async_trait]
pub trait ImageInspector: Send + Sync {
    /// Content digest of a registry reference, e.g. `sha256:...`
    async fn digest(&self, reference: &str) -> Option<String>;

    /// Distribution of a saved image archive
    async fn distro(&self, archive: &Path) -> Option<DistroInfo>;
}

/// Platform directory name for bundled binaries, e.g. `linux-amd64`
pub fn bin_platform() -> String {
    let os = std::env::consts::OS;
    let arch = match std::env::consts::ARCH {
        "x86_64" => "amd64",
        "aarch64" => "arm64",
        other => other,
    };
    format!("{os}-{arch}")
}

/// Find a tool: configured path, then `bin/<platform>/<tool>` under
/// `root`, then `PATH`
pub fn locate(tool: &str, configured: Option<&Path>, root: &Path) -> Option<PathBuf> {
    if let Some(path) = configured {
        if path.exists() {
            return Some(path.to_path_buf());
        }
        tracing::warn!("Configured {tool} not found at {}", path.display());
    }

    let bundled = root.join("bin").join(bin_platform()).join(tool);
    if bundled.exists() {
        return Some(bundled);
    }

    which::which(tool).ok()
}

/// Parse the distribution block of a `syft -o json` report
pub fn parse_distro(report: &str) -> Option<DistroInfo> {
    let report: ScanReport = serde_json::from_str(report).ok()?;
    report.distro.filter(|d| d.id.is_some() || d.version_id.is_some())
}

/// `crane` + `syft` invoked as subprocesses
#[derive(Debug, Clone)]
pub struct ExternalTools {
    crane: Option<PathBuf>,
    syft: Option<PathBuf>,
    crane_timeout: Duration,
    syft_timeout: Duration,
}

impl Default for ExternalTools {
    fn default() -> Self {
        Self::with_paths(None, None)
    }
}

impl ExternalTools {
    /// Locate both tools using settings and the project root
    pub fn discover(settings: &Settings, root: &Path) -> Self {
        let tools = Self::with_paths(
            locate("crane", settings.tools.crane.as_deref(), root),
            locate("syft", settings.tools.syft.as_deref(), root),
        );
        if tools.crane.is_none() {
            tracing::debug!("crane not found; base digests will not be pinned");
        }
        if tools.syft.is_none() {
            tracing::debug!("syft not found; image archives will not be inspected");
        }
        tools
    }

    /// Use explicit binary paths with the default deadlines
    pub fn with_paths(crane: Option<PathBuf>, syft: Option<PathBuf>) -> Self {
        Self {
            crane,
            syft,
            crane_timeout: defaults::CRANE_TIMEOUT,
            syft_timeout: defaults::SYFT_TIMEOUT,
        }
    }

    /// Override the per-call deadlines
    #[must_use]
    pub fn with_timeouts(mut self, crane: Duration, syft: Duration) -> Self {
        self.crane_timeout = crane;
        self.syft_timeout = syft;
        self
    }
}

/// Run a tool to completion and return its stdout.
///
/// The child is killed when `limit` passes first.
async fn run(program: &Path, args: &[&str], limit: Duration) -> Option<String> {
    let child = Command::new(program).args(args).kill_on_drop(true).output();

    let output = match timeout(limit, child).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => {
            tracing::debug!("Failed to run {}: {e}", program.display());
            return None;
        }
        Err(_) => {
            tracing::warn!("{} timed out after {}s", program.display(), limit.as_secs_f32());
            return None;
        }
    };

    if !output.status.success() {
        tracing::debug!(
            "{} exited with {}: {}",
            program.display(),
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        );
        return None;
    }

    Some(String::from_utf8_lossy(&output.stdout).into_owned())
}

#[async_trait]
impl ImageInspector for ExternalTools {
    async fn digest(&self, reference: &str) -> Option<String> {
        let crane = self.crane.as_deref()?;
        let digest = run(crane, &["digest", reference], self.crane_timeout)
            .await?
            .trim()
            .to_string();
        (!digest.is_empty()).then_some(digest)
    }

    async fn distro(&self, archive: &Path) -> Option<DistroInfo> {
        let syft = self.syft.as_deref()?;
        if !archive.exists() {
            return None;
        }
        let source = format!("docker-archive:{}", archive.display());
        let report = run(syft, &["scan", &source, "-o", "json", "-q"], self.syft_timeout).await?;
        parse_distro(&report)
    }
}
