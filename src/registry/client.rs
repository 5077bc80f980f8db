//! Package index client implementation
//!
//! Queries the release series API for version -> codename mappings and the
//! package index for current package versions.

use regex::Regex;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::OnceLock;
use std::time::Duration;

use crate::config::{defaults, urls};
use crate::error::LockError;

/// One entry of the series listing
#[derive(Debug, Deserialize)]
struct SeriesEntry {
    #[serde(default)]
    version: Option<String>,
    name: String,
}

#[derive(Debug, Deserialize)]
struct SeriesListing {
    entries: Vec<SeriesEntry>,
}

/// Client for the release series API and the package index
#[derive(Debug, Clone)]
pub struct PackageIndexClient {
    /// HTTP client
    client: reqwest::Client,
    /// Release series listing URL
    series_url: String,
    /// Package index base URL
    packages_url: String,
}

impl PackageIndexClient {
    /// Create a client with default URLs and timeout
    pub fn new() -> Result<Self, LockError> {
        Self::with_urls(
            urls::UBUNTU_SERIES_API.to_string(),
            urls::UBUNTU_PACKAGES.to_string(),
            defaults::DEFAULT_REQUEST_TIMEOUT,
        )
    }

    /// Create a client with custom URLs and per-request timeout
    pub fn with_urls(
        series_url: String,
        packages_url: String,
        timeout: Duration,
    ) -> Result<Self, LockError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LockError::HttpClient {
                error: e.to_string(),
            })?;

        Ok(Self {
            client,
            series_url,
            packages_url: packages_url.trim_end_matches('/').to_string(),
        })
    }

    /// Get the series listing URL
    pub fn series_url(&self) -> &str {
        &self.series_url
    }

    /// Get the package index URL
    pub fn packages_url(&self) -> &str {
        &self.packages_url
    }

    /// Fetch the release version -> codename mapping.
    ///
    /// Entries without a version are skipped.
    pub async fn fetch_series(&self) -> Result<BTreeMap<String, String>, LockError> {
        let fetch_err = |error: String| LockError::SeriesFetch {
            url: self.series_url.clone(),
            error,
        };

        let response = self
            .client
            .get(&self.series_url)
            .send()
            .await
            .map_err(|e| fetch_err(e.to_string()))?;

        if !response.status().is_success() {
            return Err(fetch_err(format!("HTTP {}", response.status())));
        }

        let listing: SeriesListing = response
            .json()
            .await
            .map_err(|e| fetch_err(e.to_string()))?;

        Ok(listing
            .entries
            .into_iter()
            .filter_map(|entry| match entry.version {
                Some(version) if !version.is_empty() => Some((version, entry.name)),
                _ => None,
            })
            .collect())
    }

    /// Current version of `package` in release `codename`.
    ///
    /// Any failure (network, status, unparseable page) is `None`.
    pub async fn package_version(&self, codename: &str, package: &str) -> Option<String> {
        let url = format!("{}/{codename}/{package}", self.packages_url);

        let response = match self.client.get(&url).send().await {
            Ok(response) if response.status().is_success() => response,
            Ok(response) => {
                tracing::debug!("{url}: HTTP {}", response.status());
                return None;
            }
            Err(e) => {
                tracing::debug!("{url}: {e}");
                return None;
            }
        };

        let page = response.text().await.ok()?;
        parse_package_version(&page)
    }
}

fn package_heading_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"Package:\s*\S+\s*\(([^)]+)\)").expect("package heading pattern is valid")
    })
}

/// Extract the version from a package page heading such as
/// `Package: curl (8.5.0-2ubuntu10.6 and others)`
pub fn parse_package_version(page: &str) -> Option<String> {
    let cap = package_heading_pattern().captures(page)?;
    let text = cap.get(1)?.as_str();
    let version = text.split(" and ").next().unwrap_or(text).trim();
    (!version.is_empty()).then(|| version.to_string())
}
