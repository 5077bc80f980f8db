//! Release codename cache
//!
//! Caches the release version -> codename mapping for the whole process.
//! The first caller fetches the series listing; everyone after that reads
//! the shared copy. A failed fetch leaves the cache empty so a later caller
//! can try again.

use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};
use tokio::sync::Mutex;

use crate::config::defaults;
use crate::error::LockError;
use crate::registry::client::PackageIndexClient;

type Series = Arc<BTreeMap<String, String>>;

/// Lazily populated release series cache
#[derive(Debug, Default)]
pub struct ReleaseCache {
    series: Mutex<Option<Series>>,
}

impl ReleaseCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide instance
    pub fn global() -> &'static ReleaseCache {
        static GLOBAL: OnceLock<ReleaseCache> = OnceLock::new();
        GLOBAL.get_or_init(ReleaseCache::new)
    }

    /// Codename for a release version, fetching the listing on first use
    pub async fn codename(
        &self,
        client: &PackageIndexClient,
        version: &str,
    ) -> Result<String, LockError> {
        let series = self.series(client).await?;
        series
            .get(version)
            .cloned()
            .ok_or_else(|| LockError::UnknownRelease {
                distro: defaults::SUPPORTED_DISTRO.to_string(),
                version: version.to_string(),
            })
    }

    async fn series(&self, client: &PackageIndexClient) -> Result<Series, LockError> {
        // Held across the fetch so concurrent first callers wait for one request.
        let mut guard = self.series.lock().await;
        if let Some(series) = guard.as_ref() {
            return Ok(Arc::clone(series));
        }

        tracing::debug!("Fetching release series from {}", client.series_url());
        let series = Arc::new(client.fetch_series().await?);
        *guard = Some(Arc::clone(&series));
        Ok(series)
    }

    /// Whether the listing has been fetched
    pub async fn is_populated(&self) -> bool {
        self.series.lock().await.is_some()
    }

    /// Drop the cached listing
    pub async fn reset(&self) {
        *self.series.lock().await = None;
    }
}
