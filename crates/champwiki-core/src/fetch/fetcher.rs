//! Cache-aware page fetching.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tracing::{debug, info};
use url::Url;

use super::rate_limit::RateLimiter;
use super::retry::RetryPolicy;
use super::transport::{HttpTransport, check_status};
use crate::config::WikiConfig;
use crate::key::FetchKey;
use crate::metrics::MetricsRecorder;
use crate::page_cache::{CacheEntry, CacheLookup, CacheStore};
use crate::types::Origin;
use crate::{Error, Result};

/// Page body plus where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    /// Raw HTML.
    pub content: String,
    /// [`Origin::Cache`] for fresh hits, [`Origin::Network`] otherwise.
    pub origin: Origin,
    /// Page URL.
    pub url: String,
    /// When the content was fetched from the network.
    pub fetched_at: DateTime<Utc>,
}

impl FetchedPage {
    fn from_entry(entry: CacheEntry, origin: Origin) -> Self {
        Self {
            content: entry.content,
            origin,
            url: entry.source_url,
            fetched_at: entry.fetched_at,
        }
    }
}

/// Fetches wiki pages through the cache, rate limiter and retry policy.
///
/// A fresh cache hit returns without touching the network. Everything
/// else goes out over [`HttpTransport`] and is written back to the cache.
/// Failures propagate; this layer never substitutes stale content.
#[derive(Clone)]
pub struct PageFetcher {
    transport: Arc<dyn HttpTransport>,
    cache: CacheStore,
    limiter: Arc<RateLimiter>,
    retry: RetryPolicy,
    base_url: Url,
    patch_history_segment: String,
    ttl: Duration,
    metrics: MetricsRecorder,
}

impl std::fmt::Debug for PageFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageFetcher")
            .field("base_url", &self.base_url.as_str())
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl PageFetcher {
    /// Wire a fetcher from its collaborators.
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        cache: CacheStore,
        limiter: Arc<RateLimiter>,
        retry: RetryPolicy,
        wiki: &WikiConfig,
        ttl: Duration,
        metrics: MetricsRecorder,
    ) -> Result<Self> {
        let base_url = Url::parse(&wiki.base_url)
            .map_err(|e| Error::Config(format!("invalid wiki base URL '{}': {e}", wiki.base_url)))?;
        Ok(Self {
            transport,
            cache,
            limiter,
            retry,
            base_url,
            patch_history_segment: wiki.patch_history_segment.clone(),
            ttl,
            metrics,
        })
    }

    /// URL of the page identified by `key`.
    pub fn url_for(&self, key: &FetchKey) -> Result<Url> {
        key.url(&self.base_url, &self.patch_history_segment)
    }

    /// Underlying cache.
    #[must_use]
    pub const fn cache(&self) -> &CacheStore {
        &self.cache
    }

    /// Return the page for `key` from cache or network.
    ///
    /// `force_refresh` skips the cache lookup but still stores the result.
    pub async fn fetch(&self, key: &FetchKey, force_refresh: bool) -> Result<FetchedPage> {
        if !force_refresh {
            if let CacheLookup::Hit(entry) = self.cache.get(key) {
                debug!(key = %key, "serving from cache");
                return Ok(FetchedPage::from_entry(entry, Origin::Cache));
            }
        }

        let url = self.url_for(key)?;
        let host = url.host_str().unwrap_or_default().to_string();

        let body = self
            .retry
            .run(url.as_str(), || self.attempt(&url, &host))
            .await?;

        info!(key = %key, %url, bytes = body.len(), "fetched page");
        let entry = self.cache.put(key, url.as_str(), &body, self.ttl)?;
        Ok(FetchedPage::from_entry(entry, Origin::Network))
    }

    async fn attempt(&self, url: &Url, host: &str) -> Result<String> {
        self.limiter.acquire(host).await;

        let started = Instant::now();
        let result = self.transport.get(url).await;
        let latency = started.elapsed();

        match result {
            Ok(response) => {
                let checked = check_status(url, response.status);
                self.metrics.record_request(latency, checked.is_ok());
                checked.map(|()| response.body)
            },
            Err(err) => {
                self.metrics.record_request(latency, false);
                Err(err)
            },
        }
    }

    /// Any stored entry for `key`, fresh or expired, without counting a lookup.
    #[must_use]
    pub fn stale(&self, key: &FetchKey) -> Option<CacheEntry> {
        self.cache.peek(key)
    }
}
