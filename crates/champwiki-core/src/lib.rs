//! # champwiki-core
//!
//! Data acquisition and resilience engine for a champion wiki.
//!
//! The crate fetches champion pages politely (per-host rate limiting, bounded
//! retries with jittered backoff), caches them on disk with a TTL, extracts
//! stats, abilities and patch history through tiered strategies that survive
//! markup drift, and always hands callers something usable: live data when it
//! is complete, otherwise stale cache or a built-in seed record, labelled so
//! callers can tell which.
//!
//! ## Architecture
//!
//! - **Fetching**: [`fetch::RateLimiter`], [`fetch::RetryPolicy`] and [`fetch::PageFetcher`]
//! - **Caching**: [`page_cache::CacheStore`], content-addressed files with JSON sidecars
//! - **Rendering**: [`render::DynamicRenderer`] for level-dependent stat tables
//! - **Extraction**: [`extract::ExtractionPipeline`] with structural, scoped and regex tiers
//! - **Transformation**: [`transform`] turns raw fields into validated records
//! - **Services**: [`service::ResilientService`] per category, behind [`WikiService`]
//! - **Metrics**: [`MetricsRecorder`] counters shared by every component
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use champwiki_core::{Config, Engine, GetOptions, Outcome, Record};
//!
//! # async fn demo() -> champwiki_core::Result<()> {
//! let engine = Engine::new(Config::load()?)?;
//! let response = engine.service().get("Ahri", &GetOptions::default()).await?;
//!
//! if response.outcome() == Outcome::Degraded {
//!     eprintln!("served from {:?}, missing {:?}", response.origin, response.missing);
//! }
//! if let Record::Stats(stats) = &response.record {
//!     println!("{} fields", stats.stats.len());
//! }
//! println!("{:?}", engine.metrics().snapshot());
//! # Ok(())
//! # }
//! ```

/// Configuration loading and defaults
pub mod config;
/// Error types and result aliases
pub mod error;
/// Tiered HTML extraction
pub mod extract;
/// Rate-limited, retried, cache-aware page fetching
pub mod fetch;
/// Entity names and fetch keys
pub mod key;
/// Process-lifetime counters
pub mod metrics;
/// On-disk page cache
pub mod page_cache;
/// Browser-driven rendering of dynamic tables
pub mod render;
/// Resilient per-category services and the facade
pub mod service;
/// Raw fields to validated records
pub mod transform;
/// Core data types and structures
pub mod types;

use std::sync::Arc;

pub use config::Config;
pub use error::{Error, Result};
pub use fetch::{HttpTransport, PageFetcher, ReqwestTransport};
pub use metrics::{MetricsRecorder, MetricsSnapshot};
pub use page_cache::CacheStore;
pub use render::{DynamicRenderer, RenderRequest, RenderedSnapshot};
pub use service::{GetOptions, Variant, WikiService};
pub use types::*;

use fetch::{RateLimiter, RetryPolicy};
use service::Seed;

/// Everything wired once and shared: cache, metrics, fetcher and services.
#[derive(Debug)]
pub struct Engine {
    config: Config,
    metrics: MetricsRecorder,
    cache: CacheStore,
    fetcher: Arc<PageFetcher>,
    service: WikiService,
}

impl Engine {
    /// Engine with the reqwest transport and no dynamic renderer.
    ///
    /// Level selections are then served from static tables or the growth curve.
    pub fn new(config: Config) -> Result<Self> {
        let transport = Arc::new(ReqwestTransport::new(&config.http)?);
        Self::with_collaborators(config, transport, None)
    }

    /// Engine with explicit HTTP and rendering collaborators.
    pub fn with_collaborators(
        config: Config,
        transport: Arc<dyn HttpTransport>,
        renderer: Option<Arc<dyn DynamicRenderer>>,
    ) -> Result<Self> {
        let metrics = MetricsRecorder::new();
        let limiter = Arc::new(RateLimiter::new(config.rate_limit.min_interval(), metrics.clone()));
        Self::assemble(config, transport, renderer, limiter, metrics)
    }

    /// Engine whose level selections go through a session pool over `driver`.
    ///
    /// Browser navigations and page fetches share one rate limiter.
    pub fn with_driver<D: render::BrowserDriver>(
        config: Config,
        transport: Arc<dyn HttpTransport>,
        driver: D,
    ) -> Result<Self> {
        let metrics = MetricsRecorder::new();
        let limiter = Arc::new(RateLimiter::new(config.rate_limit.min_interval(), metrics.clone()));
        let renderer =
            render::PooledRenderer::new(driver, &config.render, Arc::clone(&limiter), metrics.clone());
        Self::assemble(config, transport, Some(Arc::new(renderer)), limiter, metrics)
    }

    /// Engine that drives a headless Chromium for level selections.
    #[cfg(feature = "chromium")]
    pub async fn with_chromium(config: Config) -> Result<Self> {
        let driver = render::chromium::ChromiumDriver::launch(&config.render).await?;
        let transport = Arc::new(ReqwestTransport::new(&config.http)?);
        Self::with_driver(config, transport, driver)
    }

    fn assemble(
        config: Config,
        transport: Arc<dyn HttpTransport>,
        renderer: Option<Arc<dyn DynamicRenderer>>,
        limiter: Arc<RateLimiter>,
        metrics: MetricsRecorder,
    ) -> Result<Self> {
        config.validate()?;
        let cache = CacheStore::open(&config.cache.dir, metrics.clone())?;
        let retry = RetryPolicy::new(&config.retry, metrics.clone());
        let fetcher = Arc::new(PageFetcher::new(
            transport,
            cache.clone(),
            limiter,
            retry,
            &config.wiki,
            config.cache.ttl(),
            metrics.clone(),
        )?);
        let seed = Arc::new(Seed::builtin()?);
        let service = WikiService::new(&config, Arc::clone(&fetcher), seed, renderer, &metrics);

        Ok(Self {
            config,
            metrics,
            cache,
            fetcher,
            service,
        })
    }

    /// The facade.
    #[must_use]
    pub const fn service(&self) -> &WikiService {
        &self.service
    }

    /// Shared page cache.
    #[must_use]
    pub const fn cache(&self) -> &CacheStore {
        &self.cache
    }

    /// Shared counters.
    #[must_use]
    pub const fn metrics(&self) -> &MetricsRecorder {
        &self.metrics
    }

    /// Shared fetcher.
    #[must_use]
    pub fn fetcher(&self) -> &PageFetcher {
        &self.fetcher
    }

    /// Configuration the engine was built with.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }
}
