//! Resilient per-category services and the [`WikiService`] facade.
//!
//! A service call walks `fetching → extracting → transforming` and ends in
//! one of three states:
//!
//! - **complete**: live data with every mandatory field ([`Source::Primary`])
//! - **degraded**: stale cache or seed data ([`Source::FallbackOnError`],
//!   [`Source::FallbackOnIncomplete`]), or live data with gaps
//! - **not found**: neither live data nor the seed set knows the entity
//!
//! Only [`Error::EntityNotFound`] and [`Error::InvalidArgument`] leave
//! [`WikiService::get`]; every other failure is absorbed into a fallback.

mod abilities;
mod patches;
pub mod seed;
mod stats;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};
use url::Url;

use crate::config::Config;
use crate::fetch::PageFetcher;
use crate::key::{EntityName, FetchKey, PageKind};
use crate::metrics::MetricsRecorder;
use crate::render::DynamicRenderer;
use crate::transform::Transformed;
use crate::types::{Confidence, MAX_LEVEL, MIN_LEVEL, Origin, Record, ServiceResponse, Source};
use crate::{Error, Result};

pub use abilities::AbilitiesCategory;
pub use patches::PatchesCategory;
pub use seed::Seed;
pub use stats::StatsCategory;

/// Which record a facade call returns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    /// Base statistics, optionally at a level.
    #[default]
    Stats,
    /// The five abilities.
    Abilities,
    /// Patch history.
    Patches,
}

impl Variant {
    /// Lower-case name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stats => "stats",
            Self::Abilities => "abilities",
            Self::Patches => "patches",
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Variant {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stats" => Ok(Self::Stats),
            "abilities" => Ok(Self::Abilities),
            "patches" | "patch_history" => Ok(Self::Patches),
            other => Err(Error::InvalidArgument(format!(
                "unknown variant '{other}' (expected stats, abilities or patches)"
            ))),
        }
    }
}

fn check_selection(selection: Option<u8>) -> Result<()> {
    match selection {
        Some(level) if !(MIN_LEVEL..=MAX_LEVEL).contains(&level) => Err(Error::InvalidArgument(
            format!("selection {level} outside {MIN_LEVEL}..={MAX_LEVEL}"),
        )),
        _ => Ok(()),
    }
}

/// Per-call options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GetOptions {
    /// Record to return; stats when unset.
    pub variant: Option<Variant>,
    /// Champion level for level-dependent stats, 1–18.
    pub selection: Option<u8>,
    /// Bypass the cache lookup.
    pub force_refresh: bool,
    /// Bound on live acquisition; on expiry the call degrades.
    pub deadline: Option<Duration>,
}

impl GetOptions {
    /// Effective variant.
    #[must_use]
    pub fn variant(&self) -> Variant {
        self.variant.unwrap_or_default()
    }

    /// Reject selections outside 1–18 and selections on non-stat variants.
    pub fn validate(&self) -> Result<()> {
        check_selection(self.selection)?;
        if self.selection.is_some() && self.variant() != Variant::Stats {
            return Err(Error::InvalidArgument(format!(
                "selection only applies to stats, not {}",
                self.variant()
            )));
        }
        Ok(())
    }
}

/// What differs between the stats, abilities and patches services.
#[async_trait]
pub trait Category: Send + Sync + 'static {
    /// Record this category produces.
    type Record: Clone + fmt::Debug + Send + Sync + 'static;

    /// Name used in logs.
    const NAME: &'static str;

    /// Page the record is read from.
    fn page(&self) -> PageKind;

    /// Extract and validate a record from page HTML.
    fn parse(&self, entity: &EntityName, html: &str) -> Transformed<Self::Record>;

    /// Whether `record` holds any mandatory field at all.
    fn has_content(record: &Self::Record) -> bool;

    /// Mandatory fields `record` lacks.
    fn missing(record: &Self::Record) -> Vec<String>;

    /// Built-in record for `entity`, if seeded.
    fn seed(&self, entity: &EntityName) -> Option<Self::Record>;

    /// Known page title for `entity`, when its spelling differs from the input.
    fn page_title(&self, _entity: &EntityName) -> Option<&str> {
        None
    }

    /// Add live-only detail to a complete record; returns its confidence.
    async fn enrich_live(
        &self,
        _entity: &EntityName,
        _url: &Url,
        _html: &str,
        _live: &mut Transformed<Self::Record>,
        _options: &GetOptions,
    ) -> Confidence {
        Confidence::High
    }

    /// Add detail derivable without the network.
    fn enrich_offline(&self, _record: &mut Self::Record, _options: &GetOptions) {}
}

struct Live<R> {
    transformed: Transformed<R>,
    origin: Origin,
    confidence: Confidence,
}

fn respond<R>(
    record: R,
    source: Source,
    origin: Origin,
    confidence: Confidence,
    missing: Vec<String>,
    issues: Vec<String>,
) -> ServiceResponse<R> {
    ServiceResponse {
        record,
        source,
        origin,
        confidence,
        missing,
        issues,
        timestamp: Utc::now(),
    }
}

/// Live acquisition with stale-cache and seed fallbacks for one category.
pub struct ResilientService<C: Category> {
    category: C,
    fetcher: Arc<PageFetcher>,
    metrics: MetricsRecorder,
    stale_while_revalidate: bool,
}

impl<C: Category> fmt::Debug for ResilientService<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResilientService")
            .field("category", &C::NAME)
            .field("stale_while_revalidate", &self.stale_while_revalidate)
            .finish_non_exhaustive()
    }
}

impl<C: Category> ResilientService<C> {
    /// Wrap `category` around a shared fetcher.
    #[must_use]
    pub const fn new(
        category: C,
        fetcher: Arc<PageFetcher>,
        metrics: MetricsRecorder,
        stale_while_revalidate: bool,
    ) -> Self {
        Self {
            category,
            fetcher,
            metrics,
            stale_while_revalidate,
        }
    }

    /// Record for `entity`, live when possible.
    ///
    /// Returns [`Error::InvalidArgument`] for unusable names or selections and
    /// [`Error::EntityNotFound`] when no source knows the entity.
    #[instrument(level = "debug", skip(self, options), fields(category = C::NAME))]
    pub async fn get(&self, entity: &str, options: &GetOptions) -> Result<ServiceResponse<C::Record>> {
        check_selection(options.selection)?;
        let mut name = EntityName::parse(entity)?;
        if let Some(title) = self.category.page_title(&name) {
            name = name.with_title(title);
        }
        let key = FetchKey::new(name.clone(), self.category.page());

        let live = match options.deadline {
            Some(limit) => tokio::time::timeout(limit, self.acquire(&name, &key, options))
                .await
                .unwrap_or_else(|_| Err(Error::DeadlineExceeded(limit))),
            None => self.acquire(&name, &key, options).await,
        };

        match live {
            Ok(live) if live.transformed.is_complete() => {
                debug!(state = "complete", entity = %name, origin = ?live.origin);
                Ok(respond(
                    live.transformed.record,
                    Source::Primary,
                    live.origin,
                    live.confidence,
                    Vec::new(),
                    live.transformed.issues,
                ))
            },
            Ok(live) => self.on_incomplete(&name, live, options),
            Err(err) => self.on_error(&name, &key, &err, options),
        }
    }

    async fn acquire(&self, name: &EntityName, key: &FetchKey, options: &GetOptions) -> Result<Live<C::Record>> {
        debug!(state = "fetching", key = %key);
        let page = self.fetcher.fetch(key, options.force_refresh).await?;

        debug!(state = "extracting", origin = ?page.origin, bytes = page.content.len());
        let mut transformed = self.category.parse(name, &page.content);
        self.metrics.record_parse(transformed.is_complete());

        debug!(
            state = "transforming",
            missing = transformed.missing.len(),
            issues = transformed.issues.len()
        );
        let confidence = if transformed.is_complete() {
            let url = self.fetcher.url_for(key)?;
            self.category
                .enrich_live(name, &url, &page.content, &mut transformed, options)
                .await
        } else {
            Confidence::High
        };
        Ok(Live {
            transformed,
            origin: page.origin,
            confidence,
        })
    }

    fn seeded(&self, name: &EntityName, options: &GetOptions) -> Option<C::Record> {
        let mut record = self.category.seed(name)?;
        self.category.enrich_offline(&mut record, options);
        Some(record)
    }

    fn on_incomplete(
        &self,
        name: &EntityName,
        live: Live<C::Record>,
        options: &GetOptions,
    ) -> Result<ServiceResponse<C::Record>> {
        let Transformed {
            mut record,
            issues,
            missing,
        } = live.transformed;
        warn!(entity = %name, category = C::NAME, ?missing, "live record incomplete");

        if let Some(seed) = self.seeded(name, options) {
            debug!(state = "degraded", entity = %name, fallback = "seed");
            self.metrics.record_fallback();
            let missing = C::missing(&seed);
            return Ok(respond(
                seed,
                Source::FallbackOnIncomplete,
                Origin::Seed,
                Confidence::High,
                missing,
                issues,
            ));
        }

        if C::has_content(&record) {
            debug!(state = "degraded", entity = %name, fallback = "none");
            self.category.enrich_offline(&mut record, options);
            return Ok(respond(record, Source::Primary, live.origin, live.confidence, missing, issues));
        }

        debug!(state = "not_found", entity = %name);
        Err(Error::EntityNotFound {
            entity: name.title().to_string(),
            reason: format!("page has none of the mandatory fields {missing:?}"),
        })
    }

    fn on_error(
        &self,
        name: &EntityName,
        key: &FetchKey,
        err: &Error,
        options: &GetOptions,
    ) -> Result<ServiceResponse<C::Record>> {
        warn!(entity = %name, category = C::NAME, error = %err, "live acquisition failed");

        if self.stale_while_revalidate {
            if let Some(entry) = self.fetcher.stale(key) {
                let mut stale = self.category.parse(name, &entry.content);
                if stale.is_complete() {
                    debug!(state = "degraded", entity = %name, fallback = "stale_cache");
                    self.metrics.record_fallback();
                    self.category.enrich_offline(&mut stale.record, options);
                    return Ok(respond(
                        stale.record,
                        Source::FallbackOnError,
                        Origin::StaleCache,
                        Confidence::High,
                        Vec::new(),
                        stale.issues,
                    ));
                }
            }
        }

        if let Some(seed) = self.seeded(name, options) {
            debug!(state = "degraded", entity = %name, fallback = "seed");
            self.metrics.record_fallback();
            let missing = C::missing(&seed);
            return Ok(respond(
                seed,
                Source::FallbackOnError,
                Origin::Seed,
                Confidence::High,
                missing,
                Vec::new(),
            ));
        }

        debug!(state = "not_found", entity = %name);
        Err(Error::EntityNotFound {
            entity: name.title().to_string(),
            reason: err.to_string(),
        })
    }
}

/// Single entry point dispatching on [`GetOptions::variant`].
#[derive(Debug)]
pub struct WikiService {
    stats: ResilientService<StatsCategory>,
    abilities: ResilientService<AbilitiesCategory>,
    patches: ResilientService<PatchesCategory>,
}

impl WikiService {
    /// Build the three services over one fetcher, seed set and optional renderer.
    #[must_use]
    pub fn new(
        config: &Config,
        fetcher: Arc<PageFetcher>,
        seed: Arc<Seed>,
        renderer: Option<Arc<dyn DynamicRenderer>>,
        metrics: &MetricsRecorder,
    ) -> Self {
        let swr = config.cache.stale_while_revalidate;
        Self {
            stats: ResilientService::new(
                StatsCategory::new(Arc::clone(&seed), renderer, config.render.clone()),
                Arc::clone(&fetcher),
                metrics.clone(),
                swr,
            ),
            abilities: ResilientService::new(
                AbilitiesCategory::new(Arc::clone(&seed)),
                Arc::clone(&fetcher),
                metrics.clone(),
                swr,
            ),
            patches: ResilientService::new(PatchesCategory::new(seed), fetcher, metrics.clone(), swr),
        }
    }

    /// Fetch the record selected by `options`.
    ///
    /// ```rust,no_run
    /// use champwiki_core::{Config, Engine, GetOptions, Record, Source};
    ///
    /// # async fn demo() -> champwiki_core::Result<()> {
    /// let engine = Engine::new(Config::load()?)?;
    /// let options = GetOptions { selection: Some(6), ..GetOptions::default() };
    /// let response = engine.service().get("Ahri", &options).await?;
    /// match response.source {
    ///     Source::Primary => println!("live data"),
    ///     Source::FallbackOnError | Source::FallbackOnIncomplete => println!("fallback data"),
    /// }
    /// if let Record::Stats(stats) = response.record {
    ///     println!("{:?}", stats.level);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    #[instrument(skip(self, options), fields(variant = %options.variant()))]
    pub async fn get(&self, entity: &str, options: &GetOptions) -> Result<ServiceResponse<Record>> {
        options.validate()?;
        match options.variant() {
            Variant::Stats => Ok(self.stats.get(entity, options).await?.map(Record::Stats)),
            Variant::Abilities => Ok(self.abilities.get(entity, options).await?.map(Record::Abilities)),
            Variant::Patches => Ok(self.patches.get(entity, options).await?.map(Record::Patches)),
        }
    }

    /// Stats service.
    #[must_use]
    pub const fn stats(&self) -> &ResilientService<StatsCategory> {
        &self.stats
    }

    /// Abilities service.
    #[must_use]
    pub const fn abilities(&self) -> &ResilientService<AbilitiesCategory> {
        &self.abilities
    }

    /// Patch history service.
    #[must_use]
    pub const fn patches(&self) -> &ResilientService<PatchesCategory> {
        &self.patches
    }
}
