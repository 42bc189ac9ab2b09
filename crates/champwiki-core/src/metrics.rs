//! Process-lifetime counters for the acquisition engine.
//!
//! Each counter is bumped only by the component that performs the operation
//! it counts; everyone else reads them through [`MetricsRecorder::snapshot`].
//! Clones share the same underlying counters.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Shared atomic counters.
#[derive(Debug, Clone, Default)]
pub struct MetricsRecorder {
    inner: Arc<Counters>,
}

#[derive(Debug, Default)]
struct Counters {
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    cache_evictions: AtomicU64,
    network_requests: AtomicU64,
    network_failures: AtomicU64,
    network_latency_micros: AtomicU64,
    retries: AtomicU64,
    rate_limit_waits: AtomicU64,
    rate_limit_wait_micros: AtomicU64,
    parse_successes: AtomicU64,
    parse_failures: AtomicU64,
    renders: AtomicU64,
    unstable_renders: AtomicU64,
    fallbacks: AtomicU64,
}

/// Point-in-time copy of every counter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    /// Fresh cache hits.
    pub cache_hits: u64,
    /// Cache misses, expired entries included.
    pub cache_misses: u64,
    /// Entries removed by cleanup, clear or corruption handling.
    pub cache_evictions: u64,
    /// HTTP attempts sent.
    pub network_requests: u64,
    /// HTTP attempts that failed.
    pub network_failures: u64,
    /// Summed latency of HTTP attempts, in microseconds.
    pub network_latency_micros: u64,
    /// Attempts beyond the first.
    pub retries: u64,
    /// Admissions that had to sleep at the rate gate.
    pub rate_limit_waits: u64,
    /// Summed sleep at the rate gate, in microseconds.
    pub rate_limit_wait_micros: u64,
    /// Extractions that produced every mandatory field.
    pub parse_successes: u64,
    /// Extractions that left mandatory fields unresolved.
    pub parse_failures: u64,
    /// Dynamic renders performed.
    pub renders: u64,
    /// Renders that returned before the page stabilized.
    pub unstable_renders: u64,
    /// Responses served from stale cache or seed data.
    pub fallbacks: u64,
}

impl MetricsSnapshot {
    /// Mean latency of an HTTP attempt.
    #[must_use]
    pub const fn avg_network_latency(&self) -> Option<Duration> {
        if self.network_requests == 0 {
            return None;
        }
        Some(Duration::from_micros(
            self.network_latency_micros / self.network_requests,
        ))
    }

    /// Share of cache lookups that were fresh hits, in `[0, 1]`.
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn cache_hit_ratio(&self) -> Option<f64> {
        let total = self.cache_hits + self.cache_misses;
        (total > 0).then(|| self.cache_hits as f64 / total as f64)
    }
}

fn micros(duration: Duration) -> u64 {
    u64::try_from(duration.as_micros()).unwrap_or(u64::MAX)
}

impl MetricsRecorder {
    /// Fresh set of zeroed counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_cache_hit(&self) {
        self.inner.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_cache_miss(&self) {
        self.inner.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_evictions(&self, count: usize) {
        self.inner
            .cache_evictions
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_request(&self, latency: Duration, ok: bool) {
        self.inner.network_requests.fetch_add(1, Ordering::Relaxed);
        self.inner
            .network_latency_micros
            .fetch_add(micros(latency), Ordering::Relaxed);
        if !ok {
            self.inner.network_failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn record_retry(&self) {
        self.inner.retries.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_rate_limit_wait(&self, waited: Duration) {
        self.inner.rate_limit_waits.fetch_add(1, Ordering::Relaxed);
        self.inner
            .rate_limit_wait_micros
            .fetch_add(micros(waited), Ordering::Relaxed);
    }

    pub(crate) fn record_parse(&self, complete: bool) {
        let counter = if complete {
            &self.inner.parse_successes
        } else {
            &self.inner.parse_failures
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a dynamic render; public so external renderers can report too.
    pub fn record_render(&self, stable: bool) {
        self.inner.renders.fetch_add(1, Ordering::Relaxed);
        if !stable {
            self.inner.unstable_renders.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn record_fallback(&self) {
        self.inner.fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    /// Read every counter.
    ///
    /// Counters are read one by one, so a snapshot taken under load may mix
    /// values from slightly different instants.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        let c = &self.inner;
        MetricsSnapshot {
            cache_hits: c.cache_hits.load(Ordering::Relaxed),
            cache_misses: c.cache_misses.load(Ordering::Relaxed),
            cache_evictions: c.cache_evictions.load(Ordering::Relaxed),
            network_requests: c.network_requests.load(Ordering::Relaxed),
            network_failures: c.network_failures.load(Ordering::Relaxed),
            network_latency_micros: c.network_latency_micros.load(Ordering::Relaxed),
            retries: c.retries.load(Ordering::Relaxed),
            rate_limit_waits: c.rate_limit_waits.load(Ordering::Relaxed),
            rate_limit_wait_micros: c.rate_limit_wait_micros.load(Ordering::Relaxed),
            parse_successes: c.parse_successes.load(Ordering::Relaxed),
            parse_failures: c.parse_failures.load(Ordering::Relaxed),
            renders: c.renders.load(Ordering::Relaxed),
            unstable_renders: c.unstable_renders.load(Ordering::Relaxed),
            fallbacks: c.fallbacks.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_counters() {
        let metrics = MetricsRecorder::new();
        let clone = metrics.clone();
        clone.record_cache_hit();
        metrics.record_cache_miss();
        metrics.record_cache_hit();

        let snap = metrics.snapshot();
        assert_eq!(snap.cache_hits, 2);
        assert_eq!(snap.cache_misses, 1);
        assert_eq!(snap.cache_hit_ratio().unwrap(), 2.0 / 3.0);
    }

    #[test]
    fn test_request_latency_average() {
        let metrics = MetricsRecorder::new();
        assert!(metrics.snapshot().avg_network_latency().is_none());

        metrics.record_request(Duration::from_millis(10), true);
        metrics.record_request(Duration::from_millis(30), false);
        let snap = metrics.snapshot();
        assert_eq!(snap.network_requests, 2);
        assert_eq!(snap.network_failures, 1);
        assert_eq!(snap.avg_network_latency(), Some(Duration::from_millis(20)));
    }

    #[test]
    fn test_render_and_parse_counters() {
        let metrics = MetricsRecorder::new();
        metrics.record_render(true);
        metrics.record_render(false);
        metrics.record_parse(true);
        metrics.record_parse(false);
        metrics.record_parse(false);

        let snap = metrics.snapshot();
        assert_eq!(snap.renders, 2);
        assert_eq!(snap.unstable_renders, 1);
        assert_eq!(snap.parse_successes, 1);
        assert_eq!(snap.parse_failures, 2);
    }

    #[test]
    fn test_snapshot_serializes_camel_case() {
        let metrics = MetricsRecorder::new();
        metrics.record_fallback();
        let json = serde_json::to_value(metrics.snapshot()).unwrap();
        assert_eq!(json["fallbacks"], 1);
        assert_eq!(json["cacheHits"], 0);
    }
}
