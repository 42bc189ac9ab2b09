//! Per-host request spacing.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::time::{Instant, sleep_until};
use tracing::debug;

use crate::metrics::MetricsRecorder;

type Gate = Arc<tokio::sync::Mutex<Option<Instant>>>;

/// Enforces a minimum interval between requests to the same host.
///
/// Each host has its own gate. The gate lock is held while waiting, so
/// callers are admitted one at a time in arrival order, and callers for
/// different hosts never wait on each other.
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    gates: Mutex<HashMap<String, Gate>>,
    metrics: MetricsRecorder,
}

impl RateLimiter {
    /// Create a limiter with the given spacing.
    #[must_use]
    pub fn new(min_interval: Duration, metrics: MetricsRecorder) -> Self {
        Self {
            min_interval,
            gates: Mutex::new(HashMap::new()),
            metrics,
        }
    }

    /// Configured spacing.
    #[must_use]
    pub const fn min_interval(&self) -> Duration {
        self.min_interval
    }

    fn gate(&self, host: &str) -> Gate {
        let mut gates = self.gates.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(gates.entry(host.to_ascii_lowercase()).or_default())
    }

    /// Wait until a request to `host` may be sent.
    ///
    /// Returns how long the caller slept at the gate.
    pub async fn acquire(&self, host: &str) -> Duration {
        let gate = self.gate(host);
        let mut last = gate.lock().await;

        let mut waited = Duration::ZERO;
        if let Some(previous) = *last {
            let ready_at = previous + self.min_interval;
            let now = Instant::now();
            if ready_at > now {
                waited = ready_at - now;
                debug!(host, ?waited, "rate limit wait");
                sleep_until(ready_at).await;
                self.metrics.record_rate_limit_wait(waited);
            }
        }

        *last = Some(Instant::now());
        waited
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_first_request_is_immediate() {
        let limiter = RateLimiter::new(Duration::from_secs(1), MetricsRecorder::new());
        let start = Instant::now();
        assert_eq!(limiter.acquire("wiki.example").await, Duration::ZERO);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sequential_requests_are_spaced() {
        let metrics = MetricsRecorder::new();
        let limiter = RateLimiter::new(Duration::from_millis(500), metrics.clone());
        let start = Instant::now();
        for _ in 0..3 {
            limiter.acquire("wiki.example").await;
        }
        assert!(start.elapsed() >= Duration::from_millis(1000));
        assert_eq!(metrics.snapshot().rate_limit_waits, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hosts_are_independent() {
        let limiter = RateLimiter::new(Duration::from_secs(5), MetricsRecorder::new());
        let start = Instant::now();
        limiter.acquire("a.example").await;
        limiter.acquire("b.example").await;
        limiter.acquire("B.EXAMPLE").await;
        // Only the repeated host had to wait.
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(5));
        assert!(elapsed < Duration::from_secs(10));
    }
}
