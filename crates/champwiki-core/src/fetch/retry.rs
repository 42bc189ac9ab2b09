//! Bounded retries with exponential backoff and jitter.

use std::future::Future;
use std::time::Duration;

use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

use crate::config::RetryConfig;
use crate::metrics::MetricsRecorder;
use crate::{Error, Result};

/// Retry policy for fetch operations.
///
/// Recoverable errors (see [`Error::is_recoverable`]) are retried after
/// `base_delay * 2^attempt`, plus up to `jitter * delay` of random extra
/// wait, capped at `max_delay`. Anything else is returned as-is on the
/// first occurrence.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
    jitter: f64,
    attempt_timeout: Duration,
    metrics: MetricsRecorder,
}

impl RetryPolicy {
    /// Build a policy from configuration.
    #[must_use]
    pub fn new(config: &RetryConfig, metrics: MetricsRecorder) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: Duration::from_millis(config.base_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
            jitter: config.jitter.clamp(0.0, 1.0),
            attempt_timeout: Duration::from_secs(config.attempt_timeout_secs),
            metrics,
        }
    }

    /// Total attempts, including the first.
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay before retry number `attempt` (zero-based), jitter included.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        let delay = self.base_delay.saturating_mul(factor).min(self.max_delay);
        let extra = delay.mul_f64(self.jitter * fastrand::f64());
        delay.saturating_add(extra).min(self.max_delay)
    }

    /// Run `op` until it succeeds, fails permanently, or the budget is spent.
    ///
    /// Each attempt is bounded by the per-attempt timeout; a timed-out
    /// attempt counts as a transient failure. Exhaustion yields
    /// [`Error::FetchFailed`] carrying the last cause.
    pub async fn run<T, F, Fut>(&self, url: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;
        loop {
            let outcome = match timeout(self.attempt_timeout, op()).await {
                Ok(result) => result,
                Err(_) => Err(Error::TransientFetch {
                    url: url.to_string(),
                    status: None,
                    reason: format!("attempt timed out after {:?}", self.attempt_timeout),
                }),
            };
            attempt += 1;

            match outcome {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(url, attempt, "succeeded after retry");
                    }
                    return Ok(value);
                },
                Err(err) if !err.is_recoverable() => return Err(err),
                Err(err) if attempt >= self.max_attempts => {
                    warn!(url, attempts = attempt, error = %err, "retry budget exhausted");
                    return Err(Error::FetchFailed {
                        url: url.to_string(),
                        attempts: attempt,
                        source: Box::new(err),
                    });
                },
                Err(err) => {
                    let delay = self.delay_for(attempt - 1);
                    warn!(url, attempt, ?delay, error = %err, "transient failure, retrying");
                    self.metrics.record_retry();
                    sleep(delay).await;
                },
            }
        }
    }
}
