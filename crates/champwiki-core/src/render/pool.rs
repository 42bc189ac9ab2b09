//! Bounded pool of reusable browser sessions.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, info, warn};
use url::Url;

use super::stability::wait_until_stable;
use super::{BrowserDriver, BrowserSession, DynamicRenderer, RenderRequest, RenderedSnapshot};
use crate::config::RenderConfig;
use crate::fetch::RateLimiter;
use crate::metrics::MetricsRecorder;
use crate::types::Confidence;
use crate::{Error, Result};

/// A session waiting in the pool, with the page it was last left on.
struct Parked<S> {
    url: Option<Url>,
    session: S,
}

type IdleList<S> = Arc<Mutex<Vec<Parked<S>>>>;

/// [`DynamicRenderer`] that leases sessions from a fixed-size pool.
///
/// At most `pool_size` sessions exist at once. Callers beyond that queue on
/// a semaphore for up to `acquire_timeout`. Sessions go back to the pool when
/// a render ends, unless the render failed, in which case they are dropped.
///
/// Navigations pass through the same [`RateLimiter`] as HTTP fetches, so the
/// browser and the fetcher share one request budget per host.
pub struct PooledRenderer<D: BrowserDriver> {
    driver: D,
    permits: Arc<Semaphore>,
    idle: IdleList<D::Session>,
    limiter: Arc<RateLimiter>,
    capacity: usize,
    acquire_timeout: Duration,
    metrics: MetricsRecorder,
}

impl<D: BrowserDriver> std::fmt::Debug for PooledRenderer<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PooledRenderer")
            .field("capacity", &self.capacity)
            .field("available", &self.permits.available_permits())
            .finish_non_exhaustive()
    }
}

/// A checked-out session; returned to the pool on drop unless discarded.
struct Lease<S: Send + 'static> {
    session: Option<S>,
    url: Option<Url>,
    idle: IdleList<S>,
    _permit: OwnedSemaphorePermit,
}

impl<S: Send + 'static> Lease<S> {
    fn discard(&mut self) {
        self.session = None;
    }
}

impl<S: Send + 'static> Drop for Lease<S> {
    fn drop(&mut self) {
        if let Some(session) = self.session.take() {
            self.idle
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(Parked {
                    url: self.url.take(),
                    session,
                });
        }
    }
}

impl<D: BrowserDriver> PooledRenderer<D> {
    /// Pool over `driver` sized and timed by `config`.
    ///
    /// `limiter` gates every navigation by host.
    #[must_use]
    pub fn new(
        driver: D,
        config: &RenderConfig,
        limiter: Arc<RateLimiter>,
        metrics: MetricsRecorder,
    ) -> Self {
        let capacity = config.pool_size.max(1);
        Self {
            driver,
            permits: Arc::new(Semaphore::new(capacity)),
            idle: Arc::new(Mutex::new(Vec::with_capacity(capacity))),
            limiter,
            capacity,
            acquire_timeout: config.acquire_timeout(),
            metrics,
        }
    }

    /// Maximum number of concurrent sessions.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Sessions currently parked in the pool.
    #[must_use]
    pub fn idle_sessions(&self) -> usize {
        self.idle.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Take a parked session, preferring one already showing `url`.
    fn take_idle(&self, url: &Url) -> Option<Parked<D::Session>> {
        let mut idle = self.idle.lock().unwrap_or_else(PoisonError::into_inner);
        match idle.iter().rposition(|parked| parked.url.as_ref() == Some(url)) {
            Some(index) => Some(idle.swap_remove(index)),
            None => idle.pop(),
        }
    }

    async fn lease(&self, request: &RenderRequest) -> Result<Lease<D::Session>> {
        let permit = tokio::time::timeout(self.acquire_timeout, Arc::clone(&self.permits).acquire_owned())
            .await
            .map_err(|_| Error::RenderTimeout {
                url: request.url.to_string(),
                waited: self.acquire_timeout,
            })?
            .map_err(|_| Error::Render("session pool closed".to_string()))?;

        let (session, url) = match self.take_idle(&request.url) {
            Some(parked) => (parked.session, parked.url),
            None => {
                info!(capacity = self.capacity, "opening browser session");
                (self.driver.open().await?, None)
            },
        };
        Ok(Lease {
            session: Some(session),
            url,
            idle: Arc::clone(&self.idle),
            _permit: permit,
        })
    }

    async fn drive(&self, session: &mut D::Session, request: &RenderRequest) -> Result<RenderedSnapshot> {
        let on_page = session.current_url().await?.as_ref() == Some(&request.url);
        if on_page {
            debug!(url = %request.url, "session already on page");
        } else {
            if let Some(host) = request.url.host_str() {
                self.limiter.acquire(host).await;
            }
            tokio::time::timeout(request.timeout, session.navigate(&request.url))
                .await
                .map_err(|_| Error::RenderTimeout {
                    url: request.url.to_string(),
                    waited: request.timeout,
                })??;
        }

        let baseline = session.element_text(&request.watch_selector).await?;
        let value = request.selection.to_string();
        if !session.set_control(&request.control_id, &value).await? {
            return Err(Error::Render(format!(
                "control '#{}' not found on {}",
                request.control_id, request.url
            )));
        }

        let stability = wait_until_stable(session, request, baseline.as_deref()).await?;
        let confidence = if stability.is_settled() {
            Confidence::High
        } else {
            warn!(url = %request.url, selection = request.selection, "page did not update, returning snapshot");
            Confidence::Low
        };
        Ok(RenderedSnapshot {
            html: session.content().await?,
            confidence,
            polls: stability.polls(),
        })
    }
}

#[async_trait]
impl<D: BrowserDriver> DynamicRenderer for PooledRenderer<D> {
    async fn render_at_selection(&self, request: &RenderRequest) -> Result<RenderedSnapshot> {
        let mut lease = self.lease(request).await?;
        let Some(session) = lease.session.as_mut() else {
            return Err(Error::Render("lease without session".to_string()));
        };
        let result = self.drive(session, request).await;
        match result {
            Ok(snapshot) => {
                lease.url = Some(request.url.clone());
                self.metrics.record_render(snapshot.confidence == Confidence::High);
                Ok(snapshot)
            },
            Err(err) => {
                warn!(url = %request.url, error = %err, "render failed, discarding session");
                lease.discard();
                Err(err)
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::Instant;

    type Visits = Arc<Mutex<Vec<Instant>>>;

    /// Scripted tab: each `element_text` call pops the next reading.
    struct FakeSession {
        url: Option<Url>,
        readings: VecDeque<Option<String>>,
        shown: Option<String>,
        has_control: bool,
        visits: Visits,
        selected: Option<String>,
    }

    #[async_trait]
    impl BrowserSession for FakeSession {
        async fn current_url(&mut self) -> Result<Option<Url>> {
            Ok(self.url.clone())
        }

        async fn navigate(&mut self, url: &Url) -> Result<()> {
            self.visits.lock().unwrap().push(Instant::now());
            self.url = Some(url.clone());
            Ok(())
        }

        async fn set_control(&mut self, _control_id: &str, value: &str) -> Result<bool> {
            self.selected = Some(value.to_string());
            Ok(self.has_control)
        }

        async fn element_text(&mut self, _selector: &str) -> Result<Option<String>> {
            let reading = self.readings.pop_front().unwrap_or_else(|| Some("final".into()));
            self.shown.clone_from(&reading);
            Ok(reading)
        }

        async fn content(&mut self) -> Result<String> {
            Ok(format!(
                "<p>level {}: {}</p>",
                self.selected.clone().unwrap_or_default(),
                self.shown.clone().unwrap_or_default()
            ))
        }
    }

    struct FakeDriver {
        opened: Arc<AtomicUsize>,
        visits: Visits,
        readings: Vec<Option<String>>,
        has_control: bool,
    }

    impl FakeDriver {
        fn new(readings: &[Option<&str>]) -> Self {
            Self {
                opened: Arc::new(AtomicUsize::new(0)),
                visits: Arc::new(Mutex::new(Vec::new())),
                readings: readings.iter().map(|r| r.map(str::to_string)).collect(),
                has_control: true,
            }
        }
    }

    #[async_trait]
    impl BrowserDriver for FakeDriver {
        type Session = FakeSession;

        async fn open(&self) -> Result<FakeSession> {
            self.opened.fetch_add(1, Ordering::SeqCst);
            Ok(FakeSession {
                url: None,
                readings: self.readings.iter().cloned().collect(),
                shown: None,
                has_control: self.has_control,
                visits: Arc::clone(&self.visits),
                selected: None,
            })
        }
    }

    fn config(pool_size: usize) -> RenderConfig {
        RenderConfig {
            pool_size,
            timeout_ms: 1_000,
            poll_interval_ms: 100,
            acquire_timeout_ms: 500,
            ..RenderConfig::default()
        }
    }

    fn limiter() -> Arc<RateLimiter> {
        Arc::new(RateLimiter::new(Duration::ZERO, MetricsRecorder::new()))
    }

    fn pool<D: BrowserDriver>(driver: D, cfg: &RenderConfig, metrics: MetricsRecorder) -> PooledRenderer<D> {
        PooledRenderer::new(driver, cfg, limiter(), metrics)
    }

    fn ahri() -> Url {
        Url::parse("https://wiki.example/Ahri").unwrap()
    }

    fn request(config: &RenderConfig) -> RenderRequest {
        RenderRequest::from_config(ahri(), 6, config)
    }

    #[tokio::test(start_paused = true)]
    async fn test_settles_on_repeated_reading() {
        let cfg = config(1);
        let metrics = MetricsRecorder::new();
        let driver = FakeDriver::new(&[Some("1"), Some("2"), Some("2")]);
        let renderer = pool(driver, &cfg, metrics.clone());

        let snapshot = renderer.render_at_selection(&request(&cfg)).await.unwrap();
        assert_eq!(snapshot.confidence, Confidence::High);
        assert_eq!(snapshot.polls, 2);
        assert_eq!(snapshot.html, "<p>level 6: 2</p>");
        assert_eq!(metrics.snapshot().renders, 1);
        assert_eq!(renderer.idle_sessions(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_update_is_waited_for() {
        let cfg = config(1);
        let driver = FakeDriver::new(&[
            Some("L1"),
            Some("L1"),
            Some("L1"),
            Some("L1"),
            Some("L6"),
            Some("L6"),
        ]);
        let renderer = pool(driver, &cfg, MetricsRecorder::new());

        let snapshot = renderer.render_at_selection(&request(&cfg)).await.unwrap();
        assert_eq!(snapshot.html, "<p>level 6: L6</p>");
        assert_eq!(snapshot.confidence, Confidence::High);
        assert_eq!(snapshot.polls, 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unchanged_region_times_out() {
        let mut cfg = config(1);
        cfg.timeout_ms = 350;
        let metrics = MetricsRecorder::new();
        let driver = FakeDriver::new(&[Some("L1"); 16]);
        let renderer = pool(driver, &cfg, metrics.clone());

        let snapshot = renderer.render_at_selection(&request(&cfg)).await.unwrap();
        assert_eq!(snapshot.confidence, Confidence::Low);
        assert_eq!(snapshot.html, "<p>level 6: L1</p>");
        assert_eq!(metrics.snapshot().unstable_renders, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_readings_never_settle() {
        let mut cfg = config(1);
        cfg.timeout_ms = 350;
        let metrics = MetricsRecorder::new();
        let driver = FakeDriver::new(&[None; 16]);
        let renderer = pool(driver, &cfg, metrics.clone());

        let snapshot = renderer.render_at_selection(&request(&cfg)).await.unwrap();
        assert_eq!(snapshot.confidence, Confidence::Low);
        assert_eq!(metrics.snapshot().unstable_renders, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ready_marker_short_circuits() {
        struct Marked(FakeSession);

        #[async_trait]
        impl BrowserSession for Marked {
            async fn current_url(&mut self) -> Result<Option<Url>> {
                self.0.current_url().await
            }
            async fn navigate(&mut self, url: &Url) -> Result<()> {
                self.0.navigate(url).await
            }
            async fn set_control(&mut self, id: &str, value: &str) -> Result<bool> {
                self.0.set_control(id, value).await
            }
            async fn element_text(&mut self, selector: &str) -> Result<Option<String>> {
                Ok((selector == "#ready").then(|| "ok".to_string()))
            }
            async fn content(&mut self) -> Result<String> {
                self.0.content().await
            }
        }

        struct MarkedDriver(FakeDriver);

        #[async_trait]
        impl BrowserDriver for MarkedDriver {
            type Session = Marked;
            async fn open(&self) -> Result<Marked> {
                Ok(Marked(self.0.open().await?))
            }
        }

        let mut cfg = config(1);
        cfg.ready_marker = Some("#ready".into());
        let renderer = pool(MarkedDriver(FakeDriver::new(&[])), &cfg, MetricsRecorder::new());
        let snapshot = renderer.render_at_selection(&request(&cfg)).await.unwrap();
        assert_eq!(snapshot.polls, 1);
        assert_eq!(snapshot.confidence, Confidence::High);
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_reused_without_renavigation() {
        let cfg = config(1);
        let driver = FakeDriver::new(&[Some("a"), Some("a")]);
        let opened = Arc::clone(&driver.opened);
        let visits = Arc::clone(&driver.visits);
        let renderer = pool(driver, &cfg, MetricsRecorder::new());

        renderer.render_at_selection(&request(&cfg)).await.unwrap();
        renderer.render_at_selection(&request(&cfg)).await.unwrap();
        assert_eq!(opened.load(Ordering::SeqCst), 1);
        assert_eq!(visits.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_prefers_session_already_on_page() {
        let cfg = config(2);
        let driver = FakeDriver::new(&[Some("1"), Some("6"), Some("6")]);
        let visits = Arc::clone(&driver.visits);

        let mut on_ahri = driver.open().await.unwrap();
        on_ahri.url = Some(ahri());
        let garen = Url::parse("https://wiki.example/Garen").unwrap();
        let mut on_garen = driver.open().await.unwrap();
        on_garen.url = Some(garen.clone());

        let renderer = pool(driver, &cfg, MetricsRecorder::new());
        {
            let mut idle = renderer.idle.lock().unwrap();
            idle.push(Parked { url: Some(ahri()), session: on_ahri });
            idle.push(Parked { url: Some(garen), session: on_garen });
        }

        renderer.render_at_selection(&request(&cfg)).await.unwrap();
        assert!(visits.lock().unwrap().is_empty());
        assert_eq!(renderer.idle_sessions(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_navigation_waits_for_host_gate() {
        let cfg = config(1);
        let metrics = MetricsRecorder::new();
        let limiter = Arc::new(RateLimiter::new(Duration::from_secs(2), metrics.clone()));
        let driver = FakeDriver::new(&[Some("1"), Some("6"), Some("6")]);
        let visits = Arc::clone(&driver.visits);
        let renderer = PooledRenderer::new(driver, &cfg, Arc::clone(&limiter), metrics.clone());

        // A page fetch to the same host just went out.
        limiter.acquire("wiki.example").await;
        let fetched_at = Instant::now();

        renderer.render_at_selection(&request(&cfg)).await.unwrap();
        let navigated_at = visits.lock().unwrap()[0];
        assert!(navigated_at - fetched_at >= Duration::from_secs(2));
        assert_eq!(metrics.snapshot().rate_limit_waits, 1);

        // Staying on the page does not spend another slot.
        renderer.render_at_selection(&request(&cfg)).await.unwrap();
        assert_eq!(visits.lock().unwrap().len(), 1);
        assert_eq!(metrics.snapshot().rate_limit_waits, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_control_discards_session() {
        let cfg = config(1);
        let mut driver = FakeDriver::new(&[]);
        driver.has_control = false;
        let opened = Arc::clone(&driver.opened);
        let renderer = pool(driver, &cfg, MetricsRecorder::new());

        let err = renderer.render_at_selection(&request(&cfg)).await.unwrap_err();
        assert!(matches!(err, Error::Render(_)));
        assert_eq!(renderer.idle_sessions(), 0);

        // The permit was released, so a second render can open a new session.
        let _ = renderer.render_at_selection(&request(&cfg)).await;
        assert_eq!(opened.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pool_bounds_concurrency() {
        let cfg = config(2);
        let driver = FakeDriver::new(&[Some("a"), Some("b"), Some("b")]);
        let opened = Arc::clone(&driver.opened);
        let renderer = Arc::new(pool(driver, &cfg, MetricsRecorder::new()));

        let tasks: Vec<_> = (0..5)
            .map(|_| {
                let renderer = Arc::clone(&renderer);
                let req = request(&cfg);
                tokio::spawn(async move { renderer.render_at_selection(&req).await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }
        assert!(opened.load(Ordering::SeqCst) <= 2);
        assert_eq!(renderer.capacity(), 2);
        assert!(renderer.idle_sessions() <= 2);
    }
}
