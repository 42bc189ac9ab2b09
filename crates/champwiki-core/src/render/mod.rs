//! Browser-driven rendering of level-dependent stat tables.
//!
//! Some champion pages only show per-level values after client-side script
//! reacts to the level selector. [`DynamicRenderer`] is the capability the
//! services depend on; [`PooledRenderer`] implements it over any
//! [`BrowserDriver`], and the `chromium` feature supplies a CDP-backed driver.
//!
//! A page that never settles is not an error. The renderer hands back the
//! last snapshot it saw with [`Confidence::Low`] and lets the caller decide.

mod pool;
mod stability;

#[cfg(feature = "chromium")]
pub mod chromium;

use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use crate::Result;
use crate::config::RenderConfig;
use crate::types::Confidence;

pub use pool::PooledRenderer;

/// What to render and how to tell that the page has settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderRequest {
    /// Page to load.
    pub url: Url,
    /// DOM id of the selector control.
    pub control_id: String,
    /// Value to select, e.g. a champion level.
    pub selection: u8,
    /// CSS selector of the element whose text is watched.
    pub watch_selector: String,
    /// CSS selector whose presence means the update finished.
    pub ready_marker: Option<String>,
    /// Upper bound on the stability wait.
    pub timeout: Duration,
    /// Delay between polls.
    pub poll_interval: Duration,
}

impl RenderRequest {
    /// Request for `url` at `selection` using configured selectors and timings.
    #[must_use]
    pub fn from_config(url: Url, selection: u8, config: &RenderConfig) -> Self {
        Self {
            url,
            control_id: config.level_control_id.clone(),
            selection,
            watch_selector: config.watch_selector.clone(),
            ready_marker: config.ready_marker.clone(),
            timeout: config.timeout(),
            poll_interval: config.poll_interval(),
        }
    }
}

/// Page content after a selection was applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedSnapshot {
    /// Serialized DOM.
    pub html: String,
    /// `Low` when the page never settled within the timeout.
    pub confidence: Confidence,
    /// Number of stability polls taken.
    pub polls: u32,
}

/// Renders a page after driving a selector control.
#[async_trait]
pub trait DynamicRenderer: Send + Sync {
    /// Load the page, apply the selection and return the settled DOM.
    async fn render_at_selection(&self, request: &RenderRequest) -> Result<RenderedSnapshot>;
}

/// Launches browser sessions.
#[async_trait]
pub trait BrowserDriver: Send + Sync + 'static {
    /// Session type handed out by this driver.
    type Session: BrowserSession;

    /// Open a fresh session.
    async fn open(&self) -> Result<Self::Session>;
}

/// One open tab.
#[async_trait]
pub trait BrowserSession: Send + 'static {
    /// URL the tab currently shows, if any.
    async fn current_url(&mut self) -> Result<Option<Url>>;

    /// Load `url` and wait for the document.
    async fn navigate(&mut self, url: &Url) -> Result<()>;

    /// Set the control with DOM id `control_id` to `value` and fire its change event.
    ///
    /// Returns `false` when no such control exists.
    async fn set_control(&mut self, control_id: &str, value: &str) -> Result<bool>;

    /// Text of the first element matching `selector`.
    async fn element_text(&mut self, selector: &str) -> Result<Option<String>>;

    /// Serialized DOM.
    async fn content(&mut self) -> Result<String>;
}
