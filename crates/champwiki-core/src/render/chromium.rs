//! Headless Chromium driver over the DevTools protocol.

use async_trait::async_trait;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use serde::Deserialize;
use tokio::task::JoinHandle;
use tracing::{debug, info};
use url::Url;

use super::{BrowserDriver, BrowserSession};
use crate::config::RenderConfig;
use crate::{Error, Result};

fn render_err(err: impl std::fmt::Display) -> Error {
    Error::Render(err.to_string())
}

/// One headless browser process; each session is a tab.
pub struct ChromiumDriver {
    browser: Browser,
    handler: JoinHandle<()>,
}

impl std::fmt::Debug for ChromiumDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChromiumDriver").finish_non_exhaustive()
    }
}

impl ChromiumDriver {
    /// Launch a headless browser, using `config.executable` when set.
    pub async fn launch(config: &RenderConfig) -> Result<Self> {
        let mut builder = BrowserConfig::builder();
        if let Some(path) = &config.executable {
            builder = builder.chrome_executable(path);
        }
        let browser_config = builder.build().map_err(Error::Render)?;
        let (browser, mut events) = Browser::launch(browser_config).await.map_err(render_err)?;
        info!("chromium launched");

        let handler = tokio::spawn(async move {
            while let Some(event) = events.next().await {
                if let Err(err) = event {
                    debug!(error = %err, "chromium event loop ended");
                    break;
                }
            }
        });
        Ok(Self { browser, handler })
    }
}

impl Drop for ChromiumDriver {
    fn drop(&mut self) {
        self.handler.abort();
    }
}

#[async_trait]
impl BrowserDriver for ChromiumDriver {
    type Session = ChromiumSession;

    async fn open(&self) -> Result<ChromiumSession> {
        let page = self.browser.new_page("about:blank").await.map_err(render_err)?;
        Ok(ChromiumSession { page })
    }
}

/// A browser tab.
#[derive(Debug)]
pub struct ChromiumSession {
    page: Page,
}

#[derive(Deserialize)]
struct Probe {
    found: bool,
    text: String,
}

impl ChromiumSession {
    async fn eval<T: serde::de::DeserializeOwned>(&self, script: String) -> Result<T> {
        self.page
            .evaluate(script)
            .await
            .map_err(render_err)?
            .into_value()
            .map_err(render_err)
    }
}

#[async_trait]
impl BrowserSession for ChromiumSession {
    async fn current_url(&mut self) -> Result<Option<Url>> {
        let current = self.page.url().await.map_err(render_err)?;
        Ok(current.and_then(|raw| Url::parse(&raw).ok()))
    }

    async fn navigate(&mut self, url: &Url) -> Result<()> {
        debug!(url = %url, "navigating");
        self.page.goto(url.as_str()).await.map_err(render_err)?;
        Ok(())
    }

    async fn set_control(&mut self, control_id: &str, value: &str) -> Result<bool> {
        let script = format!(
            "(() => {{ const el = document.getElementById({id}); if (!el) return false; \
             el.value = {value}; \
             el.dispatchEvent(new Event('input', {{ bubbles: true }})); \
             el.dispatchEvent(new Event('change', {{ bubbles: true }})); \
             return true; }})()",
            id = serde_json::to_string(control_id)?,
            value = serde_json::to_string(value)?,
        );
        self.eval(script).await
    }

    async fn element_text(&mut self, selector: &str) -> Result<Option<String>> {
        let script = format!(
            "(() => {{ const el = document.querySelector({sel}); \
             return {{ found: el !== null, text: el ? el.textContent : '' }}; }})()",
            sel = serde_json::to_string(selector)?,
        );
        let probe: Probe = self.eval(script).await?;
        Ok(probe.found.then_some(probe.text))
    }

    async fn content(&mut self) -> Result<String> {
        self.page.content().await.map_err(render_err)
    }
}
