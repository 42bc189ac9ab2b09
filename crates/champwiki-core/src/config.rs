//! Configuration management for the champwiki engine.
//!
//! Configuration is stored in TOML format. Every section and field is
//! optional; anything left out falls back to the defaults below.
//!
//! ## Resolution order
//!
//! 1. Built-in defaults
//! 2. `champwiki.toml` in the platform config directory (or an explicit path)
//! 3. Environment variables with the `CHAMPWIKI_` prefix
//!
//! ## Example Configuration File
//!
//! ```toml
//! [wiki]
//! base_url = "https://wiki.leagueoflegends.com/en-us/"
//!
//! [rate_limit]
//! min_interval_ms = 1500
//!
//! [retry]
//! max_attempts = 4
//! base_delay_ms = 250
//!
//! [cache]
//! ttl_hours = 24
//!
//! [render]
//! pool_size = 2
//! level_control_id = "lvl"
//! ```
//!
//! ```rust
//! use champwiki_core::Config;
//!
//! let config: Config = toml::from_str("[cache]\nttl_hours = 6\n")?;
//! assert_eq!(config.cache.ttl().as_secs(), 6 * 3600);
//! assert_eq!(config.retry.max_attempts, 3);
//! # Ok::<(), toml::de::Error>(())
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{Error, Result};

const CONFIG_FILE_NAME: &str = "champwiki.toml";

/// Top-level configuration for the engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Upstream wiki location.
    pub wiki: WikiConfig,
    /// HTTP client settings.
    pub http: HttpConfig,
    /// Per-host request spacing.
    pub rate_limit: RateLimitConfig,
    /// Retry and backoff policy.
    pub retry: RetryConfig,
    /// On-disk page cache.
    pub cache: CacheConfig,
    /// Browser-driven rendering of level-dependent tables.
    pub render: RenderConfig,
}

/// Where champion pages live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WikiConfig {
    /// Base URL that page titles are joined onto. Must end with `/`.
    pub base_url: String,
    /// Path segment appended to a champion page for its patch history.
    pub patch_history_segment: String,
}

impl Default for WikiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://wiki.leagueoflegends.com/en-us/".to_string(),
            patch_history_segment: "Patch_history".to_string(),
        }
    }
}

/// HTTP client settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// User agent sent with every request.
    pub user_agent: String,
    /// Whole-request timeout enforced by the client.
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: concat!("champwiki/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout_secs: 20,
        }
    }
}

impl HttpConfig {
    /// Request timeout as a [`Duration`].
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Minimum spacing between requests to the same host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Minimum interval between two admitted requests, in milliseconds.
    pub min_interval_ms: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            min_interval_ms: 1000,
        }
    }
}

impl RateLimitConfig {
    /// Minimum interval as a [`Duration`].
    #[must_use]
    pub const fn min_interval(&self) -> Duration {
        Duration::from_millis(self.min_interval_ms)
    }
}

/// Retry policy for transient fetch failures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Base delay; attempt `n` waits `base * 2^n`.
    pub base_delay_ms: u64,
    /// Upper bound on a single backoff delay.
    pub max_delay_ms: u64,
    /// Random extra delay as a fraction of the computed delay (0.0 - 1.0).
    pub jitter: f64,
    /// Timeout applied to each individual attempt.
    pub attempt_timeout_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 200,
            max_delay_ms: 5_000,
            jitter: 0.2,
            attempt_timeout_secs: 15,
        }
    }
}

/// On-disk page cache settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Cache directory. Safe to delete at any time.
    pub dir: PathBuf,
    /// Freshness window for cached pages, in hours.
    pub ttl_hours: u64,
    /// Entries older than this are removed by cleanup regardless of TTL, in days.
    pub max_age_days: u64,
    /// Offer expired content when a live refresh fails.
    pub stale_while_revalidate: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: default_cache_dir(),
            ttl_hours: 24,
            max_age_days: 30,
            stale_while_revalidate: true,
        }
    }
}

impl CacheConfig {
    /// TTL as a [`Duration`].
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_hours * 3600)
    }

    /// Cleanup horizon as a [`Duration`].
    #[must_use]
    pub const fn max_age(&self) -> Duration {
        Duration::from_secs(self.max_age_days * 86_400)
    }
}

/// Settings for the browser-driven renderer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Maximum number of concurrently open browser sessions.
    pub pool_size: usize,
    /// How long to wait for the watched region to stabilize.
    pub timeout_ms: u64,
    /// Delay between two stability checks.
    pub poll_interval_ms: u64,
    /// How long a caller may queue for a free session.
    pub acquire_timeout_ms: u64,
    /// DOM id of the level selector control.
    pub level_control_id: String,
    /// Element whose text is watched for stability after a selection.
    pub watch_selector: String,
    /// Optional element whose presence marks the update as finished.
    pub ready_marker: Option<String>,
    /// Path to a Chrome/Chromium executable; discovered when unset.
    pub executable: Option<PathBuf>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            pool_size: 2,
            timeout_ms: 8_000,
            poll_interval_ms: 150,
            acquire_timeout_ms: 30_000,
            level_control_id: "lvl".to_string(),
            watch_selector: ".infobox".to_string(),
            ready_marker: None,
            executable: None,
        }
    }
}

impl RenderConfig {
    /// Stability timeout as a [`Duration`].
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Polling interval as a [`Duration`].
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Session acquisition timeout as a [`Duration`].
    #[must_use]
    pub const fn acquire_timeout(&self) -> Duration {
        Duration::from_millis(self.acquire_timeout_ms)
    }
}

impl Config {
    /// Load configuration from the default location, then apply environment overrides.
    ///
    /// A missing file is not an error; a malformed one is.
    pub fn load() -> Result<Self> {
        let mut config = match Self::config_path() {
            Some(path) if path.exists() => Self::from_path(&path)?,
            _ => Self::default(),
        };
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Load configuration from an explicit TOML file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config {}: {e}", path.display())))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse config: {e}")))?;
        debug!(path = %path.display(), "loaded configuration");
        config.validate()?;
        Ok(config)
    }

    /// Default location of `champwiki.toml`, if the platform has a config directory.
    #[must_use]
    pub fn config_path() -> Option<PathBuf> {
        if let Ok(dir) = std::env::var("CHAMPWIKI_CONFIG_DIR") {
            let trimmed = dir.trim();
            if !trimmed.is_empty() {
                return Some(PathBuf::from(trimmed).join(CONFIG_FILE_NAME));
            }
        }
        ProjectDirs::from("dev", "outfitter", "champwiki")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    /// Apply `CHAMPWIKI_*` environment overrides.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(dir) = std::env::var("CHAMPWIKI_CACHE_DIR") {
            let trimmed = dir.trim();
            if !trimmed.is_empty() {
                self.cache.dir = PathBuf::from(trimmed);
            }
        }
        if let Ok(url) = std::env::var("CHAMPWIKI_BASE_URL") {
            let trimmed = url.trim();
            if !trimmed.is_empty() {
                self.wiki.base_url = trimmed.to_string();
            }
        }
        if let Ok(hours) = std::env::var("CHAMPWIKI_CACHE_TTL_HOURS") {
            self.cache.ttl_hours = hours.trim().parse().map_err(|e| {
                Error::Config(format!("CHAMPWIKI_CACHE_TTL_HOURS must be an integer: {e}"))
            })?;
        }
        self.validate()
    }

    /// Reject settings the engine cannot operate with.
    pub fn validate(&self) -> Result<()> {
        if !self.wiki.base_url.ends_with('/') {
            return Err(Error::Config(format!(
                "wiki.base_url must end with '/': {}",
                self.wiki.base_url
            )));
        }
        url::Url::parse(&self.wiki.base_url)
            .map_err(|e| Error::Config(format!("wiki.base_url is not a valid URL: {e}")))?;
        if self.retry.max_attempts == 0 {
            return Err(Error::Config("retry.max_attempts must be at least 1".into()));
        }
        if !(0.0..=1.0).contains(&self.retry.jitter) {
            return Err(Error::Config("retry.jitter must lie in [0, 1]".into()));
        }
        if self.render.pool_size == 0 {
            return Err(Error::Config("render.pool_size must be at least 1".into()));
        }
        Ok(())
    }
}

fn default_cache_dir() -> PathBuf {
    ProjectDirs::from("dev", "outfitter", "champwiki").map_or_else(
        || PathBuf::from(".champwiki-cache"),
        |dirs| dirs.cache_dir().join("pages"),
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.cache.ttl(), Duration::from_secs(24 * 3600));
        assert_eq!(config.rate_limit.min_interval(), Duration::from_secs(1));
        assert!(config.cache.stale_while_revalidate);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(CONFIG_FILE_NAME);
        fs::write(
            &path,
            "[retry]\nmax_attempts = 5\n\n[render]\nready_marker = \"#stats-ready\"\n",
        )
        .unwrap();

        let config = Config::from_path(&path).unwrap();
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.base_delay_ms, RetryConfig::default().base_delay_ms);
        assert_eq!(config.render.ready_marker.as_deref(), Some("#stats-ready"));
        assert_eq!(config.render.pool_size, 2);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut config = Config::default();
        config.wiki.base_url = "https://wiki.example/en".into();
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let mut config = Config::default();
        config.retry.max_attempts = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.render.pool_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_malformed_file_is_config_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "[retry\nmax_attempts = ").unwrap();
        assert!(matches!(Config::from_path(&path), Err(Error::Config(_))));
    }

    #[test]
    fn test_round_trip_through_toml() {
        let config = Config::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }
}
