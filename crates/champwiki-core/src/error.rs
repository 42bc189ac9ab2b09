//! Error types and handling for champwiki-core operations.
//!
//! Errors are split along the line the resilience engine cares about: whether
//! a failure is worth retrying, and whether it may leave the service layer.
//!
//! ## Error Categories
//!
//! - **Fetch Errors**: transient (retried) and permanent (not retried) HTTP failures,
//!   plus [`Error::FetchFailed`] once the retry budget is spent
//! - **Render Errors**: browser automation failures and pool timeouts
//! - **Extraction Errors**: incomplete pages (converted to fallbacks, never surfaced)
//! - **Cache Errors**: unreadable entries (treated as misses, never surfaced)
//! - **Caller Errors**: unknown entities and invalid arguments
//!
//! ## Propagation
//!
//! Everything below the service layer is recovered locally. Only
//! [`Error::EntityNotFound`] and [`Error::InvalidArgument`] reach callers of
//! [`crate::WikiService::get`]:
//!
//! ```rust
//! use champwiki_core::Error;
//!
//! fn describe(err: &Error) -> &'static str {
//!     match err {
//!         Error::EntityNotFound { .. } => "no such champion",
//!         Error::InvalidArgument(_) => "bad request",
//!         _ => "internal",
//!     }
//! }
//!
//! let err = Error::InvalidArgument("selection must be between 1 and 18".into());
//! assert_eq!(describe(&err), "bad request");
//! assert!(!err.is_recoverable());
//! ```

use std::time::Duration;

use thiserror::Error;

/// The main error type for champwiki-core operations.
#[derive(Error, Debug)]
pub enum Error {
    /// A fetch attempt failed in a way that may succeed on retry.
    ///
    /// Covers timeouts, connection resets/refusals, 5xx responses and 429.
    #[error("transient fetch error for '{url}': {reason}")]
    TransientFetch {
        /// Target URL.
        url: String,
        /// HTTP status, when a response was received.
        status: Option<u16>,
        /// Human readable cause.
        reason: String,
    },

    /// A fetch attempt failed in a way retrying cannot fix.
    ///
    /// Covers 404 and other 4xx responses and malformed URLs.
    #[error("permanent fetch error for '{url}': {reason}")]
    PermanentFetch {
        /// Target URL.
        url: String,
        /// HTTP status, when a response was received.
        status: Option<u16>,
        /// Human readable cause.
        reason: String,
    },

    /// The retry budget was exhausted; carries the last underlying cause.
    #[error("fetch failed for '{url}' after {attempts} attempt(s): {source}")]
    FetchFailed {
        /// Target URL.
        url: String,
        /// Number of attempts made.
        attempts: u32,
        /// Last failure observed.
        #[source]
        source: Box<Error>,
    },

    /// No browser session became available within the allowed time.
    ///
    /// Note that a page which never stabilizes is *not* an error: the renderer
    /// returns a low-confidence snapshot instead.
    #[error("render timed out for '{url}' after {waited:?}")]
    RenderTimeout {
        /// Page being rendered.
        url: String,
        /// How long the caller waited.
        waited: Duration,
    },

    /// Browser automation failed (launch, navigation, missing control).
    #[error("render error: {0}")]
    Render(String),

    /// One or more mandatory fields could not be extracted.
    #[error("extraction incomplete for '{entity}': missing {missing:?}")]
    ExtractionIncomplete {
        /// Entity being extracted.
        entity: String,
        /// Fields that stayed unresolved.
        missing: Vec<String>,
    },

    /// The entity exists in neither the live source nor the seed dataset.
    #[error("entity not found: '{entity}' ({reason})")]
    EntityNotFound {
        /// Entity as requested by the caller.
        entity: String,
        /// What the live source reported.
        reason: String,
    },

    /// A cache entry could not be read back.
    #[error("cache entry '{key}' is corrupt: {reason}")]
    CacheCorruption {
        /// Hashed cache key.
        key: String,
        /// What went wrong while reading it.
        reason: String,
    },

    /// Cache directory operation failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// The caller supplied arguments outside the accepted domain.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The caller's deadline elapsed before live acquisition finished.
    #[error("deadline of {0:?} exceeded")]
    DeadlineExceeded(Duration),

    /// I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The HTTP client could not be constructed.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Configuration is invalid or inaccessible.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<toml::ser::Error> for Error {
    fn from(err: toml::ser::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl Error {
    /// Check if the error might be recoverable through retry logic.
    ///
    /// ```rust
    /// use champwiki_core::Error;
    ///
    /// let transient = Error::TransientFetch {
    ///     url: "https://wiki.example/Ahri".into(),
    ///     status: Some(503),
    ///     reason: "service unavailable".into(),
    /// };
    /// assert!(transient.is_recoverable());
    ///
    /// let permanent = Error::PermanentFetch {
    ///     url: "https://wiki.example/Nope".into(),
    ///     status: Some(404),
    ///     reason: "not found".into(),
    /// };
    /// assert!(!permanent.is_recoverable());
    /// ```
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::TransientFetch { .. } | Self::RenderTimeout { .. } => true,
            Self::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::TimedOut | std::io::ErrorKind::Interrupted
            ),
            _ => false,
        }
    }

    /// Whether the failure proves the page does not exist upstream.
    ///
    /// Looks through [`Error::FetchFailed`] to the underlying cause.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::PermanentFetch {
                status: Some(404), ..
            } => true,
            Self::FetchFailed { source, .. } => source.is_not_found(),
            _ => false,
        }
    }

    /// Get the error category as a string identifier for logs and metrics.
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match self {
            Self::TransientFetch { .. } | Self::PermanentFetch { .. } | Self::FetchFailed { .. } => {
                "fetch"
            },
            Self::RenderTimeout { .. } | Self::Render(_) => "render",
            Self::ExtractionIncomplete { .. } => "extraction",
            Self::EntityNotFound { .. } => "not_found",
            Self::CacheCorruption { .. } | Self::Storage(_) => "cache",
            Self::InvalidArgument(_) => "invalid_argument",
            Self::DeadlineExceeded(_) => "deadline",
            Self::Io(_) => "io",
            Self::Network(_) => "network",
            Self::Config(_) => "config",
            Self::Serialization(_) => "serialization",
        }
    }
}

/// Convenience type alias for `std::result::Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
