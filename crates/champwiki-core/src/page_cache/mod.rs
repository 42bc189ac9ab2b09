//! On-disk page cache.
//!
//! Pages are stored under a content address derived from their
//! [`FetchKey`](crate::key::FetchKey), with a JSON sidecar carrying the fetch
//! time and TTL. Expired entries stay readable so callers can fall back to
//! them when a live refresh fails.
//!
//! ## Key Types
//!
//! - [`PageId`]: `pg_` + SHA-256 of `<canonical>|<page>`
//! - [`CacheStore`]: get/put/cleanup with atomic writes
//! - [`CacheLookup`]: fresh hit, expired entry, or miss
//!
//! ## Example
//!
//! ```rust
//! use std::time::Duration;
//! use champwiki_core::key::{EntityName, FetchKey, PageKind};
//! use champwiki_core::metrics::MetricsRecorder;
//! use champwiki_core::page_cache::{CacheLookup, CacheStore};
//!
//! let temp = tempfile::TempDir::new()?;
//! let store = CacheStore::open(temp.path(), MetricsRecorder::new())?;
//! let key = FetchKey::new(EntityName::parse("Ahri")?, PageKind::Overview);
//!
//! store.put(&key, "https://wiki.example/Ahri", "<html></html>", Duration::from_secs(60))?;
//! assert!(matches!(store.get(&key), CacheLookup::Hit(_)));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod storage;
mod types;

pub use storage::CacheStore;
pub use types::{CacheEntry, CacheLookup, CacheMeta, CacheStats, PageId};
