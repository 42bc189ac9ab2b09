//! Type definitions for the page cache.

use std::fmt::Write;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::key::FetchKey;

/// Content-addressed page identifier: `pg_<sha256>`.
///
/// Derived from [`FetchKey::cache_input`], so two keys whose entity names
/// canonicalize the same share one identifier.
///
/// ```rust
/// use champwiki_core::key::{EntityName, FetchKey, PageKind};
/// use champwiki_core::page_cache::PageId;
///
/// let key = FetchKey::new(EntityName::parse("Ahri")?, PageKind::Overview);
/// let id = PageId::from_key(&key);
/// assert!(id.as_str().starts_with("pg_"));
/// assert_eq!(id.as_str().len(), 67);
/// # Ok::<(), champwiki_core::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageId(String);

impl PageId {
    /// Hash a fetch key into its identifier.
    #[must_use]
    pub fn from_key(key: &FetchKey) -> Self {
        let digest = Sha256::digest(key.cache_input().as_bytes());
        let hex = digest.iter().fold(String::with_capacity(64), |mut acc, b| {
            // write! to String is infallible
            let _ = write!(acc, "{b:02x}");
            acc
        });
        Self(format!("pg_{hex}"))
    }

    pub(crate) fn from_raw(raw: &str) -> Self {
        Self(raw.to_string())
    }

    /// Full identifier including the `pg_` prefix.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// JSON sidecar stored next to every cached page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheMeta {
    /// When the content was fetched.
    pub fetched_at: DateTime<Utc>,
    /// Freshness window in seconds.
    pub ttl_secs: u64,
    /// URL the content came from.
    pub url: String,
    /// Unhashed key, `<canonical>|<page>`.
    pub key: String,
    /// Content length in bytes.
    pub bytes: u64,
    /// Names the content file this sidecar commits, `<id>.<generation>.html`.
    pub generation: String,
}

/// A cached page together with its metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    /// Content address.
    pub id: PageId,
    /// Unhashed key, `<canonical>|<page>`.
    pub key: String,
    /// Raw page body.
    pub content: String,
    /// When the content was fetched.
    pub fetched_at: DateTime<Utc>,
    /// Freshness window.
    pub ttl: Duration,
    /// URL the content came from.
    pub source_url: String,
}

impl CacheEntry {
    /// Time elapsed since the fetch, clamped at zero for clock skew.
    #[must_use]
    pub fn age_at(&self, now: DateTime<Utc>) -> Duration {
        (now - self.fetched_at).to_std().unwrap_or(Duration::ZERO)
    }

    /// Whether the entry is past its TTL at `now`.
    ///
    /// An entry is fresh only while its age is strictly below the TTL, so a
    /// TTL of zero is always expired.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.age_at(now) >= self.ttl
    }
}

/// Result of a cache lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheLookup {
    /// Entry exists and is within its TTL.
    Hit(CacheEntry),
    /// Entry exists but is past its TTL; content is still usable as stale data.
    Expired(CacheEntry),
    /// Nothing usable is stored.
    Miss,
}

impl CacheLookup {
    /// The fresh entry, if any.
    #[must_use]
    pub fn fresh(self) -> Option<CacheEntry> {
        match self {
            Self::Hit(entry) => Some(entry),
            Self::Expired(_) | Self::Miss => None,
        }
    }

    /// Any stored entry, fresh or not.
    #[must_use]
    pub fn any(self) -> Option<CacheEntry> {
        match self {
            Self::Hit(entry) | Self::Expired(entry) => Some(entry),
            Self::Miss => None,
        }
    }
}

/// Summary of the cache directory contents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    /// Number of entries with a readable sidecar.
    pub entries: usize,
    /// Entries currently past their TTL.
    pub expired: usize,
    /// Summed content size in bytes.
    pub total_bytes: u64,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::key::{EntityName, PageKind};
    use chrono::Duration as ChronoDuration;

    fn entry(age_hours: i64, ttl_hours: u64) -> CacheEntry {
        let key = FetchKey::new(EntityName::parse("Alpha").unwrap(), PageKind::Overview);
        CacheEntry {
            id: key.page_id(),
            key: key.cache_input(),
            content: "<html></html>".into(),
            fetched_at: Utc::now() - ChronoDuration::hours(age_hours),
            ttl: Duration::from_secs(ttl_hours * 3600),
            source_url: "https://wiki.example/Alpha".into(),
        }
    }

    #[test]
    fn test_expiry_boundaries() {
        let now = Utc::now();
        assert!(entry(25, 24).is_expired_at(now));
        assert!(!entry(1, 24).is_expired_at(now));
        assert!(entry(0, 0).is_expired_at(now));
    }

    #[test]
    fn test_future_timestamp_counts_as_fresh() {
        let mut e = entry(0, 1);
        e.fetched_at = Utc::now() + ChronoDuration::minutes(5);
        assert_eq!(e.age_at(Utc::now()), Duration::ZERO);
        assert!(!e.is_expired_at(Utc::now()));
    }

    #[test]
    fn test_lookup_accessors() {
        let e = entry(25, 24);
        assert!(CacheLookup::Expired(e.clone()).fresh().is_none());
        assert_eq!(CacheLookup::Expired(e.clone()).any(), Some(e.clone()));
        assert_eq!(CacheLookup::Hit(e.clone()).fresh(), Some(e));
        assert!(CacheLookup::Miss.any().is_none());
    }
}
