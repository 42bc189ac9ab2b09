//! Storage layer for the page cache.
//!
//! ## Storage Layout
//!
//! ```text
//! <cache_dir>/
//!   pg_<sha256>.<generation>.html   # raw page body, one file per write
//!   pg_<sha256>.meta.json           # fetched_at, ttl_secs, url, key, bytes, generation
//! ```
//!
//! Every write picks a fresh generation and lands its body under its own
//! name before the sidecar is renamed over the old one. The sidecar rename
//! is the commit point: readers follow whichever sidecar they find to the
//! body it names, so they never pair a sidecar with another writer's body.
//! The replaced generation is removed after the commit. Deleting the
//! directory is always safe.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::key::FetchKey;
use crate::metrics::MetricsRecorder;
use crate::page_cache::{CacheEntry, CacheLookup, CacheMeta, CacheStats, PageId};
use crate::{Error, Result};

const CONTENT_EXT: &str = "html";
const META_SUFFIX: &str = ".meta.json";

/// Content-addressed file cache with TTL and metadata sidecars.
///
/// Safe to share between tasks; concurrent writers to the same key race on
/// the final rename and the last one wins with a complete file.
#[derive(Debug, Clone)]
pub struct CacheStore {
    dir: PathBuf,
    metrics: MetricsRecorder,
}

impl CacheStore {
    /// Open (and create if needed) a cache rooted at `dir`.
    pub fn open(dir: impl AsRef<Path>, metrics: MetricsRecorder) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|e| {
            Error::Storage(format!(
                "Failed to create cache directory {}: {e}",
                dir.display()
            ))
        })?;
        Ok(Self { dir, metrics })
    }

    /// Cache root directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn content_path(&self, id: &PageId, generation: &str) -> PathBuf {
        self.dir.join(format!("{id}.{generation}.{CONTENT_EXT}"))
    }

    /// Every body file stored for `id`, committed or not.
    fn content_files(&self, id: &PageId) -> Vec<PathBuf> {
        let prefix = format!("{id}.");
        let suffix = format!(".{CONTENT_EXT}");
        fs::read_dir(&self.dir)
            .map(|entries| {
                entries
                    .filter_map(std::result::Result::ok)
                    .filter(|entry| {
                        entry
                            .file_name()
                            .to_str()
                            .is_some_and(|name| name.starts_with(&prefix) && name.ends_with(&suffix))
                    })
                    .map(|entry| entry.path())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn read_meta(&self, id: &PageId) -> Option<CacheMeta> {
        fs::read_to_string(self.meta_path(id))
            .ok()
            .and_then(|raw| serde_json::from_str(&raw).ok())
    }

    fn meta_path(&self, id: &PageId) -> PathBuf {
        self.dir.join(format!("{id}{META_SUFFIX}"))
    }

    /// Look up `key`, counting a hit for fresh entries and a miss otherwise.
    ///
    /// Unreadable sidecars are deleted and reported as [`CacheLookup::Miss`].
    /// A body that is missing or does not match its sidecar is a miss too,
    /// but is left on disk for the writer that owns it.
    pub fn get(&self, key: &FetchKey) -> CacheLookup {
        let id = key.page_id();
        let lookup = match self.load(&id, &key.cache_input()) {
            Ok(Some(entry)) if entry.is_expired_at(Utc::now()) => {
                debug!(key = %key, "cache entry expired");
                CacheLookup::Expired(entry)
            },
            Ok(Some(entry)) => CacheLookup::Hit(entry),
            Ok(None) => CacheLookup::Miss,
            Err(err) => {
                warn!(key = %key, error = %err, "dropping unreadable cache entry");
                if self.remove_files(&id) {
                    self.metrics.record_evictions(1);
                }
                CacheLookup::Miss
            },
        };

        if matches!(lookup, CacheLookup::Hit(_)) {
            self.metrics.record_cache_hit();
        } else {
            self.metrics.record_cache_miss();
        }
        lookup
    }

    /// Read an entry without touching the hit/miss counters.
    ///
    /// Used by the stale-while-revalidate path after a lookup was already counted.
    pub fn peek(&self, key: &FetchKey) -> Option<CacheEntry> {
        self.load(&key.page_id(), &key.cache_input()).ok().flatten()
    }

    fn load(&self, id: &PageId, expected_key: &str) -> Result<Option<CacheEntry>> {
        let meta_path = self.meta_path(id);
        if !meta_path.exists() {
            return Ok(None);
        }

        let corrupt = |reason: String| Error::CacheCorruption {
            key: id.to_string(),
            reason,
        };

        let raw = fs::read_to_string(&meta_path)
            .map_err(|e| corrupt(format!("unreadable sidecar: {e}")))?;
        let meta: CacheMeta =
            serde_json::from_str(&raw).map_err(|e| corrupt(format!("invalid sidecar: {e}")))?;
        if meta.key != expected_key {
            return Err(corrupt(format!(
                "sidecar belongs to '{}', expected '{expected_key}'",
                meta.key
            )));
        }
        let content = match fs::read_to_string(self.content_path(id, &meta.generation)) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(id = %id, generation = %meta.generation, "body replaced by a newer write");
                return Ok(None);
            },
            Err(e) => return Err(corrupt(format!("unreadable content: {e}"))),
        };
        if content.len() as u64 != meta.bytes {
            warn!(
                id = %id,
                bytes = content.len(),
                expected = meta.bytes,
                "cached body does not match its sidecar"
            );
            return Ok(None);
        }

        Ok(Some(CacheEntry {
            id: id.clone(),
            key: meta.key,
            content,
            fetched_at: meta.fetched_at,
            ttl: Duration::from_secs(meta.ttl_secs),
            source_url: meta.url,
        }))
    }

    /// Store `content` for `key`, stamped with the current time.
    pub fn put(&self, key: &FetchKey, url: &str, content: &str, ttl: Duration) -> Result<CacheEntry> {
        self.put_entry(key, url, content, ttl, Utc::now())
    }

    /// Store `content` for `key` with an explicit fetch timestamp.
    ///
    /// Lets callers import pages fetched elsewhere or back-date entries.
    pub fn put_entry(
        &self,
        key: &FetchKey,
        url: &str,
        content: &str,
        ttl: Duration,
        fetched_at: DateTime<Utc>,
    ) -> Result<CacheEntry> {
        let id = key.page_id();
        let meta = CacheMeta {
            fetched_at,
            ttl_secs: ttl.as_secs(),
            url: url.to_string(),
            key: key.cache_input(),
            bytes: content.len() as u64,
            generation: format!("{:016x}", fastrand::u64(..)),
        };
        let json = serde_json::to_string_pretty(&meta)
            .map_err(|e| Error::Storage(format!("Failed to serialize sidecar: {e}")))?;

        let replaced = self.read_meta(&id).map(|previous| previous.generation);
        write_atomic(&self.content_path(&id, &meta.generation), content.as_bytes())?;
        write_atomic(&self.meta_path(&id), json.as_bytes())?;
        if let Some(previous) = replaced.filter(|previous| *previous != meta.generation) {
            remove_quietly(&self.content_path(&id, &previous));
        }

        debug!(key = %key, bytes = content.len(), "cached page {}", id);
        Ok(CacheEntry {
            id,
            key: meta.key,
            content: content.to_string(),
            fetched_at,
            ttl: Duration::from_secs(meta.ttl_secs),
            source_url: meta.url,
        })
    }

    /// Delete the entry for `key`. Returns whether anything was removed.
    pub fn remove(&self, key: &FetchKey) -> bool {
        let removed = self.remove_files(&key.page_id());
        if removed {
            self.metrics.record_evictions(1);
        }
        removed
    }

    fn remove_files(&self, id: &PageId) -> bool {
        let mut removed = false;
        let mut paths = vec![self.meta_path(id)];
        paths.extend(self.content_files(id));
        for path in paths {
            removed |= remove_quietly(&path);
        }
        removed
    }

    /// Remove entries fetched more than `max_age` ago, regardless of TTL.
    ///
    /// Unreadable sidecars and orphaned content files are removed as well,
    /// including bodies no sidecar refers to. Returns the number of entries
    /// evicted.
    pub fn cleanup(&self, max_age: Duration) -> Result<usize> {
        let now = Utc::now();
        let mut evicted = 0;

        for id in self.ids()? {
            let meta = self.read_meta(&id);
            let stale = meta.as_ref().is_none_or(|meta| {
                (now - meta.fetched_at)
                    .to_std()
                    .is_ok_and(|age| age > max_age)
            });
            if stale {
                if self.remove_files(&id) {
                    evicted += 1;
                }
            } else if let Some(meta) = meta {
                let live = self.content_path(&id, &meta.generation);
                for path in self.content_files(&id).into_iter().filter(|path| *path != live) {
                    remove_quietly(&path);
                }
            }
        }

        if evicted > 0 {
            self.metrics.record_evictions(evicted);
        }
        debug!(evicted, "cache cleanup finished");
        Ok(evicted)
    }

    /// Remove every entry. Returns the number of entries evicted.
    pub fn clear(&self) -> Result<usize> {
        let mut evicted = 0;
        for id in self.ids()? {
            if self.remove_files(&id) {
                evicted += 1;
            }
        }
        if evicted > 0 {
            self.metrics.record_evictions(evicted);
        }
        Ok(evicted)
    }

    /// Count entries, expired entries and stored bytes.
    pub fn stats(&self) -> Result<CacheStats> {
        let now = Utc::now();
        let mut stats = CacheStats::default();
        for id in self.ids()? {
            let Some(meta) = self.read_meta(&id) else {
                continue;
            };
            stats.entries += 1;
            stats.total_bytes += meta.bytes;
            let age = (now - meta.fetched_at).to_std().unwrap_or(Duration::ZERO);
            if age >= Duration::from_secs(meta.ttl_secs) {
                stats.expired += 1;
            }
        }
        Ok(stats)
    }

    /// Every page id with at least one file in the directory.
    fn ids(&self) -> Result<Vec<PageId>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(Error::Storage(format!(
                    "Failed to read cache directory: {e}"
                )));
            },
        };

        let mut ids: Vec<PageId> = entries
            .filter_map(std::result::Result::ok)
            .filter_map(|entry| {
                let name = entry.file_name().into_string().ok()?;
                let rest = name
                    .strip_suffix(META_SUFFIX)
                    .or_else(|| name.strip_suffix(&format!(".{CONTENT_EXT}")))?;
                let stem = rest.split('.').next()?;
                stem.starts_with("pg_").then(|| PageId::from_raw(stem))
            })
            .collect();
        ids.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        ids.dedup();
        Ok(ids)
    }
}

/// Delete `path`, treating an already missing file as done.
fn remove_quietly(path: &Path) -> bool {
    match fs::remove_file(path) {
        Ok(()) => true,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to remove cache file");
            false
        },
    }
}

/// Write via a uniquely named temp file and rename into place.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp_path = path.with_extension(format!("{:016x}.tmp", fastrand::u64(..)));
    fs::write(&tmp_path, bytes)
        .map_err(|e| Error::Storage(format!("Failed to write temp cache file: {e}")))?;

    // Handle Windows: remove target before rename
    #[cfg(target_os = "windows")]
    if path.exists() {
        let _ = fs::remove_file(path);
    }

    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        Error::Storage(format!("Failed to commit cache file: {e}"))
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::key::{EntityName, PageKind};
    use chrono::Duration as ChronoDuration;
    use tempfile::TempDir;

    const DAY: Duration = Duration::from_secs(24 * 3600);

    fn key(name: &str) -> FetchKey {
        FetchKey::new(EntityName::parse(name).unwrap(), PageKind::Overview)
    }

    fn store() -> (TempDir, CacheStore, MetricsRecorder) {
        let temp = TempDir::new().unwrap();
        let metrics = MetricsRecorder::new();
        let store = CacheStore::open(temp.path().join("pages"), metrics.clone()).unwrap();
        (temp, store, metrics)
    }

    #[test]
    fn test_put_then_hit() {
        let (_temp, store, metrics) = store();
        store
            .put(&key("Ahri"), "https://wiki.example/Ahri", "<p>ahri</p>", DAY)
            .unwrap();

        let CacheLookup::Hit(entry) = store.get(&key("ahri")) else {
            panic!("expected hit");
        };
        assert_eq!(entry.content, "<p>ahri</p>");
        assert_eq!(entry.source_url, "https://wiki.example/Ahri");
        assert_eq!(metrics.snapshot().cache_hits, 1);
        assert_eq!(metrics.snapshot().cache_misses, 0);
    }

    fn sidecar(store: &CacheStore, k: &FetchKey) -> CacheMeta {
        store.read_meta(&k.page_id()).unwrap()
    }

    #[test]
    fn test_layout_on_disk() {
        let (_temp, store, _) = store();
        let k = key("Ahri");
        store.put(&k, "u", "body", DAY).unwrap();
        let id = k.page_id();
        let meta: CacheMeta = serde_json::from_str(
            &fs::read_to_string(store.dir().join(format!("{id}.meta.json"))).unwrap(),
        )
        .unwrap();
        assert_eq!(meta.key, "ahri|overview");
        assert_eq!(meta.bytes, 4);
        assert_eq!(meta.ttl_secs, DAY.as_secs());
        assert_eq!(meta.generation.len(), 16);
        assert!(store.dir().join(format!("{id}.{}.html", meta.generation)).exists());
    }

    #[test]
    fn test_zero_ttl_is_expired() {
        let (_temp, store, metrics) = store();
        store.put(&key("Ahri"), "u", "body", Duration::ZERO).unwrap();
        assert!(matches!(store.get(&key("Ahri")), CacheLookup::Expired(_)));
        assert_eq!(metrics.snapshot().cache_misses, 1);
    }

    #[test]
    fn test_backdated_entry_expires() {
        let (_temp, store, _) = store();
        let fetched = Utc::now() - ChronoDuration::hours(25);
        store
            .put_entry(&key("Alpha"), "u", "old", DAY, fetched)
            .unwrap();
        let CacheLookup::Expired(entry) = store.get(&key("Alpha")) else {
            panic!("expected expired entry");
        };
        assert_eq!(entry.content, "old");
    }

    #[test]
    fn test_corrupt_sidecar_is_deleted_and_missed() {
        let (_temp, store, metrics) = store();
        let k = key("Ahri");
        store.put(&k, "u", "body", DAY).unwrap();
        fs::write(store.dir().join(format!("{}.meta.json", k.page_id())), "{not json").unwrap();

        assert_eq!(store.get(&k), CacheLookup::Miss);
        assert!(store.content_files(&k.page_id()).is_empty());
        assert_eq!(metrics.snapshot().cache_evictions, 1);
    }

    #[test]
    fn test_truncated_content_is_a_miss_but_kept() {
        let (_temp, store, metrics) = store();
        let k = key("Ahri");
        store.put(&k, "u", "full body", DAY).unwrap();
        let body = store.content_path(&k.page_id(), &sidecar(&store, &k).generation);
        fs::write(&body, "full").unwrap();

        assert_eq!(store.get(&k), CacheLookup::Miss);
        assert!(body.exists());
        assert_eq!(metrics.snapshot().cache_evictions, 0);
    }

    #[test]
    fn test_reader_between_body_and_sidecar_commit() {
        let (_temp, store, metrics) = store();
        let k = key("Ahri");
        let id = k.page_id();
        store.put(&k, "u", "old body", DAY).unwrap();

        // A second writer has landed its body but not yet its sidecar.
        let mut pending = sidecar(&store, &k);
        pending.generation = "00000000000000ff".to_string();
        pending.bytes = "newer body".len() as u64;
        let pending_body = store.content_path(&id, &pending.generation);
        fs::write(&pending_body, "newer body").unwrap();

        let CacheLookup::Hit(entry) = store.get(&k) else {
            panic!("expected the committed entry");
        };
        assert_eq!(entry.content, "old body");
        assert!(pending_body.exists());
        assert_eq!(metrics.snapshot().cache_evictions, 0);

        fs::write(store.meta_path(&id), serde_json::to_string(&pending).unwrap()).unwrap();
        assert_eq!(store.peek(&k).unwrap().content, "newer body");
    }

    #[test]
    fn test_sidecar_outliving_its_body_is_a_miss() {
        let (_temp, store, _) = store();
        let k = key("Ahri");
        store.put(&k, "u", "body", DAY).unwrap();
        fs::remove_file(store.content_path(&k.page_id(), &sidecar(&store, &k).generation)).unwrap();

        assert_eq!(store.get(&k), CacheLookup::Miss);
        assert!(store.meta_path(&k.page_id()).exists());
    }

    #[test]
    fn test_cleanup_ignores_ttl() {
        let (_temp, store, metrics) = store();
        let old = Utc::now() - ChronoDuration::days(40);
        store
            .put_entry(&key("Old"), "u", "x", Duration::from_secs(u64::MAX / 4), old)
            .unwrap();
        store.put(&key("New"), "u", "y", Duration::ZERO).unwrap();

        let removed = store.cleanup(Duration::from_secs(30 * 86_400)).unwrap();
        assert_eq!(removed, 1);
        assert!(store.peek(&key("Old")).is_none());
        assert!(store.peek(&key("New")).is_some());
        assert_eq!(metrics.snapshot().cache_evictions, 1);
    }

    #[test]
    fn test_cleanup_removes_orphans() {
        let (_temp, store, _) = store();
        let k = key("Orphan");
        store.put(&k, "u", "x", DAY).unwrap();
        fs::remove_file(store.dir().join(format!("{}.meta.json", k.page_id()))).unwrap();
        assert_eq!(store.cleanup(DAY).unwrap(), 1);
        assert!(store.content_files(&k.page_id()).is_empty());
    }

    #[test]
    fn test_cleanup_drops_unreferenced_bodies() {
        let (_temp, store, _) = store();
        let k = key("Ahri");
        store.put(&k, "u", "body", DAY).unwrap();
        let abandoned = store.content_path(&k.page_id(), "00000000000000aa");
        fs::write(&abandoned, "half").unwrap();

        assert_eq!(store.cleanup(DAY).unwrap(), 0);
        assert!(!abandoned.exists());
        assert_eq!(store.peek(&k).unwrap().content, "body");
    }

    #[test]
    fn test_stats_and_clear() {
        let (_temp, store, _) = store();
        store.put(&key("Ahri"), "u", "1234", DAY).unwrap();
        store.put(&key("Garen"), "u", "12", Duration::ZERO).unwrap();

        let stats = store.stats().unwrap();
        assert_eq!(stats.entries, 2);
        assert_eq!(stats.expired, 1);
        assert_eq!(stats.total_bytes, 6);

        assert_eq!(store.clear().unwrap(), 2);
        assert_eq!(store.stats().unwrap(), CacheStats::default());
    }

    #[test]
    fn test_remove() {
        let (_temp, store, _) = store();
        store.put(&key("Ahri"), "u", "x", DAY).unwrap();
        assert!(store.remove(&key("AHRI")));
        assert!(!store.remove(&key("Ahri")));
        assert_eq!(store.get(&key("Ahri")), CacheLookup::Miss);
    }

    #[test]
    fn test_overwrite_replaces_content() {
        let (_temp, store, _) = store();
        store.put(&key("Ahri"), "u", "first", DAY).unwrap();
        store.put(&key("Ahri"), "u", "second", DAY).unwrap();
        assert_eq!(store.peek(&key("Ahri")).unwrap().content, "second");
        assert_eq!(store.content_files(&key("Ahri").page_id()).len(), 1);
        let leftovers = fs::read_dir(store.dir())
            .unwrap()
            .filter_map(std::result::Result::ok)
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .count();
        assert_eq!(leftovers, 0);
    }
}
