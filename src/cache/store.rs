//! Cache store and backends.
//!
//! A [`CacheStore`] is a named map from [`CacheKey`] to [`CacheEntry`] over a
//! swappable [`CacheBackend`]. The default backend keeps entries in an LRU map
//! behind an `RwLock`; capacity eviction belongs to the backend, while the
//! store itself enforces the configured flush interval as a deadline check on
//! access.
//!
//! Backend failures are surfaced as [`CacheError`], never swallowed: a silent
//! failure here would mean serving stale content. Callers that can degrade
//! gracefully (the repository) log the error and fall back to direct reads.

use std::num::NonZeroUsize;
use std::sync::RwLock;
use std::time::{Duration, SystemTime};

use lru::LruCache;
use metrics::counter;
use thiserror::Error;

use crate::telemetry::{METRIC_CACHE_EVICT, METRIC_CACHE_EXPIRED, METRIC_CACHE_HIT, METRIC_CACHE_MISS};

use super::entry::CacheEntry;
use super::keys::CacheKey;
use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::store";

/// A backing cache implementation raised an error.
#[derive(Debug, Error)]
#[error("cache backend failed during {op}: {reason}")]
pub struct CacheError {
    pub op: &'static str,
    pub reason: String,
}

impl CacheError {
    pub fn new(op: &'static str, reason: impl Into<String>) -> Self {
        Self {
            op,
            reason: reason.into(),
        }
    }
}

/// Swappable storage behind a [`CacheStore`].
///
/// `put` is last-writer-wins and reports the key evicted to make room, if any.
/// A missing key is a normal miss, not an error; `Err` is reserved for a
/// misbehaving backend.
pub trait CacheBackend: Send + Sync {
    fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>, CacheError>;
    fn put(&self, key: CacheKey, entry: CacheEntry) -> Result<Option<CacheKey>, CacheError>;
    fn remove(&self, key: &CacheKey) -> Result<(), CacheError>;
    fn clear(&self) -> Result<(), CacheError>;
    /// Snapshot of the current key set, for introspection only.
    fn keys(&self) -> Result<Vec<CacheKey>, CacheError>;
}

/// Default backend: LRU map with capacity eviction.
pub struct LruBackend {
    entries: RwLock<LruCache<CacheKey, CacheEntry>>,
}

impl LruBackend {
    /// Create a backend holding at most `capacity` entries (clamped to 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: RwLock::new(LruCache::new(capacity)),
        }
    }
}

impl CacheBackend for LruBackend {
    fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>, CacheError> {
        Ok(rw_write(&self.entries, SOURCE, "get").get(key).cloned())
    }

    fn put(&self, key: CacheKey, entry: CacheEntry) -> Result<Option<CacheKey>, CacheError> {
        // `push` also returns the displaced entry when overwriting the same
        // key; only a different key counts as a capacity eviction.
        Ok(rw_write(&self.entries, SOURCE, "put")
            .push(key.clone(), entry)
            .and_then(|(evicted, _)| (evicted != key).then_some(evicted)))
    }

    fn remove(&self, key: &CacheKey) -> Result<(), CacheError> {
        rw_write(&self.entries, SOURCE, "remove").pop(key);
        Ok(())
    }

    fn clear(&self) -> Result<(), CacheError> {
        rw_write(&self.entries, SOURCE, "clear").clear();
        Ok(())
    }

    fn keys(&self) -> Result<Vec<CacheKey>, CacheError> {
        Ok(rw_read(&self.entries, SOURCE, "keys")
            .iter()
            .map(|(key, _)| key.clone())
            .collect())
    }
}

/// A named cache store with an optional flush interval.
///
/// The flush interval is enforced on access: an entry stored longer ago than
/// the interval is removed and reported as a miss, independent of whether its
/// source file changed. `None` disables expiry.
pub struct CacheStore {
    name: String,
    flush_interval: Option<Duration>,
    backend: Box<dyn CacheBackend>,
}

impl CacheStore {
    pub fn new(name: impl Into<String>, backend: Box<dyn CacheBackend>) -> Self {
        Self {
            name: name.into(),
            flush_interval: None,
            backend,
        }
    }

    /// Convenience constructor for the default LRU backend.
    pub fn lru(name: impl Into<String>, capacity: usize) -> Self {
        Self::new(name, Box::new(LruBackend::new(capacity)))
    }

    pub fn with_flush_interval(mut self, interval: Duration) -> Self {
        self.flush_interval = (!interval.is_zero()).then_some(interval);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn flush_interval(&self) -> Option<Duration> {
        self.flush_interval
    }

    /// Look up an entry, applying flush-interval expiry.
    pub fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>, CacheError> {
        let Some(entry) = self.backend.get(key)? else {
            counter!(METRIC_CACHE_MISS).increment(1);
            return Ok(None);
        };

        if let Some(interval) = self.flush_interval {
            let age = SystemTime::now()
                .duration_since(entry.stored_at())
                .unwrap_or(Duration::ZERO);
            if age >= interval {
                self.backend.remove(key)?;
                counter!(METRIC_CACHE_EXPIRED).increment(1);
                counter!(METRIC_CACHE_MISS).increment(1);
                return Ok(None);
            }
        }

        counter!(METRIC_CACHE_HIT).increment(1);
        Ok(Some(entry))
    }

    /// Store an entry, unconditionally overwriting any previous one.
    pub fn put(&self, key: CacheKey, entry: CacheEntry) -> Result<(), CacheError> {
        if self.backend.put(key, entry)?.is_some() {
            counter!(METRIC_CACHE_EVICT).increment(1);
        }
        Ok(())
    }

    pub fn remove(&self, key: &CacheKey) -> Result<(), CacheError> {
        self.backend.remove(key)
    }

    pub fn clear(&self) -> Result<(), CacheError> {
        self.backend.clear()
    }

    pub fn keys(&self) -> Result<Vec<CacheKey>, CacheError> {
        self.backend.keys()
    }
}

#[cfg(test)]
mod tests {
    use std::panic::{AssertUnwindSafe, catch_unwind};
    use std::time::SystemTime;

    use bytes::Bytes;

    use super::*;

    fn content_key(path: &str) -> CacheKey {
        CacheKey::Content(path.to_string())
    }

    fn sample_entry(body: &'static [u8]) -> CacheEntry {
        CacheEntry::content(Bytes::from_static(body), SystemTime::now())
    }

    #[test]
    fn get_put_remove_roundtrip() {
        let store = CacheStore::lru("content", 8);
        let key = content_key("news/today.html");

        assert!(store.get(&key).expect("get").is_none());

        store.put(key.clone(), sample_entry(b"hello")).expect("put");
        let cached = store.get(&key).expect("get").expect("entry");
        assert_eq!(cached.as_content().expect("content"), &Bytes::from_static(b"hello"));

        store.remove(&key).expect("remove");
        assert!(store.get(&key).expect("get").is_none());

        // Removing an absent key is a no-op.
        store.remove(&key).expect("remove absent");
    }

    #[test]
    fn put_overwrites_last_writer_wins() {
        let store = CacheStore::lru("content", 8);
        let key = content_key("index.html");

        store.put(key.clone(), sample_entry(b"first")).expect("put");
        store.put(key.clone(), sample_entry(b"second")).expect("put");

        let cached = store.get(&key).expect("get").expect("entry");
        assert_eq!(cached.as_content().expect("content"), &Bytes::from_static(b"second"));
        assert_eq!(store.keys().expect("keys").len(), 1);
    }

    #[test]
    fn clear_is_idempotent() {
        let store = CacheStore::lru("content", 8);
        store.put(content_key("a.html"), sample_entry(b"a")).expect("put");
        store.put(content_key("b.html"), sample_entry(b"b")).expect("put");

        store.clear().expect("clear");
        store.clear().expect("clear twice");

        assert!(store.get(&content_key("a.html")).expect("get").is_none());
        assert!(store.keys().expect("keys").is_empty());
    }

    #[test]
    fn capacity_eviction_drops_least_recent() {
        let store = CacheStore::lru("content", 2);
        store.put(content_key("a"), sample_entry(b"a")).expect("put");
        store.put(content_key("b"), sample_entry(b"b")).expect("put");
        store.put(content_key("c"), sample_entry(b"c")).expect("put");

        assert!(store.get(&content_key("a")).expect("get").is_none());
        assert!(store.get(&content_key("b")).expect("get").is_some());
        assert!(store.get(&content_key("c")).expect("get").is_some());
    }

    #[test]
    fn zero_flush_interval_disables_expiry() {
        let store = CacheStore::lru("content", 8).with_flush_interval(Duration::ZERO);
        assert!(store.flush_interval().is_none());
    }

    #[test]
    fn flush_interval_expires_old_entries_on_access() {
        let store = CacheStore::lru("content", 8).with_flush_interval(Duration::from_nanos(1));
        let key = content_key("a.html");
        store.put(key.clone(), sample_entry(b"a")).expect("put");

        std::thread::sleep(Duration::from_millis(2));

        assert!(store.get(&key).expect("get").is_none());
        assert!(store.keys().expect("keys").is_empty());
    }

    #[test]
    fn fresh_entry_survives_flush_interval() {
        let store = CacheStore::lru("content", 8).with_flush_interval(Duration::from_secs(3600));
        let key = content_key("a.html");
        store.put(key.clone(), sample_entry(b"a")).expect("put");
        assert!(store.get(&key).expect("get").is_some());
    }

    #[test]
    fn backend_recovers_from_poisoned_lock() {
        let backend = LruBackend::new(8);

        let _ = catch_unwind(AssertUnwindSafe(|| {
            let _guard = backend
                .entries
                .write()
                .expect("entries lock should be acquired");
            panic!("poison entries lock");
        }));

        backend
            .put(content_key("a"), sample_entry(b"a"))
            .expect("put after poison");
        assert!(backend.get(&content_key("a")).expect("get").is_some());
    }
}
