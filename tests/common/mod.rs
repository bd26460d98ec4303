//! Shared test doubles for integration tests.

#![allow(dead_code)]

use std::io;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::SystemTime;

use bytes::Bytes;
use foglio::cache::{CacheBackend, CacheEntry, CacheError, CacheKey};
use foglio::content::{DirEntry, FileStore, MemoryStore};

/// Wraps a [`MemoryStore`] and counts full-content reads, so tests can prove
/// a cached request never went back to the filesystem.
pub struct CountingStore {
    inner: MemoryStore,
    reads: AtomicUsize,
}

impl CountingStore {
    pub fn new() -> Self {
        Self {
            inner: MemoryStore::new(),
            reads: AtomicUsize::new(0),
        }
    }

    pub fn inner(&self) -> &MemoryStore {
        &self.inner
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

impl FileStore for CountingStore {
    fn exists(&self, path: &Path) -> bool {
        self.inner.exists(path)
    }

    fn modified(&self, path: &Path) -> io::Result<SystemTime> {
        self.inner.modified(path)
    }

    fn read(&self, path: &Path) -> io::Result<Bytes> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.read(path)
    }

    fn write(&self, path: &Path, data: &[u8]) -> io::Result<()> {
        self.inner.write(path, data)
    }

    fn make_dir(&self, path: &Path) -> io::Result<()> {
        self.inner.make_dir(path)
    }

    fn remove_dir(&self, path: &Path) -> io::Result<()> {
        self.inner.remove_dir(path)
    }

    fn list_dir(&self, path: &Path) -> io::Result<Vec<DirEntry>> {
        self.inner.list_dir(path)
    }
}

/// Delegating backend, so a shared `Arc<dyn CacheBackend>` can be handed to a
/// `CacheStore` that wants ownership.
pub struct SharedBackend(pub Arc<dyn CacheBackend>);

impl CacheBackend for SharedBackend {
    fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>, CacheError> {
        self.0.get(key)
    }

    fn put(&self, key: CacheKey, entry: CacheEntry) -> Result<Option<CacheKey>, CacheError> {
        self.0.put(key, entry)
    }

    fn remove(&self, key: &CacheKey) -> Result<(), CacheError> {
        self.0.remove(key)
    }

    fn clear(&self) -> Result<(), CacheError> {
        self.0.clear()
    }

    fn keys(&self) -> Result<Vec<CacheKey>, CacheError> {
        self.0.keys()
    }
}

/// Backend that can be switched into a failing mode, for exercising the
/// graceful-degradation path.
pub struct FlakyBackend {
    inner: Arc<dyn CacheBackend>,
    failing: AtomicBool,
}

impl FlakyBackend {
    pub fn new(inner: Arc<dyn CacheBackend>) -> Self {
        Self {
            inner,
            failing: AtomicBool::new(false),
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self, op: &'static str) -> Result<(), CacheError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(CacheError::new(op, "injected backend failure"))
        } else {
            Ok(())
        }
    }
}

impl CacheBackend for FlakyBackend {
    fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>, CacheError> {
        self.check("get")?;
        self.inner.get(key)
    }

    fn put(&self, key: CacheKey, entry: CacheEntry) -> Result<Option<CacheKey>, CacheError> {
        self.check("put")?;
        self.inner.put(key, entry)
    }

    fn remove(&self, key: &CacheKey) -> Result<(), CacheError> {
        self.check("remove")?;
        self.inner.remove(key)
    }

    fn clear(&self) -> Result<(), CacheError> {
        self.check("clear")?;
        self.inner.clear()
    }

    fn keys(&self) -> Result<Vec<CacheKey>, CacheError> {
        self.check("keys")?;
        self.inner.keys()
    }
}
