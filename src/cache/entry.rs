//! Cache entries: a cached value paired with its source modification time.

use std::sync::Arc;
use std::time::SystemTime;

use bytes::Bytes;

use crate::content::PageConfig;

/// Payload of a cache entry.
///
/// Both variants are cheap to clone; the entry itself is immutable once
/// constructed and replaced wholesale when it goes stale.
#[derive(Debug, Clone)]
pub enum CachedValue {
    /// Raw content bytes as read from the backing file.
    Content(Bytes),
    /// Parsed companion page configuration.
    PageConfig(Arc<PageConfig>),
}

/// A cached value together with the backing file's modification time at the
/// moment the entry was populated.
///
/// An entry is valid only while `modified` equals the file's current
/// modification time; any mismatch means the entry is stale and must be
/// discarded and rebuilt, never patched in place.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    value: CachedValue,
    modified: SystemTime,
    stored_at: SystemTime,
}

impl CacheEntry {
    pub fn new(value: CachedValue, modified: SystemTime) -> Self {
        Self {
            value,
            modified,
            stored_at: SystemTime::now(),
        }
    }

    /// Entry holding a raw content body.
    pub fn content(body: Bytes, modified: SystemTime) -> Self {
        Self::new(CachedValue::Content(body), modified)
    }

    /// Entry holding a parsed page configuration.
    pub fn page_config(config: Arc<PageConfig>, modified: SystemTime) -> Self {
        Self::new(CachedValue::PageConfig(config), modified)
    }

    pub fn value(&self) -> &CachedValue {
        &self.value
    }

    /// Source file modification time captured at load.
    pub fn modified(&self) -> SystemTime {
        self.modified
    }

    /// Instant the entry was stored, used for flush-interval expiry.
    pub fn stored_at(&self) -> SystemTime {
        self.stored_at
    }

    /// Whether the entry still matches the file's current modification time.
    ///
    /// Strict equality, not ordering: a file restored from backup may move its
    /// mtime backwards and still must invalidate the entry.
    pub fn is_current(&self, file_modified: SystemTime) -> bool {
        self.modified == file_modified
    }

    /// The content body, if this entry caches one.
    pub fn as_content(&self) -> Option<&Bytes> {
        match &self.value {
            CachedValue::Content(body) => Some(body),
            CachedValue::PageConfig(_) => None,
        }
    }

    /// The page configuration, if this entry caches one.
    pub fn as_page_config(&self) -> Option<&Arc<PageConfig>> {
        match &self.value {
            CachedValue::PageConfig(config) => Some(config),
            CachedValue::Content(_) => None,
        }
    }
}
