//! Cache key definitions.
//!
//! Content bodies and companion page configurations share one store but never
//! one key: the two families are discriminated at the type level, and a page
//! configuration is keyed by the *content* path it belongs to rather than by
//! the derived config file path. A content path can therefore never collide
//! with another path's configuration entry.

/// Key for a single cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// Raw content body for a normalized repository-relative path.
    Content(String),
    /// Parsed companion configuration for a normalized content path.
    PageConfig(String),
}

impl CacheKey {
    /// The content path this key belongs to.
    pub fn path(&self) -> &str {
        match self {
            CacheKey::Content(path) | CacheKey::PageConfig(path) => path,
        }
    }
}
