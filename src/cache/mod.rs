//! Content cache layer.
//!
//! A named, path-keyed store of [`CacheEntry`] values sitting in front of the
//! content repository. Entries carry the source file's modification time; the
//! repository compares that against the filesystem on every read and rebuilds
//! any entry whose timestamp no longer matches.
//!
//! Stores are built by the [`CacheManager`] from `[[caches]]` definitions in
//! `foglio.toml`:
//!
//! ```toml
//! [[caches]]
//! name = "content"
//! backend = "lru"
//! capacity = 512
//! flush_minutes = 30
//! ```

mod entry;
mod keys;
mod lock;
mod manager;
mod store;

pub use entry::{CacheEntry, CachedValue};
pub use keys::CacheKey;
pub use manager::CacheManager;
pub use store::{CacheBackend, CacheError, CacheStore, LruBackend};
