//! Foglio content publishing core.
//!
//! Requests map to logical paths; paths resolve to files under a repository
//! root. Raw content and per-path companion configuration are loaded through a
//! path-keyed, mtime-validated cache, companion configuration drives page
//! property injection and content-action execution against a request context,
//! and the merged result is produced by a pluggable view renderer.
//!
//! The crate is the core only: HTTP handling, the template engine, and action
//! implementations live with the embedder and plug in through the traits in
//! [`content`].

pub mod cache;
pub mod config;
pub mod content;
pub mod site;
pub mod telemetry;

pub use cache::{CacheBackend, CacheEntry, CacheError, CacheKey, CacheManager, CacheStore};
pub use content::{
    ActionDispatcher, FileStore, FileSystemRepository, Page, PageOutcome, RepositoryError,
    RequestContext, ViewRenderer,
};
pub use site::Site;
