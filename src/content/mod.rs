//! Content layer: repositories, pages, and companion configuration.
//!
//! A [`FileSystemRepository`] resolves logical paths to files under its root,
//! loads content and per-path page configuration through the cache layer, and
//! drives property injection, content actions, and view rendering against a
//! [`RequestContext`].

pub mod actions;
pub mod error;
pub mod fs;
pub mod page;
pub mod pageconfig;
pub mod path;
pub mod repository;
pub mod view;
pub mod xml;

pub use actions::{ActionDispatcher, ActionError, ActionRegistry};
pub use error::RepositoryError;
pub use fs::{DirEntry, DiskStore, FileStore, MemoryStore};
pub use page::{Page, RequestContext};
pub use pageconfig::{ContentAction, PageConfig, PageProperty};
pub use path::RelPath;
pub use repository::{ContentPaths, FileSystemRepository, PageOutcome};
pub use view::{PassthroughRenderer, ViewError, ViewRenderer};
pub use xml::Element;
