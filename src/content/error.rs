//! Repository error taxonomy.
//!
//! Every failure the repository can surface is a distinct, catchable variant;
//! the request layer maps them to user-visible responses. Nothing here is
//! resolved silently except the cache-degradation path, which is logged and
//! falls back to direct reads inside the repository.

use thiserror::Error;

use crate::cache::CacheError;

use super::actions::ActionError;
use super::path::PathError;
use super::view::ViewError;

#[derive(Debug, Error)]
pub enum RepositoryError {
    /// The requested path has no backing file.
    #[error("no content found at `{path}`")]
    ContentNotFound { path: String },

    /// The raw path could not be normalized into the repository.
    #[error(transparent)]
    IllegalPath(#[from] PathError),

    /// The companion configuration for the path is malformed or names an
    /// action that cannot be resolved.
    #[error("invalid configuration for `{path}`: {reason}")]
    ConfigurationInvalid { path: String, reason: String },

    /// The backing cache failed and the failure could not be degraded around.
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// Write attempted on a read-only repository.
    #[error("repository `{repository}` does not permit writes")]
    WriteNotPermitted { repository: String },

    /// Content is not valid UTF-8 and cannot be rendered as text.
    #[error("content at `{path}` is not valid UTF-8")]
    Encoding { path: String },

    /// A content action failed while executing.
    #[error(transparent)]
    Action(#[from] ActionError),

    /// The view renderer failed to merge the page.
    #[error(transparent)]
    Render(#[from] ViewError),

    /// Any other filesystem failure.
    #[error("i/o failure: {0}")]
    Io(#[from] std::io::Error),
}

impl RepositoryError {
    pub fn content_not_found(path: impl Into<String>) -> Self {
        Self::ContentNotFound { path: path.into() }
    }

    pub fn configuration_invalid(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConfigurationInvalid {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn write_not_permitted(repository: impl Into<String>) -> Self {
        Self::WriteNotPermitted {
            repository: repository.into(),
        }
    }
}
