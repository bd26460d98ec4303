//! View rendering boundary.
//!
//! The template engine is external; the repository hands it the resolved
//! content and the request context and takes back the merged output. The
//! repository itself never interprets template syntax.

use thiserror::Error;

use super::page::RequestContext;

#[derive(Debug, Error)]
#[error("view rendering failed for `{path}`: {reason}")]
pub struct ViewError {
    pub path: String,
    pub reason: String,
}

impl ViewError {
    pub fn new(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Merges resolved content with the request context into final output.
pub trait ViewRenderer: Send + Sync {
    fn render(
        &self,
        context: &RequestContext,
        path: &str,
        content: &str,
    ) -> Result<String, ViewError>;
}

/// Renderer that returns content verbatim.
///
/// The default until the embedder wires a real template engine; also what a
/// repository serving static assets wants.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassthroughRenderer;

impl ViewRenderer for PassthroughRenderer {
    fn render(
        &self,
        _context: &RequestContext,
        _path: &str,
        content: &str,
    ) -> Result<String, ViewError> {
        Ok(content.to_string())
    }
}
