//! Content-action dispatch boundary.
//!
//! Action implementations live with the embedder (scripted or native); the
//! repository only needs to dispatch by name and observe an optional redirect.

use std::collections::HashMap;

use thiserror::Error;

use super::page::RequestContext;
use super::xml::Element;

#[derive(Debug, Error)]
pub enum ActionError {
    /// The configuration names an action nobody registered. A configuration
    /// error, not a silent no-op.
    #[error("no action registered under `{name}`")]
    Unknown { name: String },
    #[error("action `{name}` failed: {reason}")]
    Failed { name: String, reason: String },
}

impl ActionError {
    pub fn failed(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Failed {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

/// Executes one named content action against the request context.
///
/// Returns `Some(target)` when the action requests a redirect, which stops
/// further processing of the page.
pub trait ActionDispatcher: Send + Sync {
    fn execute(
        &self,
        name: &str,
        context: &mut RequestContext,
        config: &Element,
    ) -> Result<Option<String>, ActionError>;
}

type ActionFn =
    Box<dyn Fn(&mut RequestContext, &Element) -> Result<Option<String>, ActionError> + Send + Sync>;

/// Function-backed [`ActionDispatcher`].
///
/// The default dispatcher for embedders that register actions as closures;
/// anything more elaborate (scripting engines, DI containers) implements the
/// trait directly.
#[derive(Default)]
pub struct ActionRegistry {
    actions: HashMap<String, ActionFn>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, name: impl Into<String>, action: F)
    where
        F: Fn(&mut RequestContext, &Element) -> Result<Option<String>, ActionError>
            + Send
            + Sync
            + 'static,
    {
        self.actions.insert(name.into(), Box::new(action));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.actions.contains_key(name)
    }
}

impl ActionDispatcher for ActionRegistry {
    fn execute(
        &self,
        name: &str,
        context: &mut RequestContext,
        config: &Element,
    ) -> Result<Option<String>, ActionError> {
        let action = self.actions.get(name).ok_or_else(|| ActionError::Unknown {
            name: name.to_string(),
        })?;
        action(context, config)
    }
}
