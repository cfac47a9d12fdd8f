//! Application handlers.
//!
//! An [`Action`] receives the request context and returns an
//! [`ActionResult`]: either an explicit view, a plain value the dispatcher
//! wraps in the default view, or nothing at all when the action already
//! wrote the response itself.

use serde_json::Value;
use std::fmt;

use crate::context::ActionContext;
use crate::error::ActionError;
use crate::view::ViewResult;

/// What an action produced.
pub enum ActionResult {
    /// Explicit rendering strategy.
    View(Box<dyn ViewResult>),
    /// Plain value, rendered by [`DefaultViewResult`](crate::view::DefaultViewResult).
    Value(Value),
    /// Nothing to render.
    Empty,
}

impl ActionResult {
    pub fn view(view: impl ViewResult + 'static) -> Self {
        ActionResult::View(Box::new(view))
    }
}

impl fmt::Debug for ActionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionResult::View(_) => f.write_str("View(..)"),
            ActionResult::Value(v) => f.debug_tuple("Value").field(v).finish(),
            ActionResult::Empty => f.write_str("Empty"),
        }
    }
}

impl From<Value> for ActionResult {
    fn from(value: Value) -> Self {
        ActionResult::Value(value)
    }
}

impl From<&str> for ActionResult {
    fn from(value: &str) -> Self {
        ActionResult::Value(Value::String(value.to_string()))
    }
}

impl From<String> for ActionResult {
    fn from(value: String) -> Self {
        ActionResult::Value(Value::String(value))
    }
}

impl From<()> for ActionResult {
    fn from(_: ()) -> Self {
        ActionResult::Empty
    }
}

/// An application handler, shared by every request that maps to it.
pub trait Action: Send + Sync {
    /// Run the action for one request.
    ///
    /// # Errors
    ///
    /// [`ActionError::Status`] to answer with a specific status,
    /// [`ActionError::Transport`] for connection failures, anything else as
    /// [`ActionError::Other`].
    fn execute(&self, ctx: &ActionContext) -> Result<ActionResult, ActionError>;
}

impl<F> Action for F
where
    F: Fn(&ActionContext) -> Result<ActionResult, ActionError> + Send + Sync,
{
    fn execute(&self, ctx: &ActionContext) -> Result<ActionResult, ActionError> {
        self(ctx)
    }
}
