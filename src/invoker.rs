//! Handler invocation.
//!
//! The dispatcher hands every matched request to a [`HandlerInvoker`]. The
//! crate's [`ActionRegistry`] looks the action up by name, runs it, and
//! normalizes its result into an optional view. It never writes the response
//! itself.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, error, warn};

use crate::action::{Action, ActionResult};
use crate::context::ActionContext;
use crate::error::ActionError;
use crate::router::ActionMapping;
use crate::typed::{Typed, TypedAction};
use crate::view::{self, ViewResult};

/// Runs the action a request was mapped to.
pub trait HandlerInvoker: Send + Sync {
    /// Invoke the action named by `mapping` and return the view to render.
    ///
    /// # Errors
    ///
    /// Errors raised by the action propagate unchanged. An unmatched mapping
    /// or an unknown action is an unclassified fault.
    fn invoke(
        &self,
        ctx: &ActionContext,
        mapping: &ActionMapping,
    ) -> Result<Option<Box<dyn ViewResult>>, ActionError>;
}

/// Name-keyed table of actions.
#[derive(Clone, Default)]
pub struct ActionRegistry {
    actions: HashMap<String, Arc<dyn Action>>,
}

impl ActionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `action` under `name`, replacing any previous one.
    pub fn register(&mut self, name: impl Into<String>, action: impl Action + 'static) {
        let name = name.into();
        if self.actions.insert(name.clone(), Arc::new(action)).is_some() {
            warn!(action = %name, "Action replaced");
        } else {
            debug!(action = %name, "Action registered");
        }
    }

    /// Register a closure.
    pub fn register_fn<F>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn(&ActionContext) -> Result<ActionResult, ActionError> + Send + Sync + 'static,
    {
        self.register(name, f);
    }

    /// Register a [`TypedAction`].
    pub fn register_typed<A>(&mut self, name: impl Into<String>, action: A)
    where
        A: TypedAction + 'static,
    {
        self.register(name, Typed(action));
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.actions.contains_key(name)
    }

    /// Registered action names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.actions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

impl HandlerInvoker for ActionRegistry {
    fn invoke(
        &self,
        ctx: &ActionContext,
        mapping: &ActionMapping,
    ) -> Result<Option<Box<dyn ViewResult>>, ActionError> {
        let Some(name) = mapping.action_name() else {
            return Err(ActionError::other("invoked without a matched route"));
        };

        // I1: Action lookup
        let Some(action) = self.actions.get(name) else {
            error!(request_id = %ctx.request_id(), action = %name, "Action not registered");
            return Err(ActionError::other(format!("no action registered as `{name}`")));
        };

        // I2: Action execution
        let result = panic::catch_unwind(AssertUnwindSafe(|| action.execute(ctx)))
            .unwrap_or_else(|payload| {
                let message = panic_message(payload.as_ref());
                error!(
                    request_id = %ctx.request_id(),
                    action = %name,
                    panic = %message,
                    "Action panicked"
                );
                Err(ActionError::other(format!("action `{name}` panicked: {message}")))
            })?;

        debug!(request_id = %ctx.request_id(), action = %name, result = ?result, "Action completed");
        Ok(view::normalize(result))
    }
}
