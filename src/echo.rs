//! Built-in echo action used by `evergreen serve`.
//!
//! Every matched route answers with a JSON description of what it received,
//! which makes a route file explorable without writing any actions.

use serde_json::{json, Map, Value};
use tracing::debug;

use crate::action::ActionResult;
use crate::context::ActionContext;
use crate::error::ActionError;
use crate::invoker::HandlerInvoker;
use crate::router::ActionMapping;
use crate::view::{self, ViewResult};

fn pairs_to_object<'a>(pairs: impl Iterator<Item = (&'a str, &'a str)>) -> Value {
    let map: Map<String, Value> = pairs
        .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
        .collect();
    Value::Object(map)
}

/// Echo the matched action, method, path, path and query parameters, and body.
///
/// # Errors
///
/// Never fails; the `Result` matches the action signature.
pub fn echo(ctx: &ActionContext) -> Result<ActionResult, ActionError> {
    let request = ctx.request();
    let params = ctx
        .mapping()
        .map(|m| pairs_to_object(m.path_params.iter().map(|(k, v)| (k.as_ref(), v.as_str()))))
        .unwrap_or_else(|| json!({}));

    Ok(ActionResult::Value(json!({
        "action": ctx.action_name(),
        "method": request.method.as_str(),
        "path": request.path,
        "params": params,
        "query": pairs_to_object(request.query_params.iter().map(|(k, v)| (k.as_ref(), v.as_str()))),
        "body": request.body,
    })))
}

/// Invoker that answers every matched route with [`echo`].
///
/// Unlike a registry it needs no per-action setup, so routes added by a hot
/// reload are served immediately.
#[derive(Debug, Clone, Copy, Default)]
pub struct EchoInvoker;

impl HandlerInvoker for EchoInvoker {
    fn invoke(
        &self,
        ctx: &ActionContext,
        mapping: &ActionMapping,
    ) -> Result<Option<Box<dyn ViewResult>>, ActionError> {
        let Some(name) = mapping.action_name() else {
            return Err(ActionError::other("invoked without a matched route"));
        };
        debug!(request_id = %ctx.request_id(), action = %name, "Echoing request");
        echo(ctx).map(view::normalize)
    }
}
