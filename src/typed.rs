//! Typed actions.
//!
//! A [`TypedAction`] declares a parameter type bound from the request
//! context through `TryFrom<&ActionContext>` and an output type serialized
//! to JSON. Binding failures answer `400 Bad Request` without running the
//! action.
//!
//! ```rust,ignore
//! struct GetUser;
//!
//! struct UserId(u64);
//!
//! impl TryFrom<&ActionContext> for UserId {
//!     type Error = anyhow::Error;
//!     fn try_from(ctx: &ActionContext) -> anyhow::Result<Self> {
//!         let raw = ctx.path_param("id").context("missing id")?;
//!         Ok(UserId(raw.parse()?))
//!     }
//! }
//!
//! impl TypedAction for GetUser {
//!     type Params = UserId;
//!     type Output = serde_json::Value;
//!     fn handle(&self, _ctx: &ActionContext, p: UserId) -> Result<Self::Output, ActionError> {
//!         Ok(json!({ "id": p.0 }))
//!     }
//! }
//!
//! registry.register_typed("get_user", GetUser);
//! ```

use serde::Serialize;
use tracing::debug;

use crate::action::{Action, ActionResult};
use crate::context::ActionContext;
use crate::error::ActionError;
use crate::view::JsonView;

/// Action with typed parameters and output.
pub trait TypedAction: Send + Sync {
    /// Parameters bound from the request context
    type Params: for<'a> TryFrom<&'a ActionContext, Error = anyhow::Error>;
    /// Serialized as the JSON response body
    type Output: Serialize;

    /// # Errors
    ///
    /// Same classification as [`Action::execute`].
    fn handle(&self, ctx: &ActionContext, params: Self::Params) -> Result<Self::Output, ActionError>;
}

/// Adapter running a [`TypedAction`] as an [`Action`].
#[derive(Debug, Clone)]
pub struct Typed<A>(pub A);

impl<A: TypedAction> Action for Typed<A> {
    fn execute(&self, ctx: &ActionContext) -> Result<ActionResult, ActionError> {
        let params = A::Params::try_from(ctx).map_err(|err| {
            debug!(
                request_id = %ctx.request_id(),
                action = ?ctx.action_name(),
                error = %err,
                "Parameter binding failed"
            );
            ActionError::bad_request(format!("invalid request data: {err}"))
        })?;
        let output = self.0.handle(ctx, params)?;
        let body = serde_json::to_value(output)?;
        Ok(ActionResult::view(JsonView::ok(body)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ScopeEnvironment;
    use crate::invoker::{ActionRegistry, HandlerInvoker};
    use crate::router::{ActionMapping, ParamVec};
    use crate::routes::ActionDefinition;
    use crate::server::{HttpRequest, ResponseHandle};
    use anyhow::Context as _;
    use http::{Method, StatusCode};
    use serde_json::json;
    use std::sync::Arc;

    struct Limit(u32);

    impl TryFrom<&ActionContext> for Limit {
        type Error = anyhow::Error;

        fn try_from(ctx: &ActionContext) -> anyhow::Result<Self> {
            let raw = ctx.query_param("limit").context("missing limit")?;
            Ok(Limit(raw.parse()?))
        }
    }

    struct ListItems;

    impl TypedAction for ListItems {
        type Params = Limit;
        type Output = serde_json::Value;

        fn handle(&self, _ctx: &ActionContext, params: Limit) -> Result<Self::Output, ActionError> {
            Ok(json!({ "limit": params.0 }))
        }
    }

    fn run(uri: &str) -> (Result<(), ActionError>, ResponseHandle) {
        let mut registry = ActionRegistry::new();
        registry.register_typed("list_items", ListItems);
        let response = ResponseHandle::new();
        let ctx = ActionContext::new(
            Arc::new(HttpRequest::new(Method::GET, uri)),
            response.clone(),
            ScopeEnvironment::default(),
        );
        let mapping = ActionMapping::matched(
            Arc::new(ActionDefinition::new(Method::GET, "/items", "list_items")),
            ParamVec::new(),
        );
        let result = registry
            .invoke(&ctx, &mapping)
            .and_then(|view| match view {
                Some(view) => view.execute(&ctx),
                None => Ok(()),
            });
        (result, response)
    }

    #[test]
    fn test_typed_action_renders_json() {
        let (result, response) = run("/items?limit=5");
        assert!(result.is_ok());
        let snap = response.snapshot();
        assert_eq!(snap.status, 200);
        assert_eq!(snap.body_text(), r#"{"limit":5}"#);
    }

    #[test]
    fn test_binding_failure_is_bad_request() {
        let (result, _) = run("/items?limit=many");
        let err = result.unwrap_err();
        assert_eq!(err.response_status(), Some(StatusCode::BAD_REQUEST));
        assert!(err.to_string().contains("invalid request data"));
    }
}
