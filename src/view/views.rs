use http::StatusCode;
use serde_json::Value;
use tracing::debug;

use super::ViewResult;
use crate::context::ActionContext;
use crate::error::ActionError;

/// Wrapper applied to plain values returned by actions.
///
/// Strings are written verbatim as `text/plain`; anything else is
/// serialized as `application/json`. The status is left as the action set it.
#[derive(Debug, Clone, PartialEq)]
pub struct DefaultViewResult {
    value: Value,
}

impl DefaultViewResult {
    pub fn new(value: impl Into<Value>) -> Self {
        Self { value: value.into() }
    }

    #[must_use]
    pub fn value(&self) -> &Value {
        &self.value
    }
}

impl ViewResult for DefaultViewResult {
    fn execute(self: Box<Self>, ctx: &ActionContext) -> Result<(), ActionError> {
        let response = ctx.response();
        match self.value {
            Value::String(text) => {
                response.set_content_type("text/plain; charset=utf-8");
                response.set_body(text.into_bytes());
            }
            other => {
                response.set_content_type("application/json");
                response.set_body(serde_json::to_vec(&other)?);
            }
        }
        response.commit();
        debug!(request_id = %ctx.request_id(), view = "default", "View rendered");
        Ok(())
    }
}

/// JSON body with an explicit status.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonView {
    pub status: StatusCode,
    pub body: Value,
}

impl JsonView {
    pub fn ok(body: impl Into<Value>) -> Self {
        Self::with_status(StatusCode::OK, body)
    }

    pub fn with_status(status: StatusCode, body: impl Into<Value>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

impl ViewResult for JsonView {
    fn execute(self: Box<Self>, ctx: &ActionContext) -> Result<(), ActionError> {
        let response = ctx.response();
        response.set_status(self.status.as_u16());
        response.set_content_type("application/json");
        response.set_body(serde_json::to_vec(&self.body)?);
        response.commit();
        debug!(
            request_id = %ctx.request_id(),
            view = "json",
            status = self.status.as_u16(),
            "View rendered"
        );
        Ok(())
    }
}

/// `302 Found` redirect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectView {
    pub location: String,
}

impl RedirectView {
    pub fn to(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
        }
    }
}

impl ViewResult for RedirectView {
    fn execute(self: Box<Self>, ctx: &ActionContext) -> Result<(), ActionError> {
        ctx.response()
            .send_redirect(&self.location)
            .map_err(|e| ActionError::Other(e.into()))?;
        debug!(
            request_id = %ctx.request_id(),
            view = "redirect",
            location = %self.location,
            "View rendered"
        );
        Ok(())
    }
}

/// Raw bytes with an explicit content type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentView {
    pub status: StatusCode,
    pub content_type: String,
    pub body: Vec<u8>,
}

impl ContentView {
    pub fn new(content_type: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: StatusCode::OK,
            content_type: content_type.into(),
            body: body.into(),
        }
    }

    #[must_use]
    pub fn html(body: impl Into<String>) -> Self {
        Self::new("text/html; charset=utf-8", body.into().into_bytes())
    }

    #[must_use]
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }
}

impl ViewResult for ContentView {
    fn execute(self: Box<Self>, ctx: &ActionContext) -> Result<(), ActionError> {
        let response = ctx.response();
        response.set_status(self.status.as_u16());
        response.set_content_type(&self.content_type);
        response.set_body(self.body);
        response.commit();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::ActionResult;
    use crate::context::ScopeEnvironment;
    use crate::server::{HttpRequest, ResponseHandle};
    use crate::view::normalize;
    use http::Method;
    use serde_json::json;
    use std::sync::Arc;

    fn ctx() -> ActionContext {
        ActionContext::new(
            Arc::new(HttpRequest::new(Method::GET, "/")),
            ResponseHandle::new(),
            ScopeEnvironment::default(),
        )
    }

    #[test]
    fn test_default_view_writes_string_verbatim() {
        let ctx = ctx();
        let view = normalize(ActionResult::from("ok")).unwrap();
        view.execute(&ctx).unwrap();
        let snap = ctx.response().snapshot();
        assert_eq!(snap.body, b"ok");
        assert_eq!(snap.status, 200);
        assert_eq!(snap.header("content-type"), Some("text/plain; charset=utf-8"));
        assert!(snap.committed);
    }

    #[test]
    fn test_default_view_serializes_json() {
        let ctx = ctx();
        normalize(json!({"id": 42}).into()).unwrap().execute(&ctx).unwrap();
        let snap = ctx.response().snapshot();
        assert_eq!(snap.body_text(), r#"{"id":42}"#);
        assert_eq!(snap.header("content-type"), Some("application/json"));
    }

    #[test]
    fn test_empty_result_has_no_view() {
        assert!(normalize(ActionResult::Empty).is_none());
        assert!(normalize(().into()).is_none());
    }

    #[test]
    fn test_json_view_status() {
        let ctx = ctx();
        Box::new(JsonView::with_status(StatusCode::CREATED, json!({"ok": true})))
            .execute(&ctx)
            .unwrap();
        assert_eq!(ctx.response().status(), 201);
    }

    #[test]
    fn test_redirect_view() {
        let ctx = ctx();
        Box::new(RedirectView::to("/home")).execute(&ctx).unwrap();
        let snap = ctx.response().snapshot();
        assert_eq!(snap.status, 302);
        assert_eq!(snap.header("location"), Some("/home"));
    }

    #[test]
    fn test_redirect_after_commit_is_unclassified() {
        let ctx = ctx();
        ctx.response().commit();
        let err = Box::new(RedirectView::to("/home")).execute(&ctx).unwrap_err();
        assert_eq!(err.kind(), "unclassified");
    }

    #[test]
    fn test_content_view() {
        let ctx = ctx();
        Box::new(ContentView::html("<p>hi</p>").with_status(StatusCode::ACCEPTED))
            .execute(&ctx)
            .unwrap();
        let snap = ctx.response().snapshot();
        assert_eq!(snap.status, 202);
        assert_eq!(snap.body_text(), "<p>hi</p>");
    }
}
