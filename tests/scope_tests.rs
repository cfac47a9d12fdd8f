//! Tests for session and application scopes across requests

mod common;

use common::{dispatch, dispatcher, get};
use evergreen::scope::{SessionCookie, SessionStore, DEFAULT_SESSION_COOKIE};
use evergreen::{ActionRegistry, AppService, ContextSlot, HttpRequest, ScopeEnvironment};
use http::Method;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn cart_registry() -> ActionRegistry {
    let mut registry = ActionRegistry::new();
    registry.register_fn("peek", |ctx| Ok(json!({ "item": ctx.session_scope().get("item") }).into()));
    registry.register_fn("add", |ctx| {
        let item = ctx.query_param("item").unwrap_or("nothing").to_string();
        ctx.session_scope().put("item", item);
        Ok(json!({ "item": ctx.session_scope().get("item") }).into())
    });
    registry
}

fn session_id_from(set_cookie: &str, name: &str) -> String {
    set_cookie
        .split(';')
        .next()
        .and_then(|pair| pair.strip_prefix(&format!("{name}=")))
        .unwrap()
        .to_string()
}

#[test]
fn test_reading_session_creates_nothing() {
    let dispatcher = dispatcher(vec![get("/peek", "peek")], cart_registry());
    let mut slot = ContextSlot::new();

    let (result, response) = dispatch(&dispatcher, &mut slot, HttpRequest::new(Method::GET, "/peek"));
    assert!(result.is_ok());
    assert!(response.header("set-cookie").is_none());
    assert!(dispatcher.scopes().sessions.is_empty());
}

#[test]
fn test_first_write_creates_session_and_follow_up_sees_it() {
    let dispatcher = dispatcher(vec![get("/peek", "peek"), get("/add", "add")], cart_registry());
    let mut slot = ContextSlot::new();

    let (result, response) = dispatch(&dispatcher, &mut slot, HttpRequest::new(Method::GET, "/add?item=book"));
    assert!(result.is_ok());
    let set_cookie = response.header("set-cookie").unwrap();
    assert!(set_cookie.contains("HttpOnly"));
    assert_eq!(dispatcher.scopes().sessions.len(), 1);

    let id = session_id_from(&set_cookie, DEFAULT_SESSION_COOKIE);
    let follow_up = HttpRequest::new(Method::GET, "/peek").with_cookie(DEFAULT_SESSION_COOKIE, id);
    let (result, response) = dispatch(&dispatcher, &mut slot, follow_up);
    assert!(result.is_ok());
    let snapshot = response.snapshot();
    let body: serde_json::Value = serde_json::from_slice(&snapshot.body).unwrap();
    assert_eq!(body["item"], "book");
    assert!(snapshot.header("set-cookie").is_none());
}

#[test]
fn test_unknown_session_cookie_is_ignored() {
    let dispatcher = dispatcher(vec![get("/peek", "peek")], cart_registry());
    let mut slot = ContextSlot::new();
    let request = HttpRequest::new(Method::GET, "/peek").with_cookie(DEFAULT_SESSION_COOKIE, "not-a-session");

    let (result, response) = dispatch(&dispatcher, &mut slot, request);
    assert!(result.is_ok());
    assert_eq!(response.snapshot().body_text(), r#"{"item":null}"#);
}

#[test]
fn test_sessions_are_isolated_between_clients() {
    let dispatcher = dispatcher(vec![get("/peek", "peek"), get("/add", "add")], cart_registry());
    let mut service = AppService::new(Arc::new(dispatcher));

    let first = service.handle(HttpRequest::new(Method::GET, "/add?item=pen")).unwrap();
    let second = service.handle(HttpRequest::new(Method::GET, "/add?item=ink")).unwrap();
    let first_id = session_id_from(first.header("set-cookie").unwrap(), DEFAULT_SESSION_COOKIE);
    let second_id = session_id_from(second.header("set-cookie").unwrap(), DEFAULT_SESSION_COOKIE);
    assert_ne!(first_id, second_id);

    let peek = service
        .handle(HttpRequest::new(Method::GET, "/peek").with_header("Cookie", format!("{DEFAULT_SESSION_COOKIE}={first_id}")))
        .unwrap();
    assert_eq!(peek.body_text(), r#"{"item":"pen"}"#);
}

#[test]
fn test_custom_session_cookie_name() {
    let cookie = SessionCookie {
        name: "SID".to_string(),
        path: "/shop".to_string(),
    };
    let dispatcher = dispatcher(vec![get("/add", "add")], cart_registry())
        .with_scopes(ScopeEnvironment::default().with_cookie(cookie));
    let mut slot = ContextSlot::new();

    let (_, response) = dispatch(&dispatcher, &mut slot, HttpRequest::new(Method::GET, "/add?item=cup"));
    let set_cookie = response.header("set-cookie").unwrap();
    assert!(set_cookie.starts_with("SID="));
    assert!(set_cookie.contains("Path=/shop"));
}

#[test]
fn test_idle_sessions_expire_across_dispatches() {
    let sessions = Arc::new(SessionStore::new().with_max_idle(Duration::from_millis(250)));
    let dispatcher = dispatcher(vec![get("/peek", "peek"), get("/add", "add")], cart_registry())
        .with_scopes(ScopeEnvironment::default().with_sessions(Arc::clone(&sessions)));
    let mut slot = ContextSlot::new();

    let mut first_id = String::new();
    for n in 0..100 {
        let (result, response) = dispatch(&dispatcher, &mut slot, HttpRequest::new(Method::GET, "/add?item=login"));
        assert!(result.is_ok());
        if n == 0 {
            first_id = session_id_from(&response.header("set-cookie").unwrap(), DEFAULT_SESSION_COOKIE);
        }
    }
    assert_eq!(sessions.len(), 100);

    std::thread::sleep(Duration::from_millis(500));
    let stale = HttpRequest::new(Method::GET, "/peek").with_cookie(DEFAULT_SESSION_COOKIE, first_id);
    let (_, response) = dispatch(&dispatcher, &mut slot, stale);
    assert_eq!(response.snapshot().body_text(), r#"{"item":null}"#);

    let _ = dispatch(&dispatcher, &mut slot, HttpRequest::new(Method::GET, "/add?item=fresh"));
    assert_eq!(sessions.len(), 1);
}
