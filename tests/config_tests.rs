//! Tests for file-backed setup: configuration, route files, static passthrough

mod common;

use common::{dispatch, dispatcher, get};
use evergreen::config::AppConfig;
use evergreen::static_files::StaticFiles;
use evergreen::{load_routes, ActionRegistry, ContextSlot, DispatchOutcome, HttpRequest};
use http::Method;
use std::fs;
use std::sync::Arc;

#[test]
fn test_load_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("evergreen.yaml");
    fs::write(
        &path,
        "server:\n  addr: 127.0.0.1:9090\n  metrics_path: /metrics\nsession:\n  cookie_name: SID\nroutes_file: routes.yaml\n",
    )
    .unwrap();

    let config = AppConfig::load(&path).unwrap();
    assert_eq!(config.server.addr, "127.0.0.1:9090");
    assert_eq!(config.server.metrics_path.as_deref(), Some("/metrics"));
    assert_eq!(config.session.cookie().name, "SID");
    assert_eq!(config.routes_file.unwrap().to_str(), Some("routes.yaml"));
    assert!(config.dispatch.release_context_on_transport_fault);
}

#[test]
fn test_missing_config_file_names_path() {
    let err = AppConfig::load("/definitely/not/here.yaml").unwrap_err();
    assert!(format!("{err:#}").contains("/definitely/not/here.yaml"));
}

#[test]
fn test_load_yaml_routes_with_base_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("routes.yml");
    fs::write(
        &path,
        "base_path: /api\nroutes:\n  - { method: get, path: \"/users/{id}\", action: get_user }\n  - { method: POST, path: /users, action: create_user }\n",
    )
    .unwrap();

    let routes = load_routes(&path).unwrap();
    assert_eq!(routes.len(), 2);
    assert_eq!(routes[0].method, Method::GET);
    assert_eq!(routes[0].full_path(), "/api/users/{id}");
    assert_eq!(routes[1].action_name, "create_user");
}

#[test]
fn test_load_json_routes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("routes.json");
    fs::write(
        &path,
        r#"{"routes":[{"method":"DELETE","path":"/items/{id}","action":"delete_item"}]}"#,
    )
    .unwrap();

    let routes = load_routes(&path).unwrap();
    assert_eq!(routes[0].method, Method::DELETE);
    assert_eq!(routes[0].base_path, "");
}

#[test]
fn test_invalid_routes_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("routes.yaml");
    for bad in [
        "routes:\n  - { method: GET, path: relative, action: a }\n",
        "routes:\n  - { method: GET, path: /a, action: \"  \" }\n",
        "routes:\n  - { method: \"G E T\", path: /a, action: a }\n",
        "base_path: api\nroutes: []\n",
    ] {
        fs::write(&path, bad).unwrap();
        assert!(load_routes(&path).is_err(), "accepted: {bad}");
    }
}

#[test]
fn test_static_files_answer_unmatched_requests() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("index.html"), "<h1>home</h1>").unwrap();
    fs::write(dir.path().join("app.css"), "body {}").unwrap();

    let mut registry = ActionRegistry::new();
    registry.register_fn("api", |_ctx| Ok("api".into()));
    let dispatcher = dispatcher(vec![get("/api", "api")], registry)
        .with_fallback(Arc::new(StaticFiles::new(dir.path())));
    let mut slot = ContextSlot::new();

    let (result, response) = dispatch(&dispatcher, &mut slot, HttpRequest::new(Method::GET, "/"));
    assert_eq!(result.unwrap(), DispatchOutcome::Passthrough);
    let snapshot = response.snapshot();
    assert_eq!(snapshot.status, 200);
    assert_eq!(snapshot.body_text(), "<h1>home</h1>");
    assert!(snapshot.header("content-type").unwrap().starts_with("text/html"));

    let (_, response) = dispatch(&dispatcher, &mut slot, HttpRequest::new(Method::GET, "/app.css"));
    assert!(response.snapshot().header("content-type").unwrap().starts_with("text/css"));

    let (_, response) = dispatch(&dispatcher, &mut slot, HttpRequest::new(Method::GET, "/../secret"));
    assert_eq!(response.snapshot().status, 404);

    let (_, response) = dispatch(&dispatcher, &mut slot, HttpRequest::new(Method::GET, "/api"));
    assert_eq!(response.snapshot().body_text(), "api");
    assert_eq!(slot.teardown_count(), 1);
}

#[test]
fn test_broken_template_is_answered_not_dropped() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("bad.html"), "<p>{{ unclosed </p>").unwrap();

    let dispatcher = dispatcher(vec![get("/api", "api")], ActionRegistry::new())
        .with_fallback(Arc::new(StaticFiles::new(dir.path()).with_templates(true)));
    let mut slot = ContextSlot::new();

    let (result, response) = dispatch(&dispatcher, &mut slot, HttpRequest::new(Method::GET, "/bad.html"));
    assert_eq!(result.unwrap(), DispatchOutcome::Passthrough);
    let snapshot = response.snapshot();
    assert_eq!(snapshot.status, 500);
    assert_eq!(snapshot.header("content-type"), Some("application/json"));
    assert_eq!(dispatcher.metrics().snapshot().transport_faults, 0);
}
