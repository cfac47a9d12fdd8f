//! Unit tests for CLI commands

use crate::cli::{build_service, Cli, Commands, ServeSettings};
use crate::config::AppConfig;
use crate::router::{RouteTable, Router};
use crate::routes::ActionDefinition;
use crate::server::HttpRequest;
use clap::Parser;
use http::Method;
use std::path::PathBuf;
use std::sync::Arc;

#[test]
fn test_serve_command_with_flags() {
    let cli = Cli::try_parse_from([
        "evergreen",
        "serve",
        "--routes",
        "routes.yaml",
        "--addr",
        "127.0.0.1:9000",
        "--static-dir",
        "public",
        "--watch",
    ])
    .unwrap();

    match cli.command {
        Commands::Serve {
            config,
            routes,
            addr,
            static_dir,
            watch,
        } => {
            assert!(config.is_none());
            assert_eq!(routes, Some(PathBuf::from("routes.yaml")));
            assert_eq!(addr.as_deref(), Some("127.0.0.1:9000"));
            assert_eq!(static_dir, Some(PathBuf::from("public")));
            assert!(watch);
        }
        Commands::Routes { .. } => panic!("Expected Serve command"),
    }
}

#[test]
fn test_routes_command_requires_file() {
    assert!(Cli::try_parse_from(["evergreen", "routes"]).is_err());
    let cli = Cli::try_parse_from(["evergreen", "routes", "-r", "api.json"]).unwrap();
    assert!(matches!(cli.command, Commands::Routes { routes } if routes == PathBuf::from("api.json")));
}

#[test]
fn test_flags_override_config() {
    let config = AppConfig {
        routes_file: Some(PathBuf::from("from-config.yaml")),
        ..AppConfig::default()
    };
    let settings = ServeSettings::resolve(
        config,
        Some(PathBuf::from("from-flag.yaml")),
        Some("127.0.0.1:1".into()),
        None,
    )
    .unwrap();
    assert_eq!(settings.routes, PathBuf::from("from-flag.yaml"));
    assert_eq!(settings.config.server.addr, "127.0.0.1:1");
    assert!(settings.config.static_dir.is_none());
}

#[test]
fn test_routes_file_required() {
    assert!(ServeSettings::resolve(AppConfig::default(), None, None, None).is_err());
}

#[test]
fn test_built_service_echoes() {
    let settings = ServeSettings {
        config: AppConfig::default(),
        routes: PathBuf::from("unused.yaml"),
    };
    let table = Arc::new(RouteTable::new(Router::new(vec![ActionDefinition::new(
        Method::GET,
        "/pets/{id}",
        "get_pet",
    )])));
    let mut service = build_service(&settings, &table);

    let snapshot = service.handle(HttpRequest::new(Method::GET, "/pets/3")).unwrap();
    assert_eq!(snapshot.status, 200);
    let body: serde_json::Value = serde_json::from_slice(&snapshot.body).unwrap();
    assert_eq!(body["action"], "get_pet");
    assert_eq!(body["params"]["id"], "3");

    let missing = service.handle(HttpRequest::new(Method::GET, "/nope")).unwrap();
    assert_eq!(missing.status, 404);
}
