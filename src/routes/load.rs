use super::types::{ActionDefinition, RouteFile};
use anyhow::{bail, Context};
use http::Method;
use std::path::Path;
use tracing::info;

/// Parse a route table from text; `yaml` selects YAML over JSON.
pub fn parse_routes(content: &str, yaml: bool) -> anyhow::Result<Vec<ActionDefinition>> {
    let file: RouteFile = if yaml {
        serde_yaml::from_str(content).context("invalid YAML route table")?
    } else {
        serde_json::from_str(content).context("invalid JSON route table")?
    };

    let base_path = file.base_path.unwrap_or_default();
    if !base_path.is_empty() && !base_path.starts_with('/') {
        bail!("base_path `{base_path}` must start with '/'");
    }

    let mut routes = Vec::with_capacity(file.routes.len());
    for (index, entry) in file.routes.into_iter().enumerate() {
        let method = Method::from_bytes(entry.method.to_ascii_uppercase().as_bytes())
            .with_context(|| format!("route #{index}: invalid method `{}`", entry.method))?;
        if !entry.path.starts_with('/') {
            bail!("route #{index}: path `{}` must start with '/'", entry.path);
        }
        if entry.action.trim().is_empty() {
            bail!("route #{index}: action name is empty");
        }
        routes.push(
            ActionDefinition::new(method, entry.path, entry.action.trim())
                .with_base_path(base_path.as_str()),
        );
    }
    Ok(routes)
}

/// Load a route table from a `.yaml`/`.yml` or `.json` file.
///
/// # Errors
///
/// Fails on unreadable files, malformed documents and invalid entries
/// (unknown method token, relative path, empty action name).
pub fn load_routes(path: impl AsRef<Path>) -> anyhow::Result<Vec<ActionDefinition>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read route table {}", path.display()))?;
    let yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    );
    let routes = parse_routes(&content, yaml)
        .with_context(|| format!("failed to load route table {}", path.display()))?;
    info!(
        routes_count = routes.len(),
        file = %path.display(),
        "Route table loaded"
    );
    Ok(routes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_yaml_with_base_path() {
        let routes = parse_routes(
            "base_path: /api/\nroutes:\n  - { method: get, path: \"/users/{id}\", action: get_user }\n",
            true,
        )
        .unwrap();
        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].method, Method::GET);
        assert_eq!(routes[0].full_path(), "/api/users/{id}");
        assert_eq!(routes[0].action_name, "get_user");
    }

    #[test]
    fn test_parse_json() {
        let routes = parse_routes(
            r#"{"routes":[{"method":"POST","path":"/items","action":"create_item"}]}"#,
            false,
        )
        .unwrap();
        assert_eq!(routes[0].method, Method::POST);
        assert_eq!(routes[0].base_path, "");
    }

    #[test]
    fn test_rejects_relative_path() {
        let err = parse_routes(
            "routes:\n  - { method: GET, path: users, action: list }\n",
            true,
        )
        .unwrap_err();
        assert!(err.to_string().contains("must start with '/'"));
    }

    #[test]
    fn test_rejects_empty_action_and_bad_method() {
        assert!(parse_routes("routes:\n  - { method: GET, path: /a, action: \" \" }\n", true).is_err());
        assert!(parse_routes("routes:\n  - { method: \"G T\", path: /a, action: a }\n", true).is_err());
    }
}
