use http::Method;
use serde::Deserialize;
use std::fmt;

/// One registered route: which action serves which method and path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionDefinition {
    pub method: Method,
    /// Path pattern with `{param}` segments, relative to `base_path`
    pub path_pattern: String,
    pub action_name: String,
    /// Prefix the route was loaded under (e.g. `/api`), empty for none
    pub base_path: String,
}

impl ActionDefinition {
    pub fn new(method: Method, path_pattern: impl Into<String>, action_name: impl Into<String>) -> Self {
        Self {
            method,
            path_pattern: path_pattern.into(),
            action_name: action_name.into(),
            base_path: String::new(),
        }
    }

    #[must_use]
    pub fn with_base_path(mut self, base_path: impl Into<String>) -> Self {
        self.base_path = base_path.into().trim_end_matches('/').to_string();
        self
    }

    /// Pattern including the base path.
    #[must_use]
    pub fn full_path(&self) -> String {
        format!("{}{}", self.base_path, self.path_pattern)
    }
}

impl fmt::Display for ActionDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}{} -> {}",
            self.method, self.base_path, self.path_pattern, self.action_name
        )
    }
}

/// On-disk route table.
#[derive(Debug, Deserialize)]
pub(crate) struct RouteFile {
    #[serde(default)]
    pub base_path: Option<String>,
    #[serde(default)]
    pub routes: Vec<RouteEntry>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RouteEntry {
    pub method: String,
    pub path: String,
    pub action: String,
}
