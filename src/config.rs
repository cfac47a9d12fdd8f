//! Application configuration loaded from YAML.
//!
//! Every field is optional; a missing file section falls back to its default.
//!
//! ```yaml
//! server:
//!   addr: 127.0.0.1:8080
//!   metrics_path: /metrics
//! session:
//!   cookie_name: EVERGREEN_SESSION
//!   cookie_path: /
//!   max_idle_secs: 1800
//! dispatch:
//!   release_context_on_transport_fault: true
//! routes_file: routes.yaml
//! static_dir: public
//! ```

use anyhow::Context;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::dispatcher::DispatchConfig;
use crate::scope::{SessionCookie, SessionStore, DEFAULT_SESSION_COOKIE};

/// Default idle time before a session expires.
pub const DEFAULT_SESSION_MAX_IDLE_SECS: u64 = 30 * 60;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub addr: String,
    /// Serve dispatch counters as JSON on this path
    pub metrics_path: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: "0.0.0.0:8080".to_string(),
            metrics_path: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub cookie_name: String,
    pub cookie_path: String,
    /// Seconds a session may go untouched before it is dropped; `null` keeps sessions forever
    pub max_idle_secs: Option<u64>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: DEFAULT_SESSION_COOKIE.to_string(),
            cookie_path: "/".to_string(),
            max_idle_secs: Some(DEFAULT_SESSION_MAX_IDLE_SECS),
        }
    }
}

impl SessionConfig {
    #[must_use]
    pub fn cookie(&self) -> SessionCookie {
        SessionCookie {
            name: self.cookie_name.clone(),
            path: self.cookie_path.clone(),
        }
    }

    #[must_use]
    pub fn max_idle(&self) -> Option<Duration> {
        self.max_idle_secs.map(Duration::from_secs)
    }

    /// Session registry honouring `max_idle_secs`.
    #[must_use]
    pub fn store(&self) -> SessionStore {
        match self.max_idle() {
            Some(max_idle) => SessionStore::new().with_max_idle(max_idle),
            None => SessionStore::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub session: SessionConfig,
    pub dispatch: DispatchConfig,
    pub routes_file: Option<PathBuf>,
    pub static_dir: Option<PathBuf>,
}

impl AppConfig {
    /// Parse a YAML document.
    ///
    /// # Errors
    ///
    /// Fails on malformed YAML or mistyped fields.
    pub fn from_yaml(content: &str) -> anyhow::Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content).context("invalid configuration")
    }

    /// Load configuration from `path`.
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::from_yaml(&content).with_context(|| format!("in {}", path.display()))
    }
}
