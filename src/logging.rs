//! # Logging
//!
//! Structured logging setup built on `tracing-subscriber`.
//!
//! ## Environment Variables
//!
//! - `RUST_LOG`: full filter directive; wins over `EVERGREEN_LOG_LEVEL`
//! - `EVERGREEN_LOG_LEVEL`: trace/debug/info/warn/error (default `info`)
//! - `EVERGREEN_LOG_FORMAT`: `json` (default) or `pretty`
//! - `EVERGREEN_LOG_TARGET_FILTER`: extra comma-separated directives,
//!   e.g. `evergreen::router=debug,may_minihttp=off`
//! - `EVERGREEN_LOG_ASYNC`: write through a background thread (default `false`)
//! - `EVERGREEN_LOG_INCLUDE_LOCATION`: add `file:line` to events (default `false`)

use anyhow::{Context, Result};
use std::env;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl LogFormat {
    /// Anything other than `pretty` selects JSON.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "pretty" => LogFormat::Pretty,
            _ => LogFormat::Json,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    pub log_level: String,
    pub format: LogFormat,
    pub async_logging: bool,
    pub target_filter: Option<String>,
    pub include_location: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            format: LogFormat::Json,
            async_logging: false,
            target_filter: None,
            include_location: false,
        }
    }
}

impl LogConfig {
    /// Read the `EVERGREEN_LOG_*` variables, keeping defaults for unset ones.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            log_level: lookup("EVERGREEN_LOG_LEVEL").unwrap_or(defaults.log_level),
            format: lookup("EVERGREEN_LOG_FORMAT")
                .map(|v| LogFormat::parse(&v))
                .unwrap_or(defaults.format),
            async_logging: lookup("EVERGREEN_LOG_ASYNC")
                .map(|v| parse_flag(&v))
                .unwrap_or(defaults.async_logging),
            target_filter: lookup("EVERGREEN_LOG_TARGET_FILTER").filter(|v| !v.trim().is_empty()),
            include_location: lookup("EVERGREEN_LOG_INCLUDE_LOCATION")
                .map(|v| parse_flag(&v))
                .unwrap_or(defaults.include_location),
        }
    }

    fn level(&self) -> Level {
        match self.log_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        }
    }

    fn env_filter(&self) -> EnvFilter {
        let mut filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.level().as_str()));

        if let Some(targets) = &self.target_filter {
            for directive in targets.split(',').map(str::trim).filter(|d| !d.is_empty()) {
                match directive.parse() {
                    Ok(d) => filter = filter.add_directive(d),
                    Err(_) => eprintln!("Warning: invalid log filter directive: {directive}"),
                }
            }
        }
        filter
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

/// Install the global subscriber described by `config`.
///
/// With async logging enabled the returned guard owns the writer thread;
/// keep it alive until exit or buffered events are lost.
///
/// # Errors
///
/// Fails if a global subscriber is already installed.
pub fn init_logging_with_config(config: &LogConfig) -> Result<Option<WorkerGuard>> {
    let (writer, guard) = if config.async_logging {
        let (w, g) = tracing_appender::non_blocking(std::io::stdout());
        (tracing_subscriber::fmt::writer::BoxMakeWriter::new(w), Some(g))
    } else {
        (tracing_subscriber::fmt::writer::BoxMakeWriter::new(std::io::stdout), None)
    };

    let fmt_layer = match config.format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .with_target(true)
            .with_thread_ids(true)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .with_writer(writer)
            .boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer()
            .pretty()
            .with_target(true)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .with_writer(writer)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(config.env_filter())
        .with(fmt_layer)
        .try_init()
        .context("failed to initialize logging")?;

    Ok(guard)
}

/// [`init_logging_with_config`] with [`LogConfig::from_env`], overriding the level.
///
/// # Errors
///
/// Fails if a global subscriber is already installed.
pub fn init_logging(log_level: &str) -> Result<Option<WorkerGuard>> {
    let mut config = LogConfig::from_env();
    config.log_level = log_level.to_string();
    init_logging_with_config(&config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_log_format_parse() {
        assert_eq!(LogFormat::parse("pretty"), LogFormat::Pretty);
        assert_eq!(LogFormat::parse("PRETTY"), LogFormat::Pretty);
        assert_eq!(LogFormat::parse("json"), LogFormat::Json);
        assert_eq!(LogFormat::parse("xml"), LogFormat::Json);
    }

    #[test]
    fn test_defaults_when_unset() {
        assert_eq!(LogConfig::from_lookup(lookup(&[])), LogConfig::default());
    }

    #[test]
    fn test_reads_variables() {
        let config = LogConfig::from_lookup(lookup(&[
            ("EVERGREEN_LOG_LEVEL", "debug"),
            ("EVERGREEN_LOG_FORMAT", "pretty"),
            ("EVERGREEN_LOG_ASYNC", "true"),
            ("EVERGREEN_LOG_TARGET_FILTER", "evergreen::router=trace"),
            ("EVERGREEN_LOG_INCLUDE_LOCATION", "1"),
        ]));
        assert_eq!(config.level(), Level::DEBUG);
        assert_eq!(config.format, LogFormat::Pretty);
        assert!(config.async_logging);
        assert!(config.include_location);
        assert_eq!(config.target_filter.as_deref(), Some("evergreen::router=trace"));
    }

    #[test]
    fn test_unknown_level_is_info() {
        let config = LogConfig {
            log_level: "loud".into(),
            ..LogConfig::default()
        };
        assert_eq!(config.level(), Level::INFO);
    }

    #[test]
    fn test_blank_target_filter_ignored() {
        let config = LogConfig::from_lookup(lookup(&[("EVERGREEN_LOG_TARGET_FILTER", "  ")]));
        assert!(config.target_filter.is_none());
    }
}
