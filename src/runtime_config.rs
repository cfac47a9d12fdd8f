//! Environment-driven runtime settings for the `may` coroutine runtime.
//!
//! `EVERGREEN_STACK_SIZE` sets the coroutine stack size in bytes, decimal
//! (`16384`) or hexadecimal (`0x4000`). Unparseable values fall back to the
//! default of `0x4000`.

use std::env;

/// Stack size used when `EVERGREEN_STACK_SIZE` is unset or invalid.
pub const DEFAULT_STACK_SIZE: usize = 0x4000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Coroutine stack size in bytes
    pub stack_size: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            stack_size: DEFAULT_STACK_SIZE,
        }
    }
}

impl RuntimeConfig {
    #[must_use]
    pub fn from_env() -> Self {
        let stack_size = env::var("EVERGREEN_STACK_SIZE")
            .ok()
            .and_then(|v| parse_size(&v))
            .unwrap_or(DEFAULT_STACK_SIZE);
        RuntimeConfig { stack_size }
    }

    /// Apply the settings to the global `may` configuration.
    pub fn apply(&self) {
        may::config().set_stack_size(self.stack_size);
    }
}

fn parse_size(value: &str) -> Option<usize> {
    let value = value.trim();
    match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => usize::from_str_radix(hex, 16).ok(),
        None => value.parse().ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("16384"), Some(16384));
        assert_eq!(parse_size("0x8000"), Some(0x8000));
        assert_eq!(parse_size(" 0X10 "), Some(16));
        assert_eq!(parse_size("lots"), None);
    }

    #[test]
    fn test_default() {
        assert_eq!(RuntimeConfig::default().stack_size, DEFAULT_STACK_SIZE);
    }
}
