//! # Runtime Configuration Module
//!
//! Environment variable-based configuration for the threads that drive
//! [`RunnerThread`](crate::runner::RunnerThread) execution contexts.
//!
//! ## Environment Variables
//!
//! ### `CALLROUTER_STACK_SIZE`
//!
//! Stack size for runner threads. Accepts values in:
//! - Decimal: `2097152` (2 MiB)
//! - Hexadecimal: `0x200000` or `0X200000` (2 MiB)
//!
//! Default: `0x200000` (2 MiB). Runner threads decode and serialize untrusted JSON,
//! whose recursive handling needs real thread stacks rather than coroutine-sized ones.
//! A value that cannot be parsed is logged and the default is used.
//!
//! ### `CALLROUTER_RUNNER_PREFIX`
//!
//! Prefix for runner thread names; the runner name is appended after a dash.
//! Default: `callrouter`
//!
//! ## Usage
//!
//! ```rust
//! use callrouter::runtime_config::RuntimeConfig;
//!
//! let config = RuntimeConfig::from_env();
//! println!("Stack size: {} bytes", config.stack_size);
//! ```

use std::env;
use tracing::warn;

/// Default runner thread stack size (2 MiB).
pub const DEFAULT_STACK_SIZE: usize = 0x200000;

/// Default runner thread name prefix.
pub const DEFAULT_THREAD_PREFIX: &str = "callrouter";

/// Runtime configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Stack size for runner threads in bytes
    pub stack_size: usize,
    /// Thread name prefix for runner threads
    pub thread_prefix: String,
}

impl RuntimeConfig {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        let stack_size = match env::var("CALLROUTER_STACK_SIZE") {
            Ok(value) => parse_size(&value).unwrap_or_else(|| {
                warn!(
                    value = %value,
                    default = DEFAULT_STACK_SIZE,
                    "Invalid CALLROUTER_STACK_SIZE - using default"
                );
                DEFAULT_STACK_SIZE
            }),
            Err(_) => DEFAULT_STACK_SIZE,
        };
        let thread_prefix = env::var("CALLROUTER_RUNNER_PREFIX")
            .ok()
            .filter(|p| !p.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_THREAD_PREFIX.to_string());
        RuntimeConfig {
            stack_size,
            thread_prefix,
        }
    }

    /// Thread name for a runner with the given name.
    #[must_use]
    pub fn thread_name(&self, runner_name: &str) -> String {
        format!("{}-{}", self.thread_prefix, runner_name)
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        RuntimeConfig {
            stack_size: DEFAULT_STACK_SIZE,
            thread_prefix: DEFAULT_THREAD_PREFIX.to_string(),
        }
    }
}

/// Parse a size given in decimal or `0x`-prefixed hexadecimal.
fn parse_size(value: &str) -> Option<usize> {
    let value = value.trim();
    if let Some(hex) = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
    {
        usize::from_str_radix(hex, 16).ok()
    } else {
        value.parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_size_decimal_and_hex() {
        assert_eq!(parse_size("32768"), Some(32768));
        assert_eq!(parse_size("0x8000"), Some(0x8000));
        assert_eq!(parse_size(" 0x4000 "), Some(0x4000));
        assert_eq!(parse_size("0X8000"), Some(0x8000));
        assert_eq!(parse_size("0XABCDEF"), Some(0xABCDEF));
        assert_eq!(parse_size("0xzz"), None);
        assert_eq!(parse_size("big"), None);
    }

    #[test]
    fn test_default_config() {
        let config = RuntimeConfig::default();
        assert_eq!(config.stack_size, 0x200000);
        assert_eq!(config.thread_prefix, "callrouter");
        assert_eq!(config.thread_name("io"), "callrouter-io");
    }
}
