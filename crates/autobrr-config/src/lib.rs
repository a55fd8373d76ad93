#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::cargo,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![allow(clippy::module_name_repetitions)]

//! Application-level configuration: the handful of environment inputs the
//! core itself consumes (`CONFIG_PATH`, `LOG_LEVEL`) plus `HTTP_ADDR`, which
//! the core only stores for the (out-of-scope) API surface to read back.
//!
//! Indexer definitions and filters are not configuration in this sense: they
//! are owned by `autobrr-indexer` and the repository interface respectively,
//! each with their own load/reload lifecycle.

pub mod error;

use std::path::PathBuf;

pub use error::{ConfigError, ConfigResult};

/// Default directory searched for on-disk indexer definition overrides and
/// other operator-provided configuration when `CONFIG_PATH` is unset.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/autobrr";

/// Log verbosity accepted via `LOG_LEVEL`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Most verbose; every protocol line and parser decision.
    Trace,
    /// Verbose; parser/filter intermediate state.
    Debug,
    /// Default; lifecycle and outcome events.
    Info,
    /// Recoverable anomalies (dropped lines, backoff).
    Warn,
    /// Failures requiring operator attention.
    Error,
}

impl LogLevel {
    /// Parse a `LOG_LEVEL` value, case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidLogLevel`] for anything outside
    /// `{trace, debug, info, warn, error}`.
    pub fn parse(value: &str) -> ConfigResult<Self> {
        match value.to_ascii_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            _ => Err(ConfigError::InvalidLogLevel {
                value: value.to_string(),
            }),
        }
    }

    /// Render as the `tracing`/`EnvFilter` level string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// The environment-resolved settings the core process needs at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Directory holding on-disk indexer definition overrides, from `CONFIG_PATH`.
    pub config_path: PathBuf,
    /// Logging verbosity, from `LOG_LEVEL`.
    pub log_level: LogLevel,
    /// Bind address for the (external, out-of-scope) HTTP/SSE API, from `HTTP_ADDR`.
    ///
    /// The core reads this only to pass it along; it does not bind a socket.
    pub http_addr: Option<String>,
}

impl AppConfig {
    /// Resolve configuration from the process environment.
    ///
    /// `CONFIG_PATH` defaults to [`DEFAULT_CONFIG_PATH`] and `LOG_LEVEL`
    /// defaults to `info` when unset; both are validated when present.
    ///
    /// # Errors
    ///
    /// Returns an error if `LOG_LEVEL` is set to an unrecognised value.
    pub fn from_env() -> ConfigResult<Self> {
        let config_path = std::env::var("CONFIG_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));

        let log_level = match std::env::var("LOG_LEVEL") {
            Ok(value) => LogLevel::parse(&value)?,
            Err(_) => LogLevel::Info,
        };

        let http_addr = std::env::var("HTTP_ADDR").ok();

        Ok(Self {
            config_path,
            log_level,
            http_addr,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_level_parses_case_insensitively() {
        assert_eq!(LogLevel::parse("WARN").unwrap(), LogLevel::Warn);
        assert_eq!(LogLevel::parse("Debug").unwrap(), LogLevel::Debug);
    }

    #[test]
    fn log_level_rejects_unknown_values() {
        let err = LogLevel::parse("verbose").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidLogLevel { .. }));
    }

    #[test]
    fn log_level_as_str_round_trips() {
        for level in [
            LogLevel::Trace,
            LogLevel::Debug,
            LogLevel::Info,
            LogLevel::Warn,
            LogLevel::Error,
        ] {
            assert_eq!(LogLevel::parse(level.as_str()).unwrap(), level);
        }
    }
}
