//! Error types for configuration operations.

use thiserror::Error;

/// Primary error type for configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required environment variable was not set.
    #[error("missing required environment variable {name}")]
    MissingEnv {
        /// Name of the missing environment variable.
        name: &'static str,
    },
    /// `LOG_LEVEL` held a value outside `{trace, debug, info, warn, error}`.
    #[error("invalid log level {value:?}")]
    InvalidLogLevel {
        /// Offending value read from the environment.
        value: String,
    },
    /// `HTTP_ADDR` could not be parsed as a socket address.
    #[error("invalid HTTP_ADDR {value:?}")]
    InvalidHttpAddr {
        /// Offending value read from the environment.
        value: String,
    },
}

/// Convenience alias for configuration results.
pub type ConfigResult<T> = Result<T, ConfigError>;
