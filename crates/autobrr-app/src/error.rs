//! # Design
//!
//! - Centralize application-level errors for bootstrap and the default
//!   collaborator adapters.
//! - Keep error messages constant while carrying context fields for debugging.
//! - Preserve source errors without re-logging at call sites.

use thiserror::Error;

/// Result alias for application operations.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// A required environment variable was not set.
    #[error("missing environment configuration")]
    MissingEnv {
        /// Name of the missing environment variable.
        name: &'static str,
    },
    /// Application-level configuration was invalid.
    #[error("configuration operation failed")]
    Config {
        /// Operation identifier.
        operation: &'static str,
        /// Source configuration error.
        #[source]
        source: autobrr_config::ConfigError,
    },
    /// Logging/telemetry initialisation failed.
    #[error("telemetry operation failed")]
    Telemetry {
        /// Operation identifier.
        operation: &'static str,
        /// Source telemetry error.
        #[source]
        source: anyhow::Error,
    },
    /// The indexer definition registry could not be loaded.
    #[error("indexer registry operation failed")]
    Indexer {
        /// Operation identifier.
        operation: &'static str,
        /// Source indexer registry error.
        #[source]
        source: autobrr_indexer::IndexerError,
    },
    /// The filter repository's backing file could not be read or parsed.
    #[error("filter repository operation failed")]
    Repository {
        /// Operation identifier.
        operation: &'static str,
        /// Source error.
        #[source]
        source: anyhow::Error,
    },
}

impl AppError {
    pub(crate) const fn config(operation: &'static str, source: autobrr_config::ConfigError) -> Self {
        Self::Config { operation, source }
    }

    pub(crate) const fn telemetry(operation: &'static str, source: anyhow::Error) -> Self {
        Self::Telemetry { operation, source }
    }

    pub(crate) const fn indexer(operation: &'static str, source: autobrr_indexer::IndexerError) -> Self {
        Self::Indexer { operation, source }
    }

    pub(crate) const fn repository(operation: &'static str, source: anyhow::Error) -> Self {
        Self::Repository { operation, source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_error_helpers_build_variants() {
        let config = AppError::config(
            "load",
            autobrr_config::ConfigError::InvalidLogLevel {
                value: "bad".to_string(),
            },
        );
        assert!(matches!(config, AppError::Config { .. }));

        let telemetry = AppError::telemetry("init", anyhow::anyhow!("subscriber already set"));
        assert!(matches!(telemetry, AppError::Telemetry { .. }));
    }
}
