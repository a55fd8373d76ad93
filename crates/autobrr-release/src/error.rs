//! Error types for release construction from announce captures.

use thiserror::Error;

/// Errors raised while mapping announce-captured variables into a [`crate::model::Release`].
#[derive(Debug, Error)]
pub enum ReleaseError {
    /// A required capture variable was absent from the announce match.
    #[error("missing required capture variable {name:?}")]
    MissingVar {
        /// Name of the missing capture variable.
        name: String,
    },
    /// The `size` capture could not be parsed under the size grammar.
    #[error("invalid size capture {value:?}: {reason}")]
    InvalidSize {
        /// Raw captured size string.
        value: String,
        /// Human-readable parse failure reason.
        reason: String,
    },
}

/// Convenience alias for release construction results.
pub type ReleaseResult<T> = Result<T, ReleaseError>;
