//! Error types for indexer definition loading and URL templating.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading or using indexer definitions.
#[derive(Debug, Error)]
pub enum IndexerError {
    /// A definition file could not be read from disk.
    #[error("failed to read definition at {path:?}")]
    Read {
        /// Definition file path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
    /// A definition file is not valid YAML, or does not match the schema.
    #[error("definition at {path:?} is structurally invalid")]
    Invalid {
        /// Definition file path.
        path: PathBuf,
        /// Underlying parse error.
        #[source]
        source: serde_yaml::Error,
    },
    /// One of a definition's line patterns failed to compile as a regex.
    #[error("definition {identifier:?} line pattern {pattern:?} failed to compile")]
    LinePatternInvalid {
        /// Owning definition identifier.
        identifier: String,
        /// Offending regex pattern.
        pattern: String,
        /// Underlying regex error.
        #[source]
        source: regex::Error,
    },
    /// A URL template referenced a variable not present in the supplied map.
    #[error("template {template:?} references unknown variable {variable:?}")]
    UnknownTemplateVariable {
        /// Template string being rendered.
        template: String,
        /// Missing variable name.
        variable: String,
    },
    /// No definition is registered under the requested identifier.
    #[error("no indexer definition registered for identifier {identifier:?}")]
    UnknownIdentifier {
        /// Requested identifier.
        identifier: String,
    },
}

/// Convenience alias for indexer registry results.
pub type IndexerResult<T> = Result<T, IndexerError>;
