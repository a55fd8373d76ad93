//! Error types for filter compilation.

use thiserror::Error;

/// Errors raised while compiling a [`crate::model::Filter`] for matching.
///
/// Compilation failures surface at filter load time (per `spec.md` §7
/// "Configuration" errors), never mid-match.
#[derive(Debug, Error)]
pub enum FilterError {
    /// A text-match field's regex pattern failed to compile.
    #[error("filter {filter_id} field {field:?} pattern {pattern:?} failed to compile")]
    InvalidPattern {
        /// Owning filter id.
        filter_id: i64,
        /// Field name (`"match_releases"`, `"except_release_groups"`, …).
        field: &'static str,
        /// Offending pattern.
        pattern: String,
        /// Underlying regex error.
        #[source]
        source: regex::Error,
    },
    /// A glob-match field's pattern failed to compile.
    #[error("filter {filter_id} field {field:?} glob {pattern:?} failed to compile")]
    InvalidGlob {
        /// Owning filter id.
        filter_id: i64,
        /// Field name.
        field: &'static str,
        /// Offending pattern.
        pattern: String,
        /// Underlying globset error.
        #[source]
        source: globset::Error,
    },
    /// A range-expression field (`Years`, `Seasons`, …) could not be parsed.
    #[error("filter {filter_id} field {field:?} range {expression:?} is invalid")]
    InvalidRange {
        /// Owning filter id.
        filter_id: i64,
        /// Field name.
        field: &'static str,
        /// Offending expression.
        expression: String,
    },
    /// A byte-size field (`MinSize`/`MaxSize`) could not be parsed.
    #[error("filter {filter_id} field {field:?} size {value:?} is invalid")]
    InvalidSize {
        /// Owning filter id.
        filter_id: i64,
        /// Field name.
        field: &'static str,
        /// Offending value.
        value: String,
        /// Underlying parse error detail.
        #[source]
        source: autobrr_release::ReleaseError,
    },
}

/// Convenience alias for filter compilation results.
pub type FilterResult<T> = Result<T, FilterError>;
