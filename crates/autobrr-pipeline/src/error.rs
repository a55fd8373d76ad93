//! Errors for the pipeline's own fallible internal operations.
//!
//! Repository/dispatcher/metadata-fetcher failures are not represented here:
//! per `spec.md` §4.5 the pipeline is a stateless per-line function and those
//! failures are logged, recorded as a rejection reason, and never returned to
//! a caller.

use thiserror::Error;

/// Failures internal to the pipeline coordinator itself.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Fetching torrent metadata (for a deferred size check) failed after
    /// exhausting the retry budget (`spec.md` §4.5: "up to 3 attempts, 2/4/8 s backoff").
    #[error("fetching metadata for {torrent_url} failed after {attempts} attempts: {source}")]
    MetadataFetch {
        /// The URL that could not be fetched.
        torrent_url: String,
        /// Number of attempts made before giving up.
        attempts: u32,
        /// Underlying transport error.
        #[source]
        source: anyhow::Error,
    },
}

/// Convenience alias for this crate's internal fallible operations.
pub type PipelineResult<T> = Result<T, PipelineError>;
