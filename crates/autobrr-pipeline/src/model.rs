//! Types shared between the coordinator and its external collaborators.

use autobrr_release::Release;

/// A release that cleared the filter engine, the rate cap, and any
/// configured gates, ready to hand to an [`crate::ports::ActionDispatcher`].
#[derive(Debug, Clone)]
pub struct ApprovedRelease {
    /// The approved release.
    pub release: Release,
    /// Identifier of the filter that matched.
    pub filter_id: i64,
}

/// Outcome reported by an [`crate::ports::ActionDispatcher`] (`spec.md` §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchStatus {
    /// Accepted, not yet actioned.
    Pending,
    /// Submitted to a download client.
    PushApproved,
    /// The dispatcher itself rejected the release.
    PushRejected,
    /// Submission failed (network, auth, …).
    PushError,
}

/// The result of handing an [`ApprovedRelease`] to an [`crate::ports::ActionDispatcher`].
#[derive(Debug, Clone)]
pub struct DispatchOutcome {
    /// The reported status.
    pub status: DispatchStatus,
    /// Human-readable detail.
    pub message: String,
}

/// What happened to one announce line after a full pipeline pass.
///
/// Not returned to the caller as a `Result`: per `spec.md` §4.5 the pipeline
/// is a stateless per-line function that logs its own failures. This is the
/// observable-for-tests record of that decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// The line never reached the filter engine (no indexer match, no line
    /// pattern matched, an `ignore` line, or an unparseable size capture).
    Dropped {
        /// Short machine-readable reason.
        reason: &'static str,
    },
    /// The line reached the filter engine but no candidate filter accepted
    /// it, or a later gate (rate cap, size, external script/webhook) vetoed
    /// the filter that initially matched.
    Rejected {
        /// The filter that was evaluated, if evaluation reached one.
        filter_id: Option<i64>,
        /// Ordered, stable rejection reason codes.
        reasons: Vec<String>,
    },
    /// The line was approved and handed to the action dispatcher.
    Approved {
        /// Identifier of the filter that matched.
        filter_id: i64,
    },
}
