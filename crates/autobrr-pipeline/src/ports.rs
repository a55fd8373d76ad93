//! External collaborator interfaces (`spec.md` §6).
//!
//! No concrete implementation lives in this crate: the status store, the
//! action dispatcher, and the torrent-metadata fetcher are owned by
//! whichever binary wires the core together. The trait-object port pattern
//! is the one the teacher uses for its torrent engine boundary.

use async_trait::async_trait;
use autobrr_filter::{Filter, MaxDownloadsUnit};
use autobrr_release::Release;

use crate::model::{ApprovedRelease, DispatchOutcome};

/// The status-store interface consumed by the core (`spec.md` §6).
///
/// Implementations are expected to hold their own read-mostly snapshot of
/// filters, the same copy-on-write discipline `autobrr_indexer::Registry`
/// applies to indexer definitions (`spec.md` §9).
#[async_trait]
pub trait Repository: Send + Sync {
    /// Every enabled-or-not filter bound to `indexer`. The coordinator
    /// filters by `Filter::enabled` itself.
    async fn list_filters_by_indexer(&self, indexer: &str) -> anyhow::Result<Vec<Filter>>;

    /// Number of approvals already recorded for `filter_id` within the
    /// trailing `window`.
    async fn count_downloads(&self, filter_id: i64, window: MaxDownloadsUnit) -> anyhow::Result<u32>;

    /// Record that `release` was approved by `filter_id`, for future
    /// `count_downloads`/`known_episode` queries.
    async fn record_approved(&self, release: &Release, filter_id: i64) -> anyhow::Result<()>;

    /// Whether `(indexer, show, season, episode)` has already been recorded
    /// as grabbed, for `SmartEpisode` deduplication.
    async fn known_episode(&self, indexer: &str, show: &str, season: u32, episode: u32) -> anyhow::Result<bool>;
}

/// The download-client submission interface consumed by the core (`spec.md` §6).
#[async_trait]
pub trait ActionDispatcher: Send + Sync {
    /// Submit an approved release for downstream handling.
    async fn submit(&self, approved: ApprovedRelease) -> anyhow::Result<DispatchOutcome>;
}

/// Fetches a torrent's real size when the filter engine deferred its size
/// predicate (`AdditionalSizeCheckRequired`, `spec.md` §4.3/§4.5 step 7).
///
/// Not named as a top-level external interface in `spec.md` §6, but required
/// by §4.5 step 7 ("fetch torrent metadata"); the coordinator applies the
/// retry policy from §4.5's failure-handling paragraph (up to 3 attempts,
/// 2/4/8 s backoff) around calls to this port, so implementations need only
/// report success or failure of a single attempt.
#[async_trait]
pub trait MetadataFetcher: Send + Sync {
    /// Fetch the real size, in bytes, of the torrent at `torrent_url`.
    async fn fetch_size(&self, torrent_url: &str) -> anyhow::Result<u64>;
}
