//! Default collaborator implementations for `autobrr_pipeline`'s ports.
//!
//! The real status store and download-client integration are explicitly
//! out of this core's scope (`spec.md`'s Non-goals: "does not persist
//! releases", "does not itself own torrent transport"); a production
//! deployment supplies its own [`autobrr_pipeline::Repository`] and
//! [`autobrr_pipeline::ActionDispatcher`] backed by a real datastore and
//! download client. What ships here is a minimal, in-process reference
//! implementation so the binary is runnable end to end: filters are read
//! once from a JSON file, download counts and seen episodes are tracked
//! only for the life of the process, and approved releases are logged
//! rather than submitted anywhere.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use autobrr_filter::{Filter, MaxDownloadsUnit};
use autobrr_pipeline::{ActionDispatcher, ApprovedRelease, DispatchOutcome, DispatchStatus, MetadataFetcher, Repository};
use autobrr_release::Release;
use chrono::{DateTime, Utc};
use tracing::info;

/// In-memory [`Repository`] seeded once from a JSON file of [`Filter`]s.
///
/// A filter with an empty `indexers` list is considered bound to every
/// indexer; otherwise it must name the indexer explicitly, matching the
/// scoping the teacher's own torrent-core data model applies to per-profile
/// overrides.
pub struct FileRepository {
    filters: Vec<Filter>,
    approvals: Mutex<Vec<(i64, DateTime<Utc>)>>,
    seen_episodes: Mutex<HashSet<(String, String, u32, u32)>>,
}

impl FileRepository {
    /// Load filters from `path`. An absent file is treated as zero filters
    /// configured, not an error, so the binary still starts with nothing to
    /// approve rather than refusing to boot.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but is not valid JSON.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let filters = match std::fs::read_to_string(path) {
            Ok(contents) => serde_json::from_str(&contents)?,
            Err(source) if source.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "no filters file found, starting with zero filters");
                Vec::new()
            }
            Err(source) => return Err(source.into()),
        };
        Ok(Self {
            filters,
            approvals: Mutex::new(Vec::new()),
            seen_episodes: Mutex::new(HashSet::new()),
        })
    }

    const fn window_duration(window: MaxDownloadsUnit) -> Option<Duration> {
        match window {
            MaxDownloadsUnit::Hour => Some(Duration::from_secs(3600)),
            MaxDownloadsUnit::Day => Some(Duration::from_secs(24 * 3600)),
            MaxDownloadsUnit::Week => Some(Duration::from_secs(7 * 24 * 3600)),
            MaxDownloadsUnit::Month => Some(Duration::from_secs(30 * 24 * 3600)),
            MaxDownloadsUnit::Ever => None,
        }
    }
}

#[async_trait]
impl Repository for FileRepository {
    async fn list_filters_by_indexer(&self, indexer: &str) -> anyhow::Result<Vec<Filter>> {
        Ok(self
            .filters
            .iter()
            .filter(|filter| filter.indexers.is_empty() || filter.indexers.iter().any(|name| name == indexer))
            .cloned()
            .collect())
    }

    async fn count_downloads(&self, filter_id: i64, window: MaxDownloadsUnit) -> anyhow::Result<u32> {
        let approvals = self.approvals.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let count = match Self::window_duration(window) {
            Some(duration) => {
                let cutoff = Utc::now() - chrono::Duration::from_std(duration)?;
                approvals.iter().filter(|(id, at)| *id == filter_id && *at >= cutoff).count()
            }
            None => approvals.iter().filter(|(id, _)| *id == filter_id).count(),
        };
        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }

    async fn record_approved(&self, release: &Release, filter_id: i64) -> anyhow::Result<()> {
        self.approvals
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push((filter_id, release.timestamp));
        if release.season > 0 && release.episode > 0 {
            self.seen_episodes
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .insert((release.indexer.clone(), release.title.clone(), release.season, release.episode));
        }
        Ok(())
    }

    async fn known_episode(&self, indexer: &str, show: &str, season: u32, episode: u32) -> anyhow::Result<bool> {
        Ok(self
            .seen_episodes
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .contains(&(indexer.to_string(), show.to_string(), season, episode)))
    }
}

/// Logs every approval instead of submitting it anywhere, standing in for
/// the (out-of-scope) download-client integration.
pub struct LoggingDispatcher;

#[async_trait]
impl ActionDispatcher for LoggingDispatcher {
    async fn submit(&self, approved: ApprovedRelease) -> anyhow::Result<DispatchOutcome> {
        info!(
            indexer = %approved.release.indexer,
            torrent_name = %approved.release.torrent_name,
            filter_id = approved.filter_id,
            "approved release (no download client configured, logging only)"
        );
        Ok(DispatchOutcome {
            status: DispatchStatus::PushApproved,
            message: "logged, no download client configured".to_string(),
        })
    }
}

/// Fetches a torrent's real size with a `HEAD` request's `Content-Length`.
pub struct HttpMetadataFetcher {
    client: reqwest::Client,
}

impl HttpMetadataFetcher {
    /// Construct a fetcher with a fresh client.
    #[must_use]
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for HttpMetadataFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MetadataFetcher for HttpMetadataFetcher {
    async fn fetch_size(&self, torrent_url: &str) -> anyhow::Result<u64> {
        let response = self.client.head(torrent_url).send().await?;
        let length = response
            .headers()
            .get(reqwest::header::CONTENT_LENGTH)
            .ok_or_else(|| anyhow::anyhow!("torrent response carried no Content-Length header"))?
            .to_str()?
            .parse()?;
        Ok(length)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use autobrr_release::Implementation;

    #[tokio::test]
    async fn missing_filters_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let repository = FileRepository::load(&dir.path().join("filters.json")).unwrap();
        assert!(repository.list_filters_by_indexer("ptp").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn filters_scope_by_indexer_unless_unscoped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("filters.json");
        let filters = vec![
            Filter {
                id: 1,
                name: "ptp-only".to_string(),
                enabled: true,
                indexers: vec!["ptp".to_string()],
                ..Filter::default()
            },
            Filter {
                id: 2,
                name: "global".to_string(),
                enabled: true,
                ..Filter::default()
            },
        ];
        std::fs::write(&path, serde_json::to_string(&filters).unwrap()).unwrap();

        let repository = FileRepository::load(&path).unwrap();
        let ptp = repository.list_filters_by_indexer("ptp").await.unwrap();
        assert_eq!(ptp.len(), 2);
        let other = repository.list_filters_by_indexer("orpheus").await.unwrap();
        assert_eq!(other.len(), 1);
        assert_eq!(other[0].id, 2);
    }

    #[tokio::test]
    async fn count_downloads_respects_the_rolling_window() {
        let dir = tempfile::tempdir().unwrap();
        let repository = FileRepository::load(&dir.path().join("filters.json")).unwrap();
        let mut release = Release::new("ptp", Implementation::Irc);
        release.timestamp = Utc::now() - chrono::Duration::hours(2);
        repository.record_approved(&release, 1).await.unwrap();

        assert_eq!(repository.count_downloads(1, MaxDownloadsUnit::Hour).await.unwrap(), 0);
        assert_eq!(repository.count_downloads(1, MaxDownloadsUnit::Day).await.unwrap(), 1);
        assert_eq!(repository.count_downloads(1, MaxDownloadsUnit::Ever).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn known_episode_reflects_recorded_approvals() {
        let dir = tempfile::tempdir().unwrap();
        let repository = FileRepository::load(&dir.path().join("filters.json")).unwrap();
        let mut release = Release::new("ptp", Implementation::Irc);
        release.title = "Some Show".to_string();
        release.season = 2;
        release.episode = 5;
        repository.record_approved(&release, 1).await.unwrap();

        assert!(repository.known_episode("ptp", "Some Show", 2, 5).await.unwrap());
        assert!(!repository.known_episode("ptp", "Some Show", 2, 6).await.unwrap());
    }
}
