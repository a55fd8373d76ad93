//! The release pipeline coordinator (`spec.md` §4.5): resolve, parse, filter,
//! rate-cap, gate, and dispatch, one announce line at a time.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use autobrr_events::{Event, EventBus};
use autobrr_filter::{CompiledFilter, Filter, MaxDownloadsUnit};
use autobrr_indexer::{CompiledDefinition, Registry};
use autobrr_irc::AnnounceLine;
use autobrr_release::{Implementation, Release};
use autobrr_telemetry::Metrics;
use tokio::sync::{mpsc, Mutex as AsyncMutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::PipelineError;
use crate::gates::{run_script_gate, run_webhook_gate};
use crate::model::{ApprovedRelease, DispatchStatus, ProcessOutcome};
use crate::ports::{ActionDispatcher, MetadataFetcher, Repository};

/// Tunables for the coordinator, defaulted from `spec.md` §5.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Bounded capacity of the inbound announce-line queue.
    pub queue_capacity: usize,
    /// Number of concurrent per-release worker tasks.
    pub workers: usize,
    /// How long in-flight processing is allowed to finish during shutdown.
    pub shutdown_grace: Duration,
    /// Attempts for the deferred torrent-metadata fetch.
    pub metadata_fetch_attempts: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 1024,
            workers: std::thread::available_parallelism().map_or(4, std::num::NonZeroUsize::get),
            shutdown_grace: Duration::from_secs(10),
            metadata_fetch_attempts: 3,
        }
    }
}

/// A running coordinator's externally visible handle.
pub struct PipelineHandle {
    sender: mpsc::Sender<AnnounceLine>,
    cancellation: CancellationToken,
    workers: Vec<JoinHandle<()>>,
    shutdown_grace: Duration,
}

impl PipelineHandle {
    /// A cloneable sender IRC sessions publish announce lines into.
    #[must_use]
    pub fn sender(&self) -> mpsc::Sender<AnnounceLine> {
        self.sender.clone()
    }

    /// Two-phase shutdown (`spec.md` §5): stop taking new lines from the
    /// queue, allow up to `shutdown_grace` for in-flight processing, then
    /// abort anything still running.
    pub async fn shutdown(self) {
        self.cancellation.cancel();
        let deadline = tokio::time::Instant::now() + self.shutdown_grace;
        let mut workers = self.workers.into_iter();
        while let Some(mut worker) = workers.next() {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            match tokio::time::timeout(remaining, &mut worker).await {
                Ok(result) => {
                    if let Err(source) = result {
                        warn!(error = %source, "pipeline worker task panicked during shutdown");
                    }
                }
                Err(_) => {
                    warn!("pipeline shutdown grace period elapsed, aborting remaining workers");
                    worker.abort();
                    for remaining_worker in workers {
                        remaining_worker.abort();
                    }
                    break;
                }
            }
        }
    }
}

/// Spawn the coordinator's worker pool.
#[must_use]
pub fn spawn<R, D, M>(
    registry: Arc<Registry>,
    repository: Arc<R>,
    dispatcher: Arc<D>,
    metadata: Arc<M>,
    events: EventBus,
    metrics: Metrics,
    config: PipelineConfig,
) -> PipelineHandle
where
    R: Repository + 'static,
    D: ActionDispatcher + 'static,
    M: MetadataFetcher + 'static,
{
    let (sender, receiver) = mpsc::channel(config.queue_capacity);
    let receiver = Arc::new(AsyncMutex::new(receiver));
    let cancellation = CancellationToken::new();
    let context = Arc::new(Context {
        registry,
        repository,
        dispatcher,
        metadata,
        events,
        metrics,
        http: reqwest::Client::new(),
        metadata_fetch_attempts: config.metadata_fetch_attempts,
    });

    let workers = (0..config.workers.max(1))
        .map(|id| {
            tokio::spawn(worker_loop(
                id,
                Arc::clone(&receiver),
                Arc::clone(&context),
                cancellation.clone(),
            ))
        })
        .collect();

    PipelineHandle {
        sender,
        cancellation,
        workers,
        shutdown_grace: config.shutdown_grace,
    }
}

struct Context<R, D, M> {
    registry: Arc<Registry>,
    repository: Arc<R>,
    dispatcher: Arc<D>,
    metadata: Arc<M>,
    events: EventBus,
    metrics: Metrics,
    http: reqwest::Client,
    metadata_fetch_attempts: u32,
}

async fn worker_loop<R, D, M>(
    id: usize,
    receiver: Arc<AsyncMutex<mpsc::Receiver<AnnounceLine>>>,
    context: Arc<Context<R, D, M>>,
    cancellation: CancellationToken,
) where
    R: Repository,
    D: ActionDispatcher,
    M: MetadataFetcher,
{
    debug!(worker = id, "pipeline worker started");
    loop {
        let line = {
            let mut guard = receiver.lock().await;
            tokio::select! {
                () = cancellation.cancelled() => break,
                received = guard.recv() => received,
            }
        };
        let Some(line) = line else { break };
        let outcome = process_announce(&context, &line).await;
        log_outcome(&line, &outcome);
    }
    debug!(worker = id, "pipeline worker stopped");
}

fn log_outcome(line: &AnnounceLine, outcome: &ProcessOutcome) {
    match outcome {
        ProcessOutcome::Dropped { reason } => {
            debug!(network = %line.network, announcer = %line.announcer, reason, "announce line dropped");
        }
        ProcessOutcome::Rejected { filter_id, reasons } => {
            info!(network = %line.network, filter_id = ?filter_id, reasons = ?reasons, "release rejected");
        }
        ProcessOutcome::Approved { filter_id } => {
            info!(network = %line.network, filter_id, "release approved");
        }
    }
}

enum LineOutcome {
    NoMatch,
    Ignored,
    Matched(HashMap<String, String>),
}

fn match_announce_line(definition: &CompiledDefinition, payload: &str) -> LineOutcome {
    for (line, pattern) in definition.definition.irc.parse.lines.iter().zip(&definition.line_patterns) {
        let Some(regex) = pattern else { continue };
        let Some(captures) = regex.captures(payload) else {
            continue;
        };
        if line.ignore {
            return LineOutcome::Ignored;
        }
        let mut vars = HashMap::new();
        for name in &line.vars {
            if let Some(value) = captures.name(name) {
                vars.insert(name.clone(), value.as_str().to_string());
            }
        }
        return LineOutcome::Matched(vars);
    }
    LineOutcome::NoMatch
}

async fn process_announce<R, D, M>(context: &Context<R, D, M>, line: &AnnounceLine) -> ProcessOutcome
where
    R: Repository,
    D: ActionDispatcher,
    M: MetadataFetcher,
{
    // Step 1: resolve the indexer definition.
    let snapshot = context.registry.snapshot();
    let Some(definition) = snapshot.get_parse_for_announcer(&line.network, &line.channel, &line.announcer) else {
        context.metrics.inc_announce_dropped("unmatched_indexer");
        return ProcessOutcome::Dropped {
            reason: "unmatched_indexer",
        };
    };
    context.metrics.inc_announce_received(&definition.definition.identifier);

    // Step 2: run the definition's line patterns against the payload.
    let captured = match match_announce_line(&definition, &line.payload) {
        LineOutcome::NoMatch => {
            context.metrics.inc_announce_dropped("unparsed");
            return ProcessOutcome::Dropped { reason: "unparsed" };
        }
        LineOutcome::Ignored => {
            return ProcessOutcome::Dropped { reason: "ignored" };
        }
        LineOutcome::Matched(vars) => vars,
    };

    // Step 3: construct and parse the release.
    let mut release = Release::new(definition.definition.identifier.clone(), Implementation::Irc);
    release.timestamp = line.timestamp;
    let force_size_unit = definition.definition.irc.parse.force_size_unit.as_deref();
    if let Err(source) = autobrr_release::map_vars(&mut release, &captured, force_size_unit) {
        warn!(indexer = %release.indexer, error = %source, "announce line carried an unparseable size capture");
        context.metrics.inc_announce_dropped("invalid_size");
        return ProcessOutcome::Dropped { reason: "invalid_size" };
    }
    autobrr_release::parse_string(&mut release, &release.torrent_name.clone());
    if !release.release_tags.is_empty() {
        autobrr_release::parse_release_tags(&mut release, &release.release_tags.clone());
    }
    context.metrics.inc_announce_parsed(&release.indexer);

    // Step 4: load the enabled filters bound to this indexer.
    let filters = match context.repository.list_filters_by_indexer(&release.indexer).await {
        Ok(filters) => filters,
        Err(source) => {
            error!(indexer = %release.indexer, error = %source, "repository lookup failed");
            return ProcessOutcome::Dropped {
                reason: "repository_unavailable",
            };
        }
    };
    let compiled = compile_filters(filters);

    // Step 5: invoke the filter engine.
    let smart_episode_hit = context
        .repository
        .known_episode(&release.indexer, &release.title, release.season, release.episode)
        .await
        .unwrap_or_else(|source| {
            warn!(indexer = %release.indexer, error = %source, "smart-episode lookup failed, assuming unseen");
            false
        });
    let outcome = autobrr_filter::match_release(&release, &compiled, smart_episode_hit);

    let Some(mut filter) = outcome.matched else {
        context.metrics.inc_filter_rejected("no_match");
        publish_rejected(context, &release, None, vec!["no_match".to_string()]);
        return ProcessOutcome::Rejected {
            filter_id: None,
            reasons: vec!["no_match".to_string()],
        };
    };
    context.metrics.inc_filter_matched(&filter.filter.id.to_string());

    // Step 6: the download-rate cap.
    if let Some(limit) = filter.filter.max_downloads {
        let window = filter.filter.max_downloads_unit.unwrap_or(MaxDownloadsUnit::Ever);
        match context.repository.count_downloads(filter.filter.id, window).await {
            Ok(count) if count >= limit => {
                context.metrics.inc_rate_cap_rejection();
                publish_rejected(context, &release, Some(filter.filter.id), vec!["max_downloads".to_string()]);
                return ProcessOutcome::Rejected {
                    filter_id: Some(filter.filter.id),
                    reasons: vec!["max_downloads".to_string()],
                };
            }
            Ok(_) => {}
            Err(source) => {
                warn!(filter_id = filter.filter.id, error = %source, "rate cap lookup failed, rejecting conservatively");
                publish_rejected(
                    context,
                    &release,
                    Some(filter.filter.id),
                    vec!["rate_cap_unavailable".to_string()],
                );
                return ProcessOutcome::Rejected {
                    filter_id: Some(filter.filter.id),
                    reasons: vec!["rate_cap_unavailable".to_string()],
                };
            }
        }
    }

    // Step 7: the deferred size check.
    if outcome.additional_size_check_required {
        match fetch_size_with_retry(context, &release.torrent_url).await {
            Ok(size) => {
                release.size = size;
                let refreshed = autobrr_filter::match_release(&release, &compiled, smart_episode_hit);
                match refreshed.matched {
                    Some(refiltered) if refiltered.filter.id == filter.filter.id => {
                        filter = refiltered;
                    }
                    _ => {
                        let reasons = refreshed
                            .rejections
                            .get(&filter.filter.id)
                            .cloned()
                            .unwrap_or_else(|| vec!["size".to_string()]);
                        context.metrics.inc_filter_rejected("size");
                        publish_rejected(context, &release, Some(filter.filter.id), reasons.clone());
                        return ProcessOutcome::Rejected {
                            filter_id: Some(filter.filter.id),
                            reasons,
                        };
                    }
                }
            }
            Err(source) => {
                warn!(torrent_url = %release.torrent_url, error = %source, "could not fetch torrent metadata for deferred size check");
                publish_rejected(
                    context,
                    &release,
                    Some(filter.filter.id),
                    vec!["size_unavailable".to_string()],
                );
                return ProcessOutcome::Rejected {
                    filter_id: Some(filter.filter.id),
                    reasons: vec!["size_unavailable".to_string()],
                };
            }
        }
    }

    // Step 8: external script/webhook gates (advisory veto).
    match run_script_gate(&filter.filter.external_script, &release).await {
        Ok(true) => {}
        Ok(false) => {
            publish_rejected(context, &release, Some(filter.filter.id), vec!["external_script".to_string()]);
            return ProcessOutcome::Rejected {
                filter_id: Some(filter.filter.id),
                reasons: vec!["external_script".to_string()],
            };
        }
        Err(source) => {
            warn!(filter_id = filter.filter.id, error = %source, "external script gate failed to run");
        }
    }
    match run_webhook_gate(&context.http, &filter.filter.external_webhook, &release).await {
        Ok(true) => {}
        Ok(false) => {
            publish_rejected(context, &release, Some(filter.filter.id), vec!["external_webhook".to_string()]);
            return ProcessOutcome::Rejected {
                filter_id: Some(filter.filter.id),
                reasons: vec!["external_webhook".to_string()],
            };
        }
        Err(source) => {
            warn!(filter_id = filter.filter.id, error = %source, "external webhook gate failed to run");
        }
    }

    // Step 9: approve.
    release.filter_id = Some(filter.filter.id);
    if filter.filter.delay > 0 {
        tokio::time::sleep(Duration::from_secs(u64::from(filter.filter.delay))).await;
    }
    if let Err(source) = context.repository.record_approved(&release, filter.filter.id).await {
        warn!(filter_id = filter.filter.id, error = %source, "failed to record approval");
    }
    context.metrics.inc_release_approved();

    let approved = ApprovedRelease {
        release: release.clone(),
        filter_id: filter.filter.id,
    };
    match context.dispatcher.submit(approved).await {
        Ok(result) if result.status == DispatchStatus::PushError => {
            let _ = context.events.publish(Event::PushError {
                indexer: release.indexer.clone(),
                torrent_name: release.torrent_name.clone(),
                message: result.message,
            });
        }
        Ok(_) => {
            let _ = context.events.publish(Event::PushApproved {
                indexer: release.indexer.clone(),
                torrent_name: release.torrent_name.clone(),
                filter_id: filter.filter.id,
            });
        }
        Err(source) => {
            error!(filter_id = filter.filter.id, error = %source, "action dispatcher submission failed");
            let _ = context.events.publish(Event::PushError {
                indexer: release.indexer.clone(),
                torrent_name: release.torrent_name.clone(),
                message: source.to_string(),
            });
        }
    }

    ProcessOutcome::Approved {
        filter_id: filter.filter.id,
    }
}

fn compile_filters(filters: Vec<Filter>) -> Vec<CompiledFilter> {
    filters
        .into_iter()
        .filter(|filter| filter.enabled)
        .filter_map(|filter| {
            let id = filter.id;
            match CompiledFilter::compile(filter) {
                Ok(compiled) => Some(compiled),
                Err(source) => {
                    warn!(filter_id = id, error = %source, "skipping uncompilable filter");
                    None
                }
            }
        })
        .collect()
}

fn publish_rejected<R, D, M>(
    context: &Context<R, D, M>,
    release: &Release,
    filter_id: Option<i64>,
    reasons: Vec<String>,
) {
    let _ = context.events.publish(Event::PushRejected {
        indexer: release.indexer.clone(),
        torrent_name: release.torrent_name.clone(),
        filter_id,
        reasons,
    });
}

/// Fetch the torrent's real size, retrying up to `metadata_fetch_attempts`
/// times with 2/4/8 s backoff (`spec.md` §4.5 failure handling).
async fn fetch_size_with_retry<R, D, M>(context: &Context<R, D, M>, torrent_url: &str) -> Result<u64, PipelineError>
where
    R: Repository,
    D: ActionDispatcher,
    M: MetadataFetcher,
{
    let mut last_error = None;
    for attempt in 0..context.metadata_fetch_attempts {
        match context.metadata.fetch_size(torrent_url).await {
            Ok(size) => return Ok(size),
            Err(source) => {
                warn!(torrent_url, attempt, error = %source, "metadata fetch attempt failed");
                last_error = Some(source);
                if attempt + 1 < context.metadata_fetch_attempts {
                    tokio::time::sleep(Duration::from_secs(2u64 << attempt)).await;
                }
            }
        }
    }
    Err(PipelineError::MetadataFetch {
        torrent_url: torrent_url.to_string(),
        attempts: context.metadata_fetch_attempts,
        source: last_error.unwrap_or_else(|| anyhow::anyhow!("no attempts made")),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use autobrr_filter::Filter;
    use chrono::Utc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio_stream::StreamExt;

    const TEST_DEFINITION_YAML: &str = r"
identifier: ratecap-test
name: Rate Cap Test Tracker
protocol: torrent
supports: [irc]
irc:
  network: TestNet
  server: irc.test.invalid
  port: 6697
  tls: true
  channels: ['#test-announce']
  announcers: ['Announce-Bot']
  parse:
    type: single
    lines:
      - pattern: '^(?P<torrentName>.+) - (?P<torrentUrl>\S+)$'
        vars: [torrentName, torrentUrl]
    match:
      infourl: 'https://test.invalid/torrents/{{ .torrentId }}'
      torrenturl: '{{ .torrentUrl }}'
";

    fn test_announce_line(torrent_name: &str) -> AnnounceLine {
        AnnounceLine {
            network: "TestNet".to_string(),
            channel: "#test-announce".to_string(),
            announcer: "Announce-Bot".to_string(),
            payload: format!("{torrent_name} - https://test.invalid/dl/{torrent_name}.torrent"),
            timestamp: Utc::now(),
        }
    }

    fn test_registry() -> Arc<Registry> {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("ratecap-test.yml"), TEST_DEFINITION_YAML).expect("write definition");
        // `Registry::load` only reads the override directory during this call
        // and keeps no handle to it afterward, so `dir` can drop here.
        let registry = Registry::load(Some(dir.path())).expect("load registry");
        Arc::new(registry)
    }

    struct CountingRepository {
        approvals: AtomicU32,
        filter: Filter,
    }

    #[async_trait]
    impl Repository for CountingRepository {
        async fn list_filters_by_indexer(&self, _indexer: &str) -> anyhow::Result<Vec<Filter>> {
            Ok(vec![self.filter.clone()])
        }

        async fn count_downloads(&self, _filter_id: i64, _window: MaxDownloadsUnit) -> anyhow::Result<u32> {
            Ok(self.approvals.load(Ordering::SeqCst))
        }

        async fn record_approved(&self, _release: &Release, _filter_id: i64) -> anyhow::Result<()> {
            self.approvals.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn known_episode(&self, _indexer: &str, _show: &str, _season: u32, _episode: u32) -> anyhow::Result<bool> {
            Ok(false)
        }
    }

    struct AcceptingDispatcher;

    #[async_trait]
    impl ActionDispatcher for AcceptingDispatcher {
        async fn submit(&self, _approved: ApprovedRelease) -> anyhow::Result<DispatchOutcome> {
            Ok(DispatchOutcome {
                status: DispatchStatus::PushApproved,
                message: "accepted".to_string(),
            })
        }
    }

    struct UnusedMetadataFetcher;

    #[async_trait]
    impl MetadataFetcher for UnusedMetadataFetcher {
        async fn fetch_size(&self, _torrent_url: &str) -> anyhow::Result<u64> {
            Err(anyhow::anyhow!("not expected to be called in this test"))
        }
    }

    #[tokio::test]
    async fn rate_cap_rejects_the_third_release_within_the_window() {
        let filter = Filter {
            id: 1,
            name: "rate cap".to_string(),
            enabled: true,
            max_downloads: Some(2),
            max_downloads_unit: Some(MaxDownloadsUnit::Hour),
            ..Filter::default()
        };
        let repository = Arc::new(CountingRepository {
            approvals: AtomicU32::new(0),
            filter,
        });
        let dispatcher = Arc::new(AcceptingDispatcher);
        let metadata = Arc::new(UnusedMetadataFetcher);
        let events = EventBus::new();
        let metrics = Metrics::new().expect("metrics registry");
        let mut stream = events.subscribe(None);

        let handle = spawn(
            test_registry(),
            Arc::clone(&repository),
            dispatcher,
            metadata,
            events,
            metrics,
            PipelineConfig {
                workers: 1,
                ..PipelineConfig::default()
            },
        );

        for name in ["Release.One", "Release.Two", "Release.Three"] {
            handle
                .sender()
                .send(test_announce_line(name))
                .await
                .expect("queue announce line");
        }

        let mut observed = Vec::new();
        for _ in 0..3 {
            let envelope = stream
                .next()
                .await
                .expect("event stream closed early")
                .expect("event stream lagged");
            observed.push(envelope.event);
        }
        handle.shutdown().await;

        assert!(matches!(observed[0], Event::PushApproved { ref torrent_name, .. } if torrent_name == "Release.One"));
        assert!(matches!(observed[1], Event::PushApproved { ref torrent_name, .. } if torrent_name == "Release.Two"));
        match &observed[2] {
            Event::PushRejected {
                torrent_name,
                reasons,
                ..
            } => {
                assert_eq!(torrent_name, "Release.Three");
                assert_eq!(reasons, &["max_downloads".to_string()]);
            }
            other => panic!("expected PushRejected, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unmatched_indexer_is_dropped_without_touching_the_repository() {
        struct PanicRepository;

        #[async_trait]
        impl Repository for PanicRepository {
            async fn list_filters_by_indexer(&self, _indexer: &str) -> anyhow::Result<Vec<Filter>> {
                panic!("repository should not be consulted for an unmatched indexer");
            }

            async fn count_downloads(&self, _filter_id: i64, _window: MaxDownloadsUnit) -> anyhow::Result<u32> {
                panic!("repository should not be consulted for an unmatched indexer");
            }

            async fn record_approved(&self, _release: &Release, _filter_id: i64) -> anyhow::Result<()> {
                panic!("repository should not be consulted for an unmatched indexer");
            }

            async fn known_episode(&self, _indexer: &str, _show: &str, _season: u32, _episode: u32) -> anyhow::Result<bool> {
                panic!("repository should not be consulted for an unmatched indexer");
            }
        }

        let events = EventBus::new();
        let metrics = Metrics::new().expect("metrics registry");
        let mut stream = events.subscribe(None);

        let handle = spawn(
            test_registry(),
            Arc::new(PanicRepository),
            Arc::new(AcceptingDispatcher),
            Arc::new(UnusedMetadataFetcher),
            events,
            metrics,
            PipelineConfig {
                workers: 1,
                ..PipelineConfig::default()
            },
        );

        let mut unknown = test_announce_line("Release.Unknown");
        unknown.announcer = "Someone-Else".to_string();
        handle.sender().send(unknown).await.expect("queue announce line");

        // Nothing should ever be published for a line that never resolves to
        // an indexer; confirm no event arrives before shutdown completes.
        handle.shutdown().await;
        assert!(
            tokio::time::timeout(Duration::from_millis(50), stream.next())
                .await
                .is_err(),
            "expected no events for an unmatched announce line"
        );
    }
}
