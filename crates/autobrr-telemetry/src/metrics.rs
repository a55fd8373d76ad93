//! Prometheus-backed metrics registry and snapshot helpers.
//!
//! # Design
//! - Encapsulates collector registration to keep the public API small.
//! - Exposes counters/gauges for the announce→release pipeline and IRC sessions.

use std::convert::TryFrom;
use std::time::Duration;

use anyhow::{Context, Result};
use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use serde::Serialize;

/// Prometheus-backed metrics registry shared across services.
#[derive(Clone)]
pub struct Metrics {
    inner: std::sync::Arc<MetricsInner>,
}

struct MetricsInner {
    registry: Registry,
    announces_received_total: IntCounterVec,
    announces_parsed_total: IntCounterVec,
    announces_dropped_total: IntCounterVec,
    filter_matched_total: IntCounterVec,
    filter_rejected_total: IntCounterVec,
    rate_cap_rejections_total: IntCounter,
    releases_approved_total: IntCounter,
    irc_state_transitions_total: IntCounterVec,
    irc_reconnects_total: IntCounterVec,
    pipeline_queue_depth: IntGauge,
    config_watch_latency_ms: IntGauge,
    config_apply_latency_ms: IntGauge,
    config_update_failures_total: IntCounter,
}

/// Snapshot of selected gauges and counters for health reporting.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    /// Current depth of the pipeline's inbound announce queue.
    pub pipeline_queue_depth: i64,
    /// Latest latency (ms) when watching for configuration changes.
    pub config_watch_latency_ms: i64,
    /// Latest latency (ms) when applying configuration changes.
    pub config_apply_latency_ms: i64,
    /// Total count of configuration update failures observed.
    pub config_update_failures_total: u64,
    /// Total releases approved by the filter engine and rate cap.
    pub releases_approved_total: u64,
    /// Total releases rejected for exceeding a filter's download cap.
    pub rate_cap_rejections_total: u64,
}

impl Metrics {
    /// Construct a new metrics registry with the standard collectors registered.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the Prometheus collectors cannot be
    /// registered.
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let announces_received_total = IntCounterVec::new(
            Opts::new(
                "announces_received_total",
                "Announce lines received per indexer",
            ),
            &["indexer"],
        )?;
        let announces_parsed_total = IntCounterVec::new(
            Opts::new(
                "announces_parsed_total",
                "Announce lines successfully parsed into a release per indexer",
            ),
            &["indexer"],
        )?;
        let announces_dropped_total = IntCounterVec::new(
            Opts::new(
                "announces_dropped_total",
                "Announce lines dropped before producing a release, by reason",
            ),
            &["reason"],
        )?;
        let filter_matched_total = IntCounterVec::new(
            Opts::new(
                "filter_matched_total",
                "Releases that matched a filter, by filter id",
            ),
            &["filter_id"],
        )?;
        let filter_rejected_total = IntCounterVec::new(
            Opts::new(
                "filter_rejected_total",
                "Rejections recorded against a filter, by rejection reason",
            ),
            &["reason"],
        )?;
        let rate_cap_rejections_total = IntCounter::with_opts(Opts::new(
            "rate_cap_rejections_total",
            "Releases rejected for exceeding a filter's max-downloads window",
        ))?;
        let releases_approved_total = IntCounter::with_opts(Opts::new(
            "releases_approved_total",
            "Releases approved and handed to the action dispatcher",
        ))?;
        let irc_state_transitions_total = IntCounterVec::new(
            Opts::new(
                "irc_state_transitions_total",
                "IRC session state machine transitions, by target state",
            ),
            &["network", "state"],
        )?;
        let irc_reconnects_total = IntCounterVec::new(
            Opts::new(
                "irc_reconnects_total",
                "IRC session reconnect attempts, by network",
            ),
            &["network"],
        )?;
        let pipeline_queue_depth = IntGauge::with_opts(Opts::new(
            "pipeline_queue_depth",
            "Depth of the pipeline's bounded inbound announce queue",
        ))?;
        let config_watch_latency_ms = IntGauge::with_opts(Opts::new(
            "config_watch_latency_ms",
            "Time spent waiting for configuration updates (ms)",
        ))?;
        let config_apply_latency_ms = IntGauge::with_opts(Opts::new(
            "config_apply_latency_ms",
            "Time taken to apply configuration updates (ms)",
        ))?;
        let config_update_failures_total = IntCounter::with_opts(Opts::new(
            "config_update_failures_total",
            "Configuration update failures",
        ))?;

        registry.register(Box::new(announces_received_total.clone()))?;
        registry.register(Box::new(announces_parsed_total.clone()))?;
        registry.register(Box::new(announces_dropped_total.clone()))?;
        registry.register(Box::new(filter_matched_total.clone()))?;
        registry.register(Box::new(filter_rejected_total.clone()))?;
        registry.register(Box::new(rate_cap_rejections_total.clone()))?;
        registry.register(Box::new(releases_approved_total.clone()))?;
        registry.register(Box::new(irc_state_transitions_total.clone()))?;
        registry.register(Box::new(irc_reconnects_total.clone()))?;
        registry.register(Box::new(pipeline_queue_depth.clone()))?;
        registry.register(Box::new(config_watch_latency_ms.clone()))?;
        registry.register(Box::new(config_apply_latency_ms.clone()))?;
        registry.register(Box::new(config_update_failures_total.clone()))?;

        Ok(Self {
            inner: std::sync::Arc::new(MetricsInner {
                registry,
                announces_received_total,
                announces_parsed_total,
                announces_dropped_total,
                filter_matched_total,
                filter_rejected_total,
                rate_cap_rejections_total,
                releases_approved_total,
                irc_state_transitions_total,
                irc_reconnects_total,
                pipeline_queue_depth,
                config_watch_latency_ms,
                config_apply_latency_ms,
                config_update_failures_total,
            }),
        })
    }

    /// Increment the announce-received counter for an indexer.
    pub fn inc_announce_received(&self, indexer: &str) {
        self.inner
            .announces_received_total
            .with_label_values(&[indexer])
            .inc();
    }

    /// Increment the announce-parsed counter for an indexer.
    pub fn inc_announce_parsed(&self, indexer: &str) {
        self.inner
            .announces_parsed_total
            .with_label_values(&[indexer])
            .inc();
    }

    /// Increment the announce-dropped counter for a drop reason.
    pub fn inc_announce_dropped(&self, reason: &str) {
        self.inner
            .announces_dropped_total
            .with_label_values(&[reason])
            .inc();
    }

    /// Increment the filter-matched counter for a filter id.
    pub fn inc_filter_matched(&self, filter_id: &str) {
        self.inner
            .filter_matched_total
            .with_label_values(&[filter_id])
            .inc();
    }

    /// Increment the filter-rejected counter for a rejection reason.
    pub fn inc_filter_rejected(&self, reason: &str) {
        self.inner
            .filter_rejected_total
            .with_label_values(&[reason])
            .inc();
    }

    /// Increment the rate-cap rejection counter.
    pub fn inc_rate_cap_rejection(&self) {
        self.inner.rate_cap_rejections_total.inc();
    }

    /// Increment the approved-release counter.
    pub fn inc_release_approved(&self) {
        self.inner.releases_approved_total.inc();
    }

    /// Increment the IRC state-transition counter for a network/state pair.
    pub fn inc_irc_state_transition(&self, network: &str, state: &str) {
        self.inner
            .irc_state_transitions_total
            .with_label_values(&[network, state])
            .inc();
    }

    /// Increment the IRC reconnect counter for a network.
    pub fn inc_irc_reconnect(&self, network: &str) {
        self.inner
            .irc_reconnects_total
            .with_label_values(&[network])
            .inc();
    }

    /// Set the pipeline inbound-queue depth gauge.
    pub fn set_pipeline_queue_depth(&self, depth: i64) {
        self.inner.pipeline_queue_depth.set(depth);
    }

    /// Record the observed latency while waiting for configuration updates.
    pub fn observe_config_watch_latency(&self, duration: Duration) {
        self.inner
            .config_watch_latency_ms
            .set(Self::duration_to_ms(duration));
    }

    /// Record the observed latency for applying configuration updates.
    pub fn observe_config_apply_latency(&self, duration: Duration) {
        self.inner
            .config_apply_latency_ms
            .set(Self::duration_to_ms(duration));
    }

    /// Increment the configuration update failure counter.
    pub fn inc_config_update_failure(&self) {
        self.inner.config_update_failures_total.inc();
    }

    /// Render the metrics registry using the Prometheus text exposition format.
    ///
    /// # Errors
    ///
    /// Returns an error if the metrics cannot be encoded or if the encoded
    /// buffer is not valid UTF-8.
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .context("failed to encode Prometheus metrics")?;
        String::from_utf8(buffer).context("metrics output was not valid UTF-8")
    }

    /// Take a point-in-time snapshot of the most relevant gauges and counters.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            pipeline_queue_depth: self.inner.pipeline_queue_depth.get(),
            config_watch_latency_ms: self.inner.config_watch_latency_ms.get(),
            config_apply_latency_ms: self.inner.config_apply_latency_ms.get(),
            config_update_failures_total: self.inner.config_update_failures_total.get(),
            releases_approved_total: self.inner.releases_approved_total.get(),
            rate_cap_rejections_total: self.inner.rate_cap_rejections_total.get(),
        }
    }

    /// Convert a duration to milliseconds saturating at `i64::MAX`.
    pub(crate) fn duration_to_ms(duration: Duration) -> i64 {
        i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn duration_to_ms_saturates_on_large_values() {
        let duration = Duration::from_secs(u64::MAX / 2);
        assert_eq!(Metrics::duration_to_ms(duration), i64::MAX);
    }

    #[test]
    fn metrics_snapshot_reflects_updates() -> Result<()> {
        let metrics = Metrics::new()?;
        metrics.inc_announce_received("ptp");
        metrics.inc_announce_parsed("ptp");
        metrics.inc_announce_dropped("no_definition");
        metrics.inc_filter_matched("7");
        metrics.inc_filter_rejected("resolution");
        metrics.inc_rate_cap_rejection();
        metrics.inc_release_approved();
        metrics.inc_irc_state_transition("ptp", "ready");
        metrics.inc_irc_reconnect("ptp");
        metrics.set_pipeline_queue_depth(3);
        metrics.observe_config_watch_latency(Duration::from_millis(120));
        metrics.observe_config_apply_latency(Duration::from_millis(45));
        metrics.inc_config_update_failure();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.pipeline_queue_depth, 3);
        assert_eq!(snapshot.config_watch_latency_ms, 120);
        assert_eq!(snapshot.config_apply_latency_ms, 45);
        assert_eq!(snapshot.config_update_failures_total, 1);
        assert_eq!(snapshot.releases_approved_total, 1);
        assert_eq!(snapshot.rate_cap_rejections_total, 1);

        let rendered = metrics.render()?;
        assert!(rendered.contains("announces_parsed_total"));
        assert!(rendered.contains("filter_rejected_total"));
        assert!(rendered.contains("irc_state_transitions_total"));
        Ok(())
    }
}
