//! Event payload types carried across the platform.

use chrono::{DateTime, Utc};

/// Identifier assigned to each event emitted by the platform.
pub type EventId = u64;

/// Default buffer size for the in-memory replay ring.
pub const DEFAULT_REPLAY_CAPACITY: usize = 1_024;

/// Notification events emitted by the announce→release pipeline.
///
/// These are the events named in the notification event bus contract: an IRC
/// session reporting connectivity changes, and the pipeline reporting the
/// outcome of handing an approved release to the action dispatcher.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// An IRC session lost its connection (read/write failure, PONG timeout, kick).
    IrcDisconnected {
        /// Network identifier (`Indexer.Identifier.IRC.Network`) the session belongs to.
        network: String,
        /// Short, human-readable reason for the disconnect.
        reason: String,
    },
    /// An IRC session re-established `READY` state after a prior disconnect.
    IrcReconnected {
        /// Network identifier the session belongs to.
        network: String,
        /// Number of backoff attempts consumed before reconnecting.
        attempts: u32,
    },
    /// The action dispatcher accepted a release for downstream processing.
    PushApproved {
        /// Indexer identifier the release came from.
        indexer: String,
        /// Torrent name carried by the release.
        torrent_name: String,
        /// Identifier of the filter that matched.
        filter_id: i64,
    },
    /// The action dispatcher, or an earlier pipeline gate, rejected a release.
    PushRejected {
        /// Indexer identifier the release came from.
        indexer: String,
        /// Torrent name carried by the release.
        torrent_name: String,
        /// Identifier of the filter that was evaluated, if one reached rejection.
        filter_id: Option<i64>,
        /// Ordered, stable rejection reason codes.
        reasons: Vec<String>,
    },
    /// Submitting an approved release to the action dispatcher failed.
    PushError {
        /// Indexer identifier the release came from.
        indexer: String,
        /// Torrent name carried by the release.
        torrent_name: String,
        /// Human-readable error detail returned by the dispatcher.
        message: String,
    },
}

impl Event {
    /// Machine-friendly discriminator for log correlation and metrics labels.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::IrcDisconnected { .. } => "irc_disconnected",
            Self::IrcReconnected { .. } => "irc_reconnected",
            Self::PushApproved { .. } => "push_approved",
            Self::PushRejected { .. } => "push_rejected",
            Self::PushError { .. } => "push_error",
        }
    }
}

/// Metadata wrapper around events. Each envelope tracks the event id and emission timestamp.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct EventEnvelope {
    /// Monotonic identifier assigned to the wrapped event.
    pub id: EventId,
    /// Timestamp recording when the envelope was produced.
    pub timestamp: DateTime<Utc>,
    /// Wrapped event payload.
    pub event: Event,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_kind_maps_variants() {
        assert_event_kind(
            &Event::IrcDisconnected {
                network: "ptp".into(),
                reason: "pong timeout".into(),
            },
            "irc_disconnected",
        );
        assert_event_kind(
            &Event::IrcReconnected {
                network: "ptp".into(),
                attempts: 3,
            },
            "irc_reconnected",
        );
        assert_event_kind(
            &Event::PushApproved {
                indexer: "ptp".into(),
                torrent_name: "Servant.S01".into(),
                filter_id: 7,
            },
            "push_approved",
        );
        assert_event_kind(
            &Event::PushRejected {
                indexer: "ptp".into(),
                torrent_name: "Servant.S01".into(),
                filter_id: Some(7),
                reasons: vec!["max_downloads".into()],
            },
            "push_rejected",
        );
        assert_event_kind(
            &Event::PushError {
                indexer: "ptp".into(),
                torrent_name: "Servant.S01".into(),
                message: "timeout".into(),
            },
            "push_error",
        );
    }

    #[test]
    fn envelope_carries_fields() {
        let event = Event::IrcReconnected {
            network: "ptp".into(),
            attempts: 1,
        };
        let envelope = EventEnvelope {
            id: 42,
            timestamp: Utc::now(),
            event: event.clone(),
        };
        assert_eq!(envelope.id, 42);
        assert_eq!(envelope.event, event);
    }

    fn assert_event_kind(event: &Event, expected: &str) {
        assert_eq!(event.kind(), expected);
    }
}
