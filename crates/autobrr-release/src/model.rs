//! The `Release` value object: the central type of the announce→release pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where an approved/rejected release stands in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterStatus {
    /// Constructed, not yet run through the filter engine.
    Pending,
    /// Filter engine has evaluated the release.
    Filtered,
    /// A filter accepted the release.
    FilterApproved,
    /// Every candidate filter rejected the release.
    FilterRejected,
}

/// Download transport the release targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Protocol {
    /// BitTorrent.
    Torrent,
    /// Usenet (NZB).
    Usenet,
}

/// How the announce reached the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Implementation {
    /// IRC announce channel (the only implementation this core builds).
    Irc,
    /// RSS feed poller (external collaborator).
    Rss,
    /// Torznab feed (external collaborator).
    Torznab,
    /// Newznab feed (external collaborator).
    Newznab,
}

/// Provenance of the release relative to the scene/P2P ecosystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    /// Produced by the tracker itself (internal encode).
    Internal,
    /// A scene release.
    Scene,
    /// A non-scene peer-to-peer release.
    P2P,
}

/// A parsed, structured view of one announce line.
///
/// Field groups mirror the data model: identity, parsed (derived from the
/// torrent name and release tags), announce-supplied (captured directly from
/// the announce line), and pipeline state (mutated by the filter engine and
/// coordinator).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Release {
    // Identity
    /// Identifier of the indexer (tracker) this release came from.
    pub indexer: String,
    /// Raw torrent/release name as announced.
    pub torrent_name: String,
    /// URL to fetch the `.torrent`/NZB payload.
    pub torrent_url: String,
    /// URL to the tracker's info/details page.
    pub info_url: String,
    /// Info-hash, when the announce carries one directly.
    pub torrent_hash: Option<String>,
    /// Tracker-assigned torrent identifier.
    pub torrent_id: Option<String>,
    /// Release-group identifier used to correlate multi-part announces.
    pub group_id: Option<String>,

    // Parsed
    /// Inferred release title.
    pub title: String,
    /// Inferred year, or 0 when absent/out of range.
    pub year: u16,
    /// Inferred season number, 0 when absent.
    pub season: u32,
    /// Inferred episode number, 0 when absent.
    pub episode: u32,
    /// Inferred resolution token (e.g. `"1080p"`).
    pub resolution: Option<String>,
    /// Inferred source token (e.g. `"WEB-DL"`).
    pub source: Option<String>,
    /// Inferred codec tokens, insertion-ordered and deduplicated.
    pub codec: Vec<String>,
    /// Inferred container (e.g. `"mkv"`).
    pub container: Option<String>,
    /// Inferred HDR tokens, insertion-ordered and deduplicated.
    pub hdr: Vec<String>,
    /// Inferred audio tokens, insertion-ordered and deduplicated.
    pub audio: Vec<String>,
    /// Inferred audio channel layout (e.g. `"5.1"`).
    pub audio_channels: Option<String>,
    /// Inferred release group.
    pub group: Option<String>,
    /// Inferred language tokens.
    pub language: Vec<String>,
    /// Other inferred tokens (`REMUX`, `HYBRID`, …).
    pub other: Vec<String>,
    /// Whether the name carries a `PROPER` tag.
    pub proper: bool,
    /// Whether the name carries a `REPACK` tag.
    pub repack: bool,
    /// Inferred source website, when present.
    pub website: Option<String>,

    // Announce-supplied
    /// Tracker category label.
    pub category: Option<String>,
    /// Tracker category labels, when more than one applies.
    pub categories: Vec<String>,
    /// Uploader/scene-group as reported by the tracker.
    pub uploader: Option<String>,
    /// Size in bytes.
    pub size: u64,
    /// Tracker-assigned tags.
    pub tags: Vec<String>,
    /// Raw release-tags tail as announced (before [`crate::tags::parse_release_tags`]).
    pub release_tags: String,
    /// Whether the release is fully freeleech.
    pub freeleech: bool,
    /// Freeleech percentage in `[0, 100]`.
    pub freeleech_percent: u8,
    /// Bonus point labels (`"Freeleech"`, `"Freeleech50"`, …).
    pub bonus: Vec<String>,
    /// Provenance relative to scene/P2P.
    pub origin: Origin,
    /// Music release type (`Album`, `EP`, …), when applicable.
    pub release_type: Option<String>,
    /// Music artists, when applicable.
    pub artists: Vec<String>,
    /// Log score in `[0, 100]`, when applicable.
    pub log_score: u8,

    // Pipeline state
    /// Current filter-engine status.
    pub filter_status: FilterStatus,
    /// Ordered, human-readable rejection reasons.
    pub rejections: Vec<String>,
    /// Identifier of the filter that approved the release, if any.
    pub filter_id: Option<i64>,
    /// Download transport.
    pub protocol: Protocol,
    /// Announce transport.
    pub implementation: Implementation,
    /// When the announce was observed.
    pub timestamp: DateTime<Utc>,
}

impl Release {
    /// Construct a release with the minimal identity fields populated and
    /// every other field at its zero value, ready for [`crate::parser::parse_string`],
    /// [`crate::tags::parse_release_tags`], and [`crate::vars::map_vars`].
    #[must_use]
    pub fn new(indexer: impl Into<String>, implementation: Implementation) -> Self {
        Self {
            indexer: indexer.into(),
            torrent_name: String::new(),
            torrent_url: String::new(),
            info_url: String::new(),
            torrent_hash: None,
            torrent_id: None,
            group_id: None,
            title: String::new(),
            year: 0,
            season: 0,
            episode: 0,
            resolution: None,
            source: None,
            codec: Vec::new(),
            container: None,
            hdr: Vec::new(),
            audio: Vec::new(),
            audio_channels: None,
            group: None,
            language: Vec::new(),
            other: Vec::new(),
            proper: false,
            repack: false,
            website: None,
            category: None,
            categories: Vec::new(),
            uploader: None,
            size: 0,
            tags: Vec::new(),
            release_tags: String::new(),
            freeleech: false,
            freeleech_percent: 0,
            bonus: Vec::new(),
            origin: Origin::P2P,
            release_type: None,
            artists: Vec::new(),
            log_score: 0,
            filter_status: FilterStatus::Pending,
            rejections: Vec::new(),
            filter_id: None,
            protocol: Protocol::Torrent,
            implementation,
            timestamp: Utc::now(),
        }
    }

    /// Whether the release's audio/other tags carry a given music flag
    /// (`"Log"`, `"Cue"`, `"PerfectFlac"`), used by the filter engine's
    /// tri-state music predicates. These are not first-class `Release`
    /// fields; they are derived from the `Audio` set populated by
    /// [`crate::tags::parse_release_tags`].
    #[must_use]
    pub fn has_audio_flag(&self, flag: &str) -> bool {
        self.audio.iter().any(|token| token.eq_ignore_ascii_case(flag))
    }

    /// Push a deduplicated, insertion-ordered token onto a string set field.
    pub(crate) fn push_unique(set: &mut Vec<String>, value: impl Into<String>) {
        let value = value.into();
        if !set.iter().any(|existing| existing.eq_ignore_ascii_case(&value)) {
            set.push(value);
        }
    }

    /// Apply a freeleech percentage, raising `Freeleech`/`Bonus` per the
    /// data-model invariant: 100% sets `Freeleech=true` and
    /// `Bonus=["Freeleech"]`; a quarter-step (25/50/75) sets
    /// `Bonus=["Freeleech","FreeleechNN"]`.
    pub(crate) fn apply_freeleech_percent(&mut self, percent: u8) {
        let percent = percent.min(100);
        self.freeleech_percent = percent;
        match percent {
            100 => {
                self.freeleech = true;
                Self::push_unique(&mut self.bonus, "Freeleech");
            }
            25 | 50 | 75 => {
                Self::push_unique(&mut self.bonus, "Freeleech");
                Self::push_unique(&mut self.bonus, format!("Freeleech{percent}"));
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_release_has_zero_valued_parsed_fields() {
        let release = Release::new("ptp", Implementation::Irc);
        assert_eq!(release.year, 0);
        assert_eq!(release.season, 0);
        assert_eq!(release.episode, 0);
        assert_eq!(release.filter_status, FilterStatus::Pending);
        assert_eq!(release.protocol, Protocol::Torrent);
    }

    #[test]
    fn has_audio_flag_is_case_insensitive() {
        let mut release = Release::new("redacted", Implementation::Irc);
        release.audio.push("Log".to_string());
        assert!(release.has_audio_flag("log"));
        assert!(!release.has_audio_flag("cue"));
    }
}
