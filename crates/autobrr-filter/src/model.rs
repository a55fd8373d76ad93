//! The declarative, user-configured `Filter` and its enums.

use serde::{Deserialize, Serialize};

/// Rolling-window unit for `MaxDownloads`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaxDownloadsUnit {
    /// Per rolling hour.
    Hour,
    /// Per rolling day.
    Day,
    /// Per rolling week.
    Week,
    /// Per rolling month.
    Month,
    /// No reset; counts every approval the filter has ever recorded.
    Ever,
}

/// Whether a tag-set predicate requires every term to hit, or just one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TagsMatchLogic {
    /// At least one filter term must appear in the release's tags.
    #[default]
    Any,
    /// Every filter term must appear in the release's tags.
    All,
}

/// External script gate configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExternalScriptGate {
    /// Whether the gate is active.
    #[serde(default)]
    pub enabled: bool,
    /// Executable path.
    #[serde(default)]
    pub cmd: String,
    /// Arguments, templated against the release.
    #[serde(default)]
    pub args: Vec<String>,
    /// Exit status that counts as approval.
    #[serde(default)]
    pub expect_status: i32,
}

/// External webhook gate configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExternalWebhookGate {
    /// Whether the gate is active.
    #[serde(default)]
    pub enabled: bool,
    /// Target host/URL.
    #[serde(default)]
    pub host: String,
    /// Request body, templated against the release.
    #[serde(default)]
    pub data: String,
    /// HTTP status that counts as approval.
    #[serde(default)]
    pub expect_status: u16,
}

/// A user-defined set of predicates that accepts or rejects releases.
///
/// Field groups mirror the data model: identity, quantitative, text
/// predicates, boolean/enum predicates, scope ranges, enumerated sets, music
/// predicates, category/uploader, tag logic, indexer scoping, external gates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Filter {
    // Identity
    /// Stable identifier, also the tiebreaker for equal-priority ordering.
    pub id: i64,
    /// Human-readable name.
    pub name: String,
    /// Whether the filter is considered during matching at all.
    pub enabled: bool,
    /// Higher priority is evaluated first.
    pub priority: i32,

    // Quantitative
    /// Minimum acceptable size, as a byte-size string (e.g. `"5GB"`).
    #[serde(default)]
    pub min_size: Option<String>,
    /// Maximum acceptable size, as a byte-size string.
    #[serde(default)]
    pub max_size: Option<String>,
    /// Seconds to wait, once approved, before the action dispatcher is invoked.
    #[serde(default)]
    pub delay: u32,
    /// Maximum approvals per `max_downloads_unit` window; `None` means unlimited.
    #[serde(default)]
    pub max_downloads: Option<u32>,
    /// Window the `max_downloads` cap resets on.
    #[serde(default)]
    pub max_downloads_unit: Option<MaxDownloadsUnit>,

    // Text predicates
    /// Release names that must match (comma/newline list, glob or regex).
    #[serde(default)]
    pub match_releases: String,
    /// Release names that must not match.
    #[serde(default)]
    pub except_releases: String,
    /// Release groups that must match.
    #[serde(default)]
    pub match_release_groups: String,
    /// Release groups that must not match.
    #[serde(default)]
    pub except_release_groups: String,
    /// Raw release-tags terms that must match.
    #[serde(default)]
    pub match_release_tags: String,
    /// Raw release-tags terms that must not match.
    #[serde(default)]
    pub except_release_tags: String,
    /// Whether `match_releases`/`except_releases`/`match_release_groups`/`except_release_groups` are regex rather than glob.
    #[serde(default)]
    pub use_regex: bool,
    /// Whether `match_release_tags`/`except_release_tags` are regex rather than glob.
    #[serde(default)]
    pub use_regex_release_tags: bool,

    // Boolean/enum predicates
    /// Tri-state: require (or reject) a scene release.
    #[serde(default)]
    pub scene: Option<bool>,
    /// Tri-state: require (or reject) a freeleech release.
    #[serde(default)]
    pub freeleech: Option<bool>,
    /// Range expression over `FreeleechPercent`, applied only when the release's percent is nonzero.
    #[serde(default)]
    pub freeleech_percent: Option<String>,
    /// Reject releases for a (show, season, episode) already recorded as grabbed.
    #[serde(default)]
    pub smart_episode: bool,

    // Scope ranges
    /// Range expression over `Season`, scoping the filter to specific shows' seasons.
    #[serde(default)]
    pub shows: Option<String>,
    /// Range expression over `Season`.
    #[serde(default)]
    pub seasons: Option<String>,
    /// Range expression over `Episode`.
    #[serde(default)]
    pub episodes: Option<String>,
    /// Range expression over `Year`.
    #[serde(default)]
    pub years: Option<String>,

    // Enumerated sets
    /// Required resolutions (scalar, case-insensitive equality).
    #[serde(default)]
    pub resolutions: Vec<String>,
    /// Required codecs (set intersection).
    #[serde(default)]
    pub codecs: Vec<String>,
    /// Required sources (scalar equality).
    #[serde(default)]
    pub sources: Vec<String>,
    /// Required containers (scalar equality).
    #[serde(default)]
    pub containers: Vec<String>,
    /// Required HDR tokens (set intersection).
    #[serde(default)]
    pub match_hdr: Vec<String>,
    /// Forbidden HDR tokens.
    #[serde(default)]
    pub except_hdr: Vec<String>,
    /// Required `Other` tokens (set intersection).
    #[serde(default)]
    pub match_other: Vec<String>,
    /// Forbidden `Other` tokens.
    #[serde(default)]
    pub except_other: Vec<String>,
    /// Required music release types (scalar equality against `release_type`).
    #[serde(default)]
    pub match_release_types: Vec<String>,
    /// Required music formats (set intersection against `Audio`).
    #[serde(default)]
    pub formats: Vec<String>,
    /// Required quality tokens (set intersection against `Audio`).
    #[serde(default)]
    pub quality: Vec<String>,
    /// Required media/source tokens for music (scalar equality against `Source`).
    #[serde(default)]
    pub media: Vec<String>,
    /// Required languages (set intersection).
    #[serde(default)]
    pub match_language: Vec<String>,
    /// Forbidden languages.
    #[serde(default)]
    pub except_language: Vec<String>,
    /// Required origins (scalar equality).
    #[serde(default)]
    pub origins: Vec<String>,
    /// Forbidden origins.
    #[serde(default)]
    pub except_origins: Vec<String>,

    // Music predicates
    /// Required artists, matched against `Artists` (set intersection, case-insensitive).
    #[serde(default)]
    pub artists: Vec<String>,
    /// Required albums, matched against `Group` (case-insensitive).
    #[serde(default)]
    pub albums: Vec<String>,
    /// Range expression over `LogScore`.
    #[serde(default)]
    pub log_score: Option<String>,
    /// Tri-state: require (or reject) a `Log` tag.
    #[serde(default)]
    pub log: Option<bool>,
    /// Tri-state: require (or reject) a `Cue` tag.
    #[serde(default)]
    pub cue: Option<bool>,
    /// Tri-state: require (or reject) a 100-score log plus cue ("perfect FLAC").
    #[serde(default)]
    pub perfect_flac: Option<bool>,

    // Category/uploader
    /// Required categories (set intersection against `Categories`).
    #[serde(default)]
    pub match_categories: Vec<String>,
    /// Forbidden categories.
    #[serde(default)]
    pub except_categories: Vec<String>,
    /// Required uploaders (scalar equality).
    #[serde(default)]
    pub match_uploaders: Vec<String>,
    /// Forbidden uploaders.
    #[serde(default)]
    pub except_uploaders: Vec<String>,

    // Tag logic
    /// Required tags.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Forbidden tags.
    #[serde(default)]
    pub except_tags: Vec<String>,
    /// Whether `tags` requires ANY or ALL terms present.
    #[serde(default)]
    pub tags_match_logic: TagsMatchLogic,
    /// Whether `except_tags` requires ANY or ALL terms present.
    #[serde(default)]
    pub except_tags_match_logic: TagsMatchLogic,

    // Indexer scoping
    /// Indexer identifiers this filter is attached to. The caller is
    /// responsible for pre-scoping `candidateFilters` to the release's
    /// indexer before calling [`crate::engine::match_release`]; this field
    /// is carried for the repository layer, not re-checked by the engine.
    #[serde(default)]
    pub indexers: Vec<String>,

    // External gates
    /// External script veto gate.
    #[serde(default)]
    pub external_script: ExternalScriptGate,
    /// External webhook veto gate.
    #[serde(default)]
    pub external_webhook: ExternalWebhookGate,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_filter_is_disabled_and_unscoped() {
        let filter = Filter::default();
        assert!(!filter.enabled);
        assert!(filter.indexers.is_empty());
        assert_eq!(filter.tags_match_logic, TagsMatchLogic::Any);
    }
}
