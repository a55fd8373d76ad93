//! Compiles [`Filter`]s and matches a [`Release`] against an ordered set of them.

use std::collections::BTreeMap;

use autobrr_release::{Origin, Release};
use tracing::debug;

use crate::error::FilterResult;
use crate::model::{Filter, TagsMatchLogic};
use crate::range::RangeExpr;
use crate::text::TextMatcher;

/// A filter with every pattern/range/size field pre-compiled, ready for
/// repeated matching without recompilation (`spec.md` §9 "regex
/// pre-compilation").
pub struct CompiledFilter {
    /// The raw, user-configured filter this was compiled from.
    pub filter: Filter,
    min_size: Option<u64>,
    max_size: Option<u64>,
    match_releases: TextMatcher,
    except_releases: TextMatcher,
    match_release_groups: TextMatcher,
    except_release_groups: TextMatcher,
    match_release_tags: TextMatcher,
    except_release_tags: TextMatcher,
    freeleech_percent: Option<RangeExpr>,
    seasons: Option<RangeExpr>,
    episodes: Option<RangeExpr>,
    years: Option<RangeExpr>,
    log_score: Option<RangeExpr>,
    shows: Option<RangeExpr>,
}

/// Reports whether a deferred size check is still owed once the action
/// stage can enrich the release with a real `Size` (`spec.md` §4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeOutcome {
    /// Whether the size predicate currently passes (vacuously true when deferred).
    pub passes: bool,
    /// Whether the size predicate must be re-run once `Size` is known.
    pub additional_check_required: bool,
}

impl CompiledFilter {
    /// Compile a [`Filter`], pre-parsing every pattern, range, and size bound.
    ///
    /// # Errors
    ///
    /// Returns an error if any text-match pattern, range expression, or
    /// size bound fails to compile or parse.
    pub fn compile(filter: Filter) -> FilterResult<Self> {
        let id = filter.id;
        let min_size = filter
            .min_size
            .as_deref()
            .map(|raw| parse_size_field(id, "min_size", raw))
            .transpose()?;
        let max_size = filter
            .max_size
            .as_deref()
            .map(|raw| parse_size_field(id, "max_size", raw))
            .transpose()?;

        let match_releases = TextMatcher::compile(id, "match_releases", &filter.match_releases, filter.use_regex)?;
        let except_releases = TextMatcher::compile(id, "except_releases", &filter.except_releases, filter.use_regex)?;
        let match_release_groups = TextMatcher::compile(
            id,
            "match_release_groups",
            &filter.match_release_groups,
            filter.use_regex,
        )?;
        let except_release_groups = TextMatcher::compile(
            id,
            "except_release_groups",
            &filter.except_release_groups,
            filter.use_regex,
        )?;
        let match_release_tags = TextMatcher::compile(
            id,
            "match_release_tags",
            &filter.match_release_tags,
            filter.use_regex_release_tags,
        )?;
        let except_release_tags = TextMatcher::compile(
            id,
            "except_release_tags",
            &filter.except_release_tags,
            filter.use_regex_release_tags,
        )?;

        let freeleech_percent = filter
            .freeleech_percent
            .as_deref()
            .map(|raw| RangeExpr::parse(id, "freeleech_percent", raw))
            .transpose()?;
        let shows = filter
            .shows
            .as_deref()
            .map(|raw| RangeExpr::parse(id, "shows", raw))
            .transpose()?;
        let seasons = filter
            .seasons
            .as_deref()
            .map(|raw| RangeExpr::parse(id, "seasons", raw))
            .transpose()?;
        let episodes = filter
            .episodes
            .as_deref()
            .map(|raw| RangeExpr::parse(id, "episodes", raw))
            .transpose()?;
        let years = filter
            .years
            .as_deref()
            .map(|raw| RangeExpr::parse(id, "years", raw))
            .transpose()?;
        let log_score = filter
            .log_score
            .as_deref()
            .map(|raw| RangeExpr::parse(id, "log_score", raw))
            .transpose()?;

        Ok(Self {
            filter,
            min_size,
            max_size,
            match_releases,
            except_releases,
            match_release_groups,
            except_release_groups,
            match_release_tags,
            except_release_tags,
            freeleech_percent,
            seasons,
            episodes,
            years,
            log_score,
            shows,
        })
    }

    fn size_outcome(&self, release: &Release) -> SizeOutcome {
        if self.min_size.is_none() && self.max_size.is_none() {
            return SizeOutcome {
                passes: true,
                additional_check_required: false,
            };
        }
        if release.size == 0 {
            return SizeOutcome {
                passes: true,
                additional_check_required: true,
            };
        }
        let above_min = self.min_size.is_none_or(|min| release.size >= min);
        let below_max = self.max_size.is_none_or(|max| release.size <= max);
        SizeOutcome {
            passes: above_min && below_max,
            additional_check_required: false,
        }
    }

    /// Derived "perfect FLAC" predicate: a 100-point log score alongside a
    /// cue sheet. Not a first-class `Release` field; `Release` only
    /// carries the `Audio` set and `LogScore` the parser populates.
    fn is_perfect_flac(release: &Release) -> bool {
        release.log_score == 100 && release.has_audio_flag("Cue")
    }

    /// Collect every failing predicate's stable rejection code. Empty
    /// means the filter accepts the release (modulo a still-pending
    /// `AdditionalSizeCheckRequired`).
    #[allow(clippy::too_many_lines)]
    fn evaluate(&self, release: &Release, smart_episode_hit: bool) -> (Vec<String>, SizeOutcome) {
        let mut rejections = Vec::new();
        let f = &self.filter;

        let size = self.size_outcome(release);
        if !size.passes {
            rejections.push("size".to_string());
        }

        if !self.match_releases.is_empty() && !self.match_releases.is_match(&release.torrent_name) {
            rejections.push("match_releases".to_string());
        }
        if self.except_releases.is_match(&release.torrent_name) {
            rejections.push("except_releases".to_string());
        }

        let group = release.group.as_deref().unwrap_or_default();
        if !self.match_release_groups.is_empty() && !self.match_release_groups.is_match(group) {
            rejections.push("match_release_groups".to_string());
        }
        if self.except_release_groups.is_match(group) {
            rejections.push("except_release_groups".to_string());
        }

        if !self.match_release_tags.is_empty() && !self.match_release_tags.is_match(&release.release_tags) {
            rejections.push("match_release_tags".to_string());
        }
        if self.except_release_tags.is_match(&release.release_tags) {
            rejections.push("except_release_tags".to_string());
        }

        if let Some(want_scene) = f.scene {
            if want_scene != (release.origin == Origin::Scene) {
                rejections.push("scene".to_string());
            }
        }
        if let Some(want_freeleech) = f.freeleech {
            if want_freeleech != release.freeleech {
                rejections.push("freeleech".to_string());
            }
        }
        if let Some(range) = &self.freeleech_percent {
            if release.freeleech_percent > 0 && !range.contains(i64::from(release.freeleech_percent)) {
                rejections.push("freeleech_percent".to_string());
            }
        }
        if f.smart_episode && smart_episode_hit {
            rejections.push("smart_episode".to_string());
        }

        if let Some(range) = &self.shows {
            if !range.contains(i64::from(release.season)) {
                rejections.push("shows".to_string());
            }
        }
        if let Some(range) = &self.seasons {
            if !range.contains(i64::from(release.season)) {
                rejections.push("seasons".to_string());
            }
        }
        if let Some(range) = &self.episodes {
            if !range.contains(i64::from(release.episode)) {
                rejections.push("episodes".to_string());
            }
        }
        if let Some(range) = &self.years {
            if !range.contains(i64::from(release.year)) {
                rejections.push("years".to_string());
            }
        }

        if !scalar_matches(&f.resolutions, release.resolution.as_deref()) {
            rejections.push("resolution".to_string());
        }
        if !set_intersects(&f.codecs, &release.codec) {
            rejections.push("codec".to_string());
        }
        if !scalar_matches(&f.sources, release.source.as_deref()) {
            rejections.push("source".to_string());
        }
        if !scalar_matches(&f.containers, release.container.as_deref()) {
            rejections.push("container".to_string());
        }
        if !set_intersects(&f.match_hdr, &release.hdr) {
            rejections.push("match_hdr".to_string());
        }
        if set_intersects(&f.except_hdr, &release.hdr) {
            rejections.push("except_hdr".to_string());
        }
        if !set_intersects(&f.match_other, &release.other) {
            rejections.push("match_other".to_string());
        }
        if set_intersects(&f.except_other, &release.other) {
            rejections.push("except_other".to_string());
        }
        if !scalar_matches(&f.match_release_types, release.release_type.as_deref()) {
            rejections.push("match_release_types".to_string());
        }
        if !set_intersects(&f.formats, &release.audio) {
            rejections.push("formats".to_string());
        }
        if !set_intersects(&f.quality, &release.audio) {
            rejections.push("quality".to_string());
        }
        if !scalar_matches(&f.media, release.source.as_deref()) {
            rejections.push("media".to_string());
        }
        if !set_intersects(&f.match_language, &release.language) {
            rejections.push("match_language".to_string());
        }
        if set_intersects(&f.except_language, &release.language) {
            rejections.push("except_language".to_string());
        }
        if !scalar_matches(
            &f.origins,
            Some(origin_label(release.origin)),
        ) {
            rejections.push("origins".to_string());
        }
        if scalar_matches(&f.except_origins, Some(origin_label(release.origin))) && !f.except_origins.is_empty() {
            rejections.push("except_origins".to_string());
        }

        if !set_intersects(&f.artists, &release.artists) {
            rejections.push("artists".to_string());
        }
        if !f.albums.is_empty() && !scalar_matches(&f.albums, release.group.as_deref()) {
            rejections.push("albums".to_string());
        }
        if let Some(range) = &self.log_score {
            if !range.contains(i64::from(release.log_score)) {
                rejections.push("log_score".to_string());
            }
        }
        if let Some(want_log) = f.log {
            if want_log != release.has_audio_flag("Log") {
                rejections.push("log".to_string());
            }
        }
        if let Some(want_cue) = f.cue {
            if want_cue != release.has_audio_flag("Cue") {
                rejections.push("cue".to_string());
            }
        }
        if let Some(want_perfect) = f.perfect_flac {
            if want_perfect != Self::is_perfect_flac(release) {
                rejections.push("perfect_flac".to_string());
            }
        }

        let categories = combined_categories(release);
        if !set_intersects(&f.match_categories, &categories) {
            rejections.push("match_categories".to_string());
        }
        if set_intersects(&f.except_categories, &categories) {
            rejections.push("except_categories".to_string());
        }
        if !scalar_matches(&f.match_uploaders, release.uploader.as_deref()) {
            rejections.push("match_uploaders".to_string());
        }
        if scalar_matches(&f.except_uploaders, release.uploader.as_deref()) && !f.except_uploaders.is_empty() {
            rejections.push("except_uploaders".to_string());
        }

        if !tags_match(&f.tags, &release.tags, f.tags_match_logic) {
            rejections.push("tags".to_string());
        }
        if !f.except_tags.is_empty() && tags_match(&f.except_tags, &release.tags, f.except_tags_match_logic) {
            rejections.push("except_tags".to_string());
        }

        (rejections, size)
    }
}

fn parse_size_field(filter_id: i64, field: &'static str, raw: &str) -> FilterResult<u64> {
    autobrr_release::parse_size(raw, None).map_err(|source| crate::error::FilterError::InvalidSize {
        filter_id,
        field,
        value: raw.to_string(),
        source,
    })
}

/// `Categories` falls back to the singular `Category` when the set is empty,
/// since an announce typically populates only one of the two.
fn combined_categories(release: &Release) -> Vec<String> {
    if !release.categories.is_empty() {
        return release.categories.clone();
    }
    release.category.clone().into_iter().collect()
}

fn scalar_matches(terms: &[String], value: Option<&str>) -> bool {
    if terms.is_empty() {
        return true;
    }
    let Some(value) = value else { return false };
    terms.iter().any(|term| term.eq_ignore_ascii_case(value))
}

fn set_intersects(terms: &[String], set: &[String]) -> bool {
    if terms.is_empty() {
        return true;
    }
    terms
        .iter()
        .any(|term| set.iter().any(|value| value.eq_ignore_ascii_case(term)))
}

fn tags_match(terms: &[String], tags: &[String], logic: TagsMatchLogic) -> bool {
    if terms.is_empty() {
        return true;
    }
    match logic {
        TagsMatchLogic::Any => set_intersects(terms, tags),
        TagsMatchLogic::All => terms
            .iter()
            .all(|term| tags.iter().any(|tag| tag.eq_ignore_ascii_case(term))),
    }
}

const fn origin_label(origin: Origin) -> &'static str {
    match origin {
        Origin::Internal => "internal",
        Origin::Scene => "scene",
        Origin::P2P => "p2p",
    }
}

/// Outcome of [`match_release`]: the accepted filter (if any) plus every
/// candidate's rejection list, keyed by filter id.
pub struct MatchOutcome<'a> {
    /// The highest-priority filter with zero rejections, if one exists.
    pub matched: Option<&'a CompiledFilter>,
    /// Whether the match still owes a deferred size check.
    pub additional_size_check_required: bool,
    /// Every candidate's rejection codes, in the order candidates were evaluated.
    pub rejections: BTreeMap<i64, Vec<String>>,
}

/// Evaluate `release` against `candidates`, already scoped to the release's
/// indexer and to `Enabled=true`, in descending-priority/ascending-id order.
///
/// `smart_episode_hit` reports whether the pipeline's repository already
/// recorded this release's (show, season, episode) as grabbed; it is
/// consulted only by filters with `SmartEpisode` enabled.
#[must_use]
pub fn match_release<'a>(
    release: &Release,
    candidates: &'a [CompiledFilter],
    smart_episode_hit: bool,
) -> MatchOutcome<'a> {
    let mut ordered: Vec<&CompiledFilter> = candidates.iter().collect();
    ordered.sort_by(|a, b| b.filter.priority.cmp(&a.filter.priority).then(a.filter.id.cmp(&b.filter.id)));

    let mut rejections = BTreeMap::new();
    let mut matched = None;
    let mut additional_size_check_required = false;

    for filter in ordered {
        let (filter_rejections, size) = filter.evaluate(release, smart_episode_hit);
        if filter_rejections.is_empty() {
            debug!(filter_id = filter.filter.id, "release matched filter");
            matched = Some(filter);
            additional_size_check_required = size.additional_check_required;
            rejections.insert(filter.filter.id, filter_rejections);
            break;
        }
        rejections.insert(filter.filter.id, filter_rejections);
    }

    MatchOutcome {
        matched,
        additional_size_check_required,
        rejections,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use autobrr_release::Implementation;

    fn release(resolution: &str) -> Release {
        let mut release = Release::new("ptp", Implementation::Irc);
        release.resolution = Some(resolution.to_string());
        release
    }

    fn filter(id: i64, priority: i32, resolutions: &[&str]) -> CompiledFilter {
        let filter = Filter {
            id,
            name: format!("f{id}"),
            enabled: true,
            priority,
            resolutions: resolutions.iter().map(|s| (*s).to_string()).collect(),
            ..Filter::default()
        };
        CompiledFilter::compile(filter).unwrap()
    }

    #[test]
    fn descending_priority_picks_the_higher_one_when_both_match() {
        let release = release("2160p");
        let filters = vec![filter(1, 10, &["1080p", "2160p"]), filter(2, 5, &["2160p"])];
        let outcome = match_release(&release, &filters, false);
        assert_eq!(outcome.matched.unwrap().filter.id, 1);
    }

    #[test]
    fn rejection_scenario_five() {
        let release = release("2160p");
        let filters = vec![filter(1, 10, &["1080p"]), filter(2, 5, &["2160p"])];
        let outcome = match_release(&release, &filters, false);
        assert_eq!(outcome.matched.unwrap().filter.id, 2);
        assert_eq!(outcome.rejections.get(&1).unwrap(), &vec!["resolution".to_string()]);
    }

    #[test]
    fn no_candidates_match_returns_none_with_rejections_recorded() {
        let release = release("720p");
        let filters = vec![filter(1, 10, &["1080p"])];
        let outcome = match_release(&release, &filters, false);
        assert!(outcome.matched.is_none());
        assert!(!outcome.rejections.get(&1).unwrap().is_empty());
    }

    #[test]
    fn zero_size_defers_the_size_predicate() {
        let release = Release::new("ptp", Implementation::Irc);
        let filter = Filter {
            id: 1,
            enabled: true,
            min_size: Some("5GB".to_string()),
            ..Filter::default()
        };
        let compiled = CompiledFilter::compile(filter).unwrap();
        let outcome = match_release(&release, std::slice::from_ref(&compiled), false);
        assert!(outcome.matched.is_some());
        assert!(outcome.additional_size_check_required);
    }

    #[test]
    fn shows_range_rejects_a_season_outside_the_expression() {
        let mut release = Release::new("ptp", Implementation::Irc);
        release.season = 4;
        let filter = Filter {
            id: 1,
            enabled: true,
            shows: Some("1-3".to_string()),
            ..Filter::default()
        };
        let compiled = CompiledFilter::compile(filter).unwrap();
        let outcome = match_release(&release, std::slice::from_ref(&compiled), false);
        assert!(outcome.matched.is_none());
        assert_eq!(outcome.rejections.get(&1).unwrap(), &vec!["shows".to_string()]);
    }
}
