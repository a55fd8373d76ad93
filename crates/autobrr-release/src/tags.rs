//! `ParseReleaseTags`: folds the pipe/slash-separated release-tags tail into a release.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::model::Release;

static PERCENT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d{1,3})%$").expect("percent regex"));

fn split_tags(raw: &str) -> Vec<String> {
    raw.split(['|', '/'])
        .map(|token| token.trim().trim_end_matches('!').trim().to_string())
        .filter(|token| !token.is_empty())
        .collect()
}

fn has_tag(tokens: &[String], name: &str) -> bool {
    tokens.iter().any(|token| token.eq_ignore_ascii_case(name))
}

const CONTAINERS: [&str; 4] = ["mkv", "mp4", "avi", "ts"];
const VIDEO_SOURCES: [&str; 2] = ["WEB-DL", "WEBRip"];
const MUSIC_SOURCES: [&str; 4] = ["CD", "Vinyl", "Cassette", "WEB"];
const MUSIC_FORMATS_IN_PRIORITY_ORDER: [&str; 5] = ["FLAC", "MP3", "320", "V0", "24bit Lossless"];

/// Merge a release-tags tail (e.g. `"MP4 | 2160p | WEB-DL | Freeleech!"`) into `release`.
///
/// Also raises `FreeleechPercent` into `Freeleech`/`Bonus` per the invariant in
/// the data model: 100% sets `Freeleech=true` and `Bonus=["Freeleech"]`; a
/// quarter-step percentage (25/50/75) sets `Bonus=["Freeleech","FreeleechNN"]`.
pub fn parse_release_tags(release: &mut Release, raw: &str) {
    release.release_tags = raw.to_string();
    let tokens = split_tags(raw);
    if tokens.is_empty() {
        return;
    }

    for container in CONTAINERS {
        if has_tag(&tokens, container) {
            release.container = Some(container.to_string());
            break;
        }
    }

    for source in VIDEO_SOURCES {
        if has_tag(&tokens, source) {
            release.source = Some(source.to_string());
            break;
        }
    }
    if release.source.is_none() {
        for source in MUSIC_SOURCES {
            if has_tag(&tokens, source) {
                release.source = Some(source.to_string());
                break;
            }
        }
    }

    // Music predicate flags are checked in a fixed order (not the order the
    // tags happened to arrive in), matching the worked example in the
    // testable-properties scenario: Cue, then recognised music formats, then
    // plain Lossless, then the Log-score pair.
    if has_tag(&tokens, "Cue") {
        Release::push_unique(&mut release.audio, "Cue");
    }

    for format in MUSIC_FORMATS_IN_PRIORITY_ORDER {
        if has_tag(&tokens, format) {
            Release::push_unique(&mut release.audio, format);
        }
    }

    if has_tag(&tokens, "Lossless") {
        Release::push_unique(&mut release.audio, "Lossless");
    }

    let percent_token = tokens.iter().find_map(|token| {
        PERCENT_RE
            .captures(token)
            .and_then(|captures| captures[1].parse::<u8>().ok())
    });

    if has_tag(&tokens, "Log") {
        if let Some(score) = percent_token {
            release.log_score = score.min(100);
            Release::push_unique(&mut release.audio, format!("Log{score}"));
        }
        Release::push_unique(&mut release.audio, "Log");
    }

    if let Some(percent) = percent_token {
        release.apply_freeleech_percent(percent);
    } else if has_tag(&tokens, "Freeleech") {
        release.apply_freeleech_percent(100);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Implementation;

    fn tagged(tags: &str) -> Release {
        let mut release = Release::new("test", Implementation::Irc);
        parse_release_tags(&mut release, tags);
        release
    }

    #[test]
    fn servant_release_tags_scenario() {
        let release = tagged("MP4 | 2160p | WEB-DL | Freeleech!");
        assert_eq!(release.container.as_deref(), Some("mp4"));
        assert!(release.freeleech);
        assert_eq!(release.bonus, vec!["Freeleech".to_string()]);
    }

    #[test]
    fn music_tags_scenario() {
        let release = tagged("FLAC / Lossless / Log / 100% / Cue / CD");
        assert_eq!(release.source.as_deref(), Some("CD"));
        assert_eq!(
            release.audio,
            vec![
                "Cue".to_string(),
                "FLAC".to_string(),
                "Lossless".to_string(),
                "Log100".to_string(),
                "Log".to_string(),
            ]
        );
        assert_eq!(release.log_score, 100);
    }

    #[test]
    fn quarter_freeleech_sets_both_bonus_labels() {
        let release = tagged("50%");
        assert!(!release.freeleech);
        assert_eq!(release.freeleech_percent, 50);
        assert_eq!(
            release.bonus,
            vec!["Freeleech".to_string(), "Freeleech50".to_string()]
        );
    }

    #[test]
    fn empty_tags_are_a_no_op() {
        let release = tagged("");
        assert!(release.audio.is_empty());
        assert!(!release.freeleech);
    }
}
