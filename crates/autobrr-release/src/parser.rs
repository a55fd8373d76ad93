//! `ParseString`: infers structured fields from a bare torrent/release name.
//!
//! Never fails — unrecognised tokens are silently ignored, per the contract
//! in the component design. Parsing proceeds by regex extraction rather than
//! delimiter tokenisation, since canonical tokens themselves carry internal
//! dots and hyphens (`H.264`, `DTS-HD.MA`, `WEB-DL`) that a naive split would
//! break apart.

use chrono::Datelike;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::model::Release;

static BRACKET_GROUP_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\[([^\]]+)\]").expect("bracket group regex is valid")
});
static RESOLUTION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(480p|576p|720p|1080i|1080p|2160p|4320p)\b").expect("resolution regex")
});
static SOURCE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(WEB-DL|WEBRip|UHD\.BluRay|BluRay|HDTV|DVDRip)\b").expect("source regex")
});
static CODEC_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(HEVC|H\.265|H265|x265|H\.264|x264|AV1|VC-1|MPEG-2|AVC)\b")
        .expect("codec regex")
});
static HDR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(HDR10\+|HDR10|HDR|DV|DoVi|Dolby\.Vision)\b").expect("hdr regex")
});
static AUDIO_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(DDP|DD\+|TrueHD|Atmos|DTS-HD\.MA|DTS|AC3|AAC)\b").expect("audio regex")
});
static CHANNELS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b([0-9])\.([0-9])\b").expect("channels regex"));
static SEASON_EPISODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bS(\d{1,2})E(\d{1,3})\b").expect("season+episode regex"));
static SEASON_ONLY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bS(\d{1,2})\b").expect("season-only regex"));
static SEASON_X_EPISODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{1,2})x(\d{1,3})\b").expect("NxM regex"));
static ANIME_EPISODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"-\s*(\d{2,4})\b").expect("anime episode regex"));
static YEAR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(19\d{2}|20\d{2})\b").expect("year regex"));
static PROPER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bPROPER\b").expect("proper regex"));
static REPACK_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bREPACK\b").expect("repack regex"));
static CONTAINER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(MKV|MP4|AVI|TS)\b").expect("container regex"));
static LANGUAGE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(MULTI|GERMAN|FRENCH|ITALIAN|SPANISH|KOREAN|JAPANESE|RUSSIAN|DUTCH|SWEDISH|NORWEGIAN|DANISH|POLISH)\b")
        .expect("language regex")
});
static OTHER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(REMUX|HYBRID|LIMITED|UNCUT|EXTENDED|INTERNAL|DOCU)\b")
        .expect("other regex")
});
static WEBSITE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bwww\.[A-Za-z0-9.-]+").expect("website regex"));
static TRAILING_GROUP_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"-([A-Za-z0-9]+)$").expect("trailing group regex"));
static TRAILING_EXTENSION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\.(mkv|mp4|avi|ts)$").expect("trailing extension regex")
});

fn normalize_codec(raw: &str) -> String {
    match raw.to_ascii_uppercase().as_str() {
        "H265" | "H.265" => "H.265".to_string(),
        "H264" | "H.264" => "H.264".to_string(),
        other => other.to_string().replace("X265", "x265").replace("X264", "x264"),
    }
}

fn normalize_hdr(raw: &str) -> String {
    match raw.to_ascii_uppercase().replace('.', "").as_str() {
        "DV" | "DOVI" | "DOLBYVISION" => "DV".to_string(),
        "HDR10+" => "HDR10+".to_string(),
        "HDR10" => "HDR10".to_string(),
        _ => "HDR".to_string(),
    }
}

fn normalize_audio(raw: &str) -> String {
    match raw.to_ascii_uppercase().as_str() {
        "DDP" => "DDP".to_string(),
        "DD+" => "DD+".to_string(),
        "TRUEHD" => "TrueHD".to_string(),
        "ATMOS" => "Atmos".to_string(),
        "DTS-HD.MA" => "DTS-HD.MA".to_string(),
        "DTS" => "DTS".to_string(),
        "AC3" => "AC3".to_string(),
        "AAC" => "AAC".to_string(),
        other => other.to_string(),
    }
}

/// Infer structured fields from a release name, writing them into `release`.
///
/// Never fails; tokens the grammar does not recognise are left unset.
pub fn parse_string(release: &mut Release, name: &str) {
    let mut earliest = name.len();

    let bracket_group = BRACKET_GROUP_RE.captures(name);
    let title_search_start = bracket_group
        .as_ref()
        .map_or(0, |captures| captures.get(0).expect("group 0 exists").end());

    if let Some(m) = RESOLUTION_RE.find(name) {
        release.resolution = Some(m.as_str().to_ascii_lowercase());
        earliest = earliest.min(m.start());
    }

    if let Some(captures) = SEASON_EPISODE_RE.captures(name) {
        release.season = captures[1].parse().unwrap_or(0);
        release.episode = captures[2].parse().unwrap_or(0);
        earliest = earliest.min(captures.get(0).expect("group 0 exists").start());
    } else if let Some(captures) = SEASON_ONLY_RE.captures(name) {
        release.season = captures[1].parse().unwrap_or(0);
        earliest = earliest.min(captures.get(0).expect("group 0 exists").start());
    } else if let Some(captures) = SEASON_X_EPISODE_RE.captures(name) {
        release.season = captures[1].parse().unwrap_or(0);
        release.episode = captures[2].parse().unwrap_or(0);
        earliest = earliest.min(captures.get(0).expect("group 0 exists").start());
    } else if let Some(captures) = ANIME_EPISODE_RE.captures(name) {
        release.episode = captures[1].parse().unwrap_or(0);
        earliest = earliest.min(captures.get(0).expect("group 0 exists").start());
    }

    if let Some(captures) = YEAR_RE.captures(name) {
        let year: u16 = captures[1].parse().unwrap_or(0);
        let current_year = u16::try_from(chrono::Utc::now().year()).unwrap_or(u16::MAX);
        if (1900..=current_year.saturating_add(2)).contains(&year) {
            release.year = year;
        }
        earliest = earliest.min(captures.get(0).expect("group 0 exists").start());
    }

    if let Some(m) = SOURCE_RE.find(name) {
        release.source = Some(m.as_str().to_string());
        earliest = earliest.min(m.start());
    }

    for m in CODEC_RE.find_iter(name) {
        Release::push_unique(&mut release.codec, normalize_codec(m.as_str()));
        earliest = earliest.min(m.start());
    }

    for m in HDR_RE.find_iter(name) {
        Release::push_unique(&mut release.hdr, normalize_hdr(m.as_str()));
        earliest = earliest.min(m.start());
    }

    for m in AUDIO_RE.find_iter(name) {
        Release::push_unique(&mut release.audio, normalize_audio(m.as_str()));
        earliest = earliest.min(m.start());
    }

    if let Some(captures) = CHANNELS_RE.captures(name) {
        release.audio_channels = Some(format!("{}.{}", &captures[1], &captures[2]));
        earliest = earliest.min(captures.get(0).expect("group 0 exists").start());
    }

    if let Some(m) = PROPER_RE.find(name) {
        release.proper = true;
        earliest = earliest.min(m.start());
    }
    if let Some(m) = REPACK_RE.find(name) {
        release.repack = true;
        earliest = earliest.min(m.start());
    }

    if let Some(m) = CONTAINER_RE.find(name) {
        release.container = Some(m.as_str().to_ascii_lowercase());
        earliest = earliest.min(m.start());
    }

    for m in LANGUAGE_RE.find_iter(name) {
        Release::push_unique(&mut release.language, m.as_str().to_ascii_uppercase());
        earliest = earliest.min(m.start());
    }

    for m in OTHER_RE.find_iter(name) {
        Release::push_unique(&mut release.other, m.as_str().to_ascii_uppercase());
        earliest = earliest.min(m.start());
    }

    if let Some(m) = WEBSITE_RE.find(name) {
        release.website = Some(m.as_str().to_string());
        earliest = earliest.min(m.start());
    }

    let has_video_tokens = release.resolution.is_some()
        || release.source.is_some()
        || !release.codec.is_empty()
        || release.season > 0
        || release.episode > 0;

    if let Some(captures) = bracket_group {
        release.group = Some(captures[1].to_string());
    } else {
        let trimmed_for_group = TRAILING_EXTENSION_RE.replace(name, "");
        if let Some(captures) = TRAILING_GROUP_RE.captures(&trimmed_for_group) {
            release.group = Some(captures[1].to_string());
        }
    }

    if release.group.is_none() && !has_video_tokens && name.contains(" - ") {
        if let Some(idx) = name.find(" - ") {
            let (left, right) = name.split_at(idx);
            let right = right.trim_start_matches(" - ");
            release.title = left.trim().to_string();
            if let Some(last_word) = right.split_whitespace().last() {
                release.group = Some(last_word.trim_matches(|c: char| !c.is_alphanumeric()).to_string());
            }
            return;
        }
    }

    let title_end = earliest.max(title_search_start);
    let raw_title = if title_search_start <= title_end {
        &name[title_search_start..title_end]
    } else {
        ""
    };
    release.title = clean_title(raw_title);
}

fn clean_title(raw: &str) -> String {
    let replaced = raw.replace(['.', '_'], " ");
    replaced
        .trim()
        .trim_end_matches('-')
        .trim()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Implementation;

    fn parsed(name: &str) -> Release {
        let mut release = Release::new("test", Implementation::Irc);
        parse_string(&mut release, name);
        release
    }

    #[test]
    fn parses_the_servant_scenario() {
        let release = parsed("Servant.S01.2160p.ATVP.WEB-DL.DDP.5.1.Atmos.DV.HEVC-FLUX");
        assert_eq!(release.title, "Servant");
        assert_eq!(release.season, 1);
        assert_eq!(release.episode, 0);
        assert_eq!(release.resolution.as_deref(), Some("2160p"));
        assert_eq!(release.source.as_deref(), Some("WEB-DL"));
        assert_eq!(release.codec, vec!["HEVC".to_string()]);
        assert_eq!(release.audio, vec!["DDP".to_string(), "Atmos".to_string()]);
        assert_eq!(release.audio_channels.as_deref(), Some("5.1"));
        assert_eq!(release.hdr, vec!["DV".to_string()]);
        assert_eq!(release.group.as_deref(), Some("FLUX"));
    }

    #[test]
    fn music_split_with_no_video_tokens() {
        let release = parsed("Artist - Albumname");
        assert_eq!(release.title, "Artist");
        assert_eq!(release.group.as_deref(), Some("Albumname"));
    }

    #[test]
    fn music_split_keeps_multi_word_left_side() {
        let release = parsed("Various Artists - Music '21");
        assert_eq!(release.title, "Various Artists");
        assert_eq!(release.group.as_deref(), Some("21"));
    }

    #[test]
    fn year_out_of_range_is_dropped() {
        let release = parsed("Old.Movie.1899.HDTV-GROUP");
        assert_eq!(release.year, 0);
    }

    #[test]
    fn bracket_prefixed_group_is_recognised() {
        let release = parsed("[SubsPlease] Show Name - 12 (1080p)");
        assert_eq!(release.group.as_deref(), Some("SubsPlease"));
    }
}
