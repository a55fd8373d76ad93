//! `MapVars`: folds an indexer definition's named announce captures into a release.
//!
//! Takes the `force_size_unit` override directly rather than a whole indexer
//! definition, so this crate does not need to depend on the indexer registry
//! crate for the one field it actually consumes (see `DESIGN.md`).

use std::collections::HashMap;

use crate::error::ReleaseResult;
use crate::model::{Origin, Release};
use crate::size::parse_size;

/// Fold announce-captured variables into `release`.
///
/// Recognised capture names: `torrentName`, `torrentUrl`, `infoUrl`,
/// `torrentId`, `torrentHash`, `category`, `uploader`, `size`, `tags`,
/// `releaseTags`, `freeleechPercent`, `freeleech`, `scene`. Unrecognised keys
/// are ignored, matching the "dynamic capture map, static fields" design: the
/// per-field converter table lives entirely in this function.
///
/// # Errors
///
/// Returns an error if the `size` capture does not match the size grammar.
pub fn map_vars(
    release: &mut Release,
    captured: &HashMap<String, String>,
    force_size_unit: Option<&str>,
) -> ReleaseResult<()> {
    if let Some(value) = captured.get("torrentName") {
        release.torrent_name = value.clone();
    }
    if let Some(value) = captured.get("torrentUrl") {
        release.torrent_url = value.clone();
    }
    if let Some(value) = captured.get("infoUrl") {
        release.info_url = value.clone();
    }
    if let Some(value) = captured.get("torrentId") {
        release.torrent_id = Some(value.clone());
    }
    if let Some(value) = captured.get("torrentHash") {
        release.torrent_hash = Some(value.clone());
    }
    if let Some(value) = captured.get("category") {
        release.category = Some(value.clone());
        Release::push_unique(&mut release.categories, value.clone());
    }
    if let Some(value) = captured.get("uploader") {
        release.uploader = Some(value.clone());
    }
    if let Some(value) = captured.get("size") {
        release.size = parse_size(value, force_size_unit)?;
    }
    if let Some(value) = captured.get("tags") {
        release.tags = split_comma_list(value);
    }
    if let Some(value) = captured.get("releaseTags") {
        release.release_tags = value.clone();
    }
    if let Some(value) = captured.get("freeleechPercent") {
        if let Ok(percent) = value.trim_end_matches('%').parse::<u8>() {
            release.apply_freeleech_percent(percent);
        }
    }
    if let Some(value) = captured.get("freeleech") {
        if is_truthy(value) {
            release.apply_freeleech_percent(100);
        }
    }
    if let Some(value) = captured.get("scene") {
        if is_truthy(value) {
            release.origin = Origin::Scene;
        }
    }

    Ok(())
}

fn is_truthy(value: &str) -> bool {
    matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes")
}

fn split_comma_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Implementation;

    #[test]
    fn maps_core_identity_and_size_captures() {
        let mut release = Release::new("ptp", Implementation::Irc);
        let mut captured = HashMap::new();
        captured.insert("torrentName".to_string(), "Servant.S01".to_string());
        captured.insert("torrentUrl".to_string(), "https://example/dl".to_string());
        captured.insert("size".to_string(), "10GB".to_string());
        captured.insert("tags".to_string(), " drama , thriller ".to_string());

        map_vars(&mut release, &captured, None).unwrap();

        assert_eq!(release.torrent_name, "Servant.S01");
        assert_eq!(release.size, 10_000_000_000);
        assert_eq!(release.tags, vec!["drama".to_string(), "thriller".to_string()]);
    }

    #[test]
    fn bare_size_uses_force_unit_override() {
        let mut release = Release::new("ptp", Implementation::Irc);
        let mut captured = HashMap::new();
        captured.insert("size".to_string(), "10000".to_string());

        map_vars(&mut release, &captured, Some("MB")).unwrap();

        assert_eq!(release.size, 10_000_000_000);
    }

    #[test]
    fn freeleech_percent_capture_sets_bonus() {
        let mut release = Release::new("ptp", Implementation::Irc);
        let mut captured = HashMap::new();
        captured.insert("freeleechPercent".to_string(), "100%".to_string());

        map_vars(&mut release, &captured, None).unwrap();

        assert!(release.freeleech);
        assert_eq!(release.bonus, vec!["Freeleech".to_string()]);
    }

    #[test]
    fn invalid_size_capture_surfaces_error() {
        let mut release = Release::new("ptp", Implementation::Irc);
        let mut captured = HashMap::new();
        captured.insert("size".to_string(), "not-a-size".to_string());

        assert!(map_vars(&mut release, &captured, None).is_err());
    }
}
