//! Comma/newline-separated text-match lists: regex or glob, case-insensitive.

use globset::{Glob, GlobSetBuilder};
use regex::RegexBuilder;

use crate::error::{FilterError, FilterResult};

/// Split a filter's text-match field on commas and newlines into trimmed,
/// non-empty tokens.
#[must_use]
pub fn split_terms(raw: &str) -> Vec<String> {
    raw.split([',', '\n'])
        .map(str::trim)
        .filter(|term| !term.is_empty())
        .map(str::to_string)
        .collect()
}

/// A compiled text-match list, either a set of case-insensitive globs or a
/// set of case-insensitive regexes.
pub enum TextMatcher {
    /// No terms configured; every match attempt reports no hit.
    Empty,
    /// `UseRegex=false`: each term is a glob pattern (`*`, `?`).
    Glob(Box<globset::GlobSet>),
    /// `UseRegex=true`: each term is a regex pattern.
    Regex(Vec<regex::Regex>),
}

impl TextMatcher {
    /// Compile a text-match field's raw value into a matcher.
    ///
    /// # Errors
    ///
    /// Returns an error if any term fails to compile as a regex or glob.
    pub fn compile(filter_id: i64, field: &'static str, raw: &str, use_regex: bool) -> FilterResult<Self> {
        let terms = split_terms(raw);
        if terms.is_empty() {
            return Ok(Self::Empty);
        }

        if use_regex {
            let compiled = terms
                .iter()
                .map(|term| {
                    RegexBuilder::new(term)
                        .case_insensitive(true)
                        .build()
                        .map_err(|source| FilterError::InvalidPattern {
                            filter_id,
                            field,
                            pattern: term.clone(),
                            source,
                        })
                })
                .collect::<FilterResult<Vec<_>>>()?;
            Ok(Self::Regex(compiled))
        } else {
            let mut builder = GlobSetBuilder::new();
            for term in &terms {
                let glob = Glob::new(&term.to_ascii_lowercase()).map_err(|source| FilterError::InvalidGlob {
                    filter_id,
                    field,
                    pattern: term.clone(),
                    source,
                })?;
                builder.add(glob);
            }
            let set = builder.build().map_err(|source| FilterError::InvalidGlob {
                filter_id,
                field,
                pattern: raw.to_string(),
                source,
            })?;
            Ok(Self::Glob(Box::new(set)))
        }
    }

    /// Whether `value` is hit by at least one compiled term, case-insensitively.
    #[must_use]
    pub fn is_match(&self, value: &str) -> bool {
        match self {
            Self::Empty => false,
            Self::Glob(set) => set.is_match(value.to_ascii_lowercase()),
            Self::Regex(patterns) => patterns.iter().any(|pattern| pattern.is_match(value)),
        }
    }

    /// Whether this matcher has no configured terms.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn glob_matches_case_insensitively() {
        let matcher = TextMatcher::compile(1, "match_releases", "*hdr*, *remux*", false).unwrap();
        assert!(matcher.is_match("Movie.2024.2160p.HDR.WEB-DL"));
        assert!(!matcher.is_match("Movie.2024.1080p.WEB-DL"));
    }

    #[test]
    fn regex_terms_are_or_ed_together() {
        let matcher = TextMatcher::compile(1, "except_release_groups", r"^FLUX$|^EVO$", true).unwrap();
        assert!(matcher.is_match("FLUX"));
        assert!(!matcher.is_match("NTb"));
    }

    #[test]
    fn empty_field_never_matches() {
        let matcher = TextMatcher::compile(1, "match_releases", "", false).unwrap();
        assert!(matcher.is_empty());
        assert!(!matcher.is_match("anything"));
    }
}
