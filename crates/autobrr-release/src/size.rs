//! Byte-size parsing grammar shared by announce size captures and filter size bounds.
//!
//! Grammar: `<number>[.<number>]?\s*(B|KB|MB|GB|TB|KiB|MiB|GiB|TiB)?`. The default
//! unit is bytes unless overridden by an indexer's `force_size_unit` setting.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{ReleaseError, ReleaseResult};

static SIZE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*([0-9]+(?:\.[0-9]+)?)\s*(KiB|MiB|GiB|TiB|KB|MB|GB|TB|B)?\s*$")
        .expect("size grammar regex is valid")
});

/// Returns the byte multiplier for a unit token, case-insensitively.
///
/// # Errors
///
/// Returns an error if `unit` is not one of the grammar's recognised tokens.
pub fn unit_factor(unit: &str) -> ReleaseResult<u64> {
    match unit.to_ascii_uppercase().as_str() {
        "B" => Ok(1),
        "KB" => Ok(1_000),
        "MB" => Ok(1_000_000),
        "GB" => Ok(1_000_000_000),
        "TB" => Ok(1_000_000_000_000),
        "KIB" => Ok(1_024),
        "MIB" => Ok(1_024 * 1_024),
        "GIB" => Ok(1_024 * 1_024 * 1_024),
        "TIB" => Ok(1_024 * 1_024 * 1_024 * 1_024),
        other => Err(ReleaseError::InvalidSize {
            value: unit.to_string(),
            reason: format!("unrecognised unit {other:?}"),
        }),
    }
}

/// Parse a byte-count string per the size grammar.
///
/// When `raw` carries no unit suffix, `force_unit` (an indexer's
/// `force_size_unit` override) supplies the unit; if that is also absent,
/// the bare number is interpreted as whole bytes.
///
/// # Errors
///
/// Returns an error if `raw` does not match the grammar, or `force_unit`
/// names an unrecognised unit.
pub fn parse_size(raw: &str, force_unit: Option<&str>) -> ReleaseResult<u64> {
    let captures = SIZE_RE
        .captures(raw.trim())
        .ok_or_else(|| ReleaseError::InvalidSize {
            value: raw.to_string(),
            reason: "does not match the size grammar".to_string(),
        })?;

    let number: f64 = captures[1]
        .parse()
        .map_err(|_| ReleaseError::InvalidSize {
            value: raw.to_string(),
            reason: "unparseable numeric component".to_string(),
        })?;

    let factor = match captures.get(2) {
        Some(unit) => unit_factor(unit.as_str())?,
        None => match force_unit {
            Some(unit) => unit_factor(unit)?,
            None => 1,
        },
    };

    #[expect(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "release and byte-count sizes never approach f64's integer precision limit"
    )]
    let bytes = (number * factor as f64).round() as u64;
    Ok(bytes)
}

/// Format a byte count back into `<n><unit>` form, for round-trip tests and
/// diagnostics. Inverse of [`parse_size`] for the units it names explicitly.
#[must_use]
pub fn format_size(value: u64, unit: &str) -> String {
    format!("{value}{unit}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_gigabytes() {
        assert_eq!(parse_size("10GB", None).unwrap(), 10_000_000_000);
    }

    #[test]
    fn bare_number_uses_force_unit() {
        assert_eq!(parse_size("10000", Some("MB")).unwrap(), 10_000_000_000);
    }

    #[test]
    fn bare_number_without_force_unit_is_bytes() {
        assert_eq!(parse_size("512", None).unwrap(), 512);
    }

    #[test]
    fn round_trips_every_named_unit() {
        let cases = [
            ("KB", 1_000u64),
            ("MB", 1_000_000),
            ("GB", 1_000_000_000),
            ("TB", 1_000_000_000_000),
            ("KiB", 1_024),
            ("MiB", 1_024 * 1_024),
            ("GiB", 1_024 * 1_024 * 1_024),
            ("TiB", 1_024 * 1_024 * 1_024 * 1_024),
        ];
        for (unit, factor) in cases {
            let formatted = format_size(1, unit);
            assert_eq!(parse_size(&formatted, None).unwrap(), factor);
        }
    }

    #[test]
    fn rejects_malformed_input() {
        assert!(parse_size("not-a-size", None).is_err());
    }
}
