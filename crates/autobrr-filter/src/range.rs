//! Range-expression parsing for `Years`, `Seasons`, `Episodes`, and
//! `FreeleechPercent`: `A`, `A-B`, or a comma-separated combination.

use crate::error::{FilterError, FilterResult};

/// A parsed range expression: a set of single values and inclusive spans.
#[derive(Debug, Clone, Default)]
pub struct RangeExpr {
    singles: Vec<i64>,
    spans: Vec<(i64, i64)>,
}

impl RangeExpr {
    /// Parse a comma-separated list of bare numbers and/or `A-B` spans.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError::InvalidRange`] if any comma-separated term is
    /// not a bare integer or a `A-B` span of integers.
    pub fn parse(filter_id: i64, field: &'static str, expression: &str) -> FilterResult<Self> {
        let mut range = Self::default();
        for term in expression.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            if let Some((low, high)) = term.split_once('-') {
                let low: i64 = low.trim().parse().map_err(|_| FilterError::InvalidRange {
                    filter_id,
                    field,
                    expression: expression.to_string(),
                })?;
                let high: i64 = high.trim().parse().map_err(|_| FilterError::InvalidRange {
                    filter_id,
                    field,
                    expression: expression.to_string(),
                })?;
                range.spans.push((low.min(high), low.max(high)));
            } else {
                let value: i64 = term.parse().map_err(|_| FilterError::InvalidRange {
                    filter_id,
                    field,
                    expression: expression.to_string(),
                })?;
                range.singles.push(value);
            }
        }
        Ok(range)
    }

    /// Whether `value` is named by a single term or falls within a span.
    #[must_use]
    pub fn contains(&self, value: i64) -> bool {
        self.singles.contains(&value) || self.spans.iter().any(|(low, high)| (*low..=*high).contains(&value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_values_and_spans() {
        let range = RangeExpr::parse(1, "years", "2018-2022, 2024").unwrap();
        assert!(range.contains(2019));
        assert!(range.contains(2024));
        assert!(!range.contains(2023));
    }

    #[test]
    fn rejects_non_numeric_terms() {
        assert!(RangeExpr::parse(1, "years", "abc").is_err());
    }
}
