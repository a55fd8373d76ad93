//! `{{ .var }}` substitution against captured announce variables and user settings.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{IndexerError, IndexerResult};

static PLACEHOLDER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{\s*\.(\w+)\s*\}\}").expect("placeholder regex is valid"));

/// Render a URL template against the union of captured announce variables
/// and user-supplied setting values.
///
/// # Errors
///
/// Returns [`IndexerError::UnknownTemplateVariable`] if the template
/// references a name absent from both maps.
pub fn render_template(
    template: &str,
    captured: &HashMap<String, String>,
    settings: &HashMap<String, String>,
) -> IndexerResult<String> {
    let mut missing: Option<String> = None;
    let rendered = PLACEHOLDER_RE.replace_all(template, |captures: &regex::Captures<'_>| {
        let name = &captures[1];
        captured
            .get(name)
            .or_else(|| settings.get(name))
            .cloned()
            .unwrap_or_else(|| {
                missing.get_or_insert_with(|| name.to_string());
                String::new()
            })
    });

    if let Some(variable) = missing {
        return Err(IndexerError::UnknownTemplateVariable {
            template: template.to_string(),
            variable,
        });
    }

    Ok(rendered.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn substitutes_captured_and_setting_variables() {
        let captured = map(&[("torrentId", "42")]);
        let settings = map(&[("passkey", "secret")]);
        let rendered = render_template(
            "https://example.org/t/{{ .torrentId }}?key={{ .passkey }}",
            &captured,
            &settings,
        )
        .unwrap();
        assert_eq!(rendered, "https://example.org/t/42?key=secret");
    }

    #[test]
    fn missing_variable_is_an_error() {
        let err = render_template("{{ .missing }}", &HashMap::new(), &HashMap::new()).unwrap_err();
        assert!(matches!(err, IndexerError::UnknownTemplateVariable { .. }));
    }
}
