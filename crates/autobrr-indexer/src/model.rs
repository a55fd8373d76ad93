//! Declarative indexer definition types, deserialised from YAML.

use serde::Deserialize;

/// Download transport an indexer serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    /// BitTorrent.
    Torrent,
    /// Usenet (NZB).
    Usenet,
}

/// A user-supplied setting an indexer definition's templates may reference
/// (e.g. `authkey`, `torrent_pass`, `passkey`).
#[derive(Debug, Clone, Deserialize)]
pub struct SettingSpec {
    /// Setting key, referenced from templates as `{{ .name }}`.
    pub name: String,
    /// Whether the value is sensitive (never logged).
    #[serde(rename = "type", default)]
    pub kind: SettingKind,
    /// Whether the setting must be supplied before the indexer can be used.
    #[serde(default)]
    pub required: bool,
    /// Human-readable label for the operator-facing settings form.
    pub label: String,
    /// Optional help text shown alongside the setting.
    #[serde(default)]
    pub help: Option<String>,
    /// Optional default value.
    #[serde(default)]
    pub default: Option<String>,
}

/// Kind of a user setting value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SettingKind {
    /// Plain text, safe to display.
    #[default]
    Text,
    /// Sensitive value (API key, password); redact in logs/UI.
    Secret,
}

/// One regex-driven announce line pattern.
#[derive(Debug, Clone, Deserialize)]
pub struct ParseLine {
    /// Example announce lines used for definition self-tests.
    #[serde(default)]
    pub test: Vec<String>,
    /// The regex pattern matched against announce payloads.
    pub pattern: String,
    /// Named capture variables, in capture-group order.
    pub vars: Vec<String>,
    /// When true, lines matching this pattern are intentionally dropped
    /// (e.g. tracker housekeeping notices) rather than parsed.
    #[serde(default)]
    pub ignore: bool,
}

/// Whether an indexer emits one announce style or several.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParseType {
    /// A single line pattern covers every announce.
    Single,
    /// Multiple line patterns are tried in order.
    Multi,
}

/// URL templates rendered from captured variables and user settings.
#[derive(Debug, Clone, Deserialize)]
pub struct MatchTemplates {
    /// Template for the tracker's info/details page.
    pub infourl: String,
    /// Template for the `.torrent`/NZB download URL.
    pub torrenturl: String,
}

/// The announce-parsing half of an indexer definition.
#[derive(Debug, Clone, Deserialize)]
pub struct ParseSpec {
    /// Whether `lines` holds one pattern or several.
    #[serde(rename = "type")]
    pub parse_type: ParseType,
    /// Candidate line patterns, tried in declaration order.
    pub lines: Vec<ParseLine>,
    /// URL templates.
    #[serde(rename = "match")]
    pub match_templates: MatchTemplates,
    /// Overrides the size grammar's default unit when a `size` capture
    /// carries no unit suffix.
    #[serde(default)]
    pub force_size_unit: Option<String>,
}

/// IRC connection details and parsing configuration for one indexer.
#[derive(Debug, Clone, Deserialize)]
pub struct IrcConfig {
    /// IRC network name (used to key sessions shared across indexers).
    pub network: String,
    /// Server hostname.
    pub server: String,
    /// Server port.
    pub port: u16,
    /// Whether to connect over TLS.
    #[serde(default)]
    pub tls: bool,
    /// Channels to join.
    pub channels: Vec<String>,
    /// Announcer bot nicks this indexer trusts.
    pub announcers: Vec<String>,
    /// Settings consumed by the IRC handshake itself (SASL account, NickServ
    /// password, invite command arguments), distinct from `settings` used by
    /// URL templates.
    #[serde(default)]
    pub settings: Vec<SettingSpec>,
    /// Announce parsing configuration.
    pub parse: ParseSpec,
}

/// A declarative per-tracker indexer definition.
#[derive(Debug, Clone, Deserialize)]
pub struct IndexerDefinition {
    /// Stable identifier (e.g. `"ptp"`).
    pub identifier: String,
    /// Human-readable name.
    pub name: String,
    /// Short description.
    #[serde(default)]
    pub description: Option<String>,
    /// Primary language of releases on this tracker.
    #[serde(default)]
    pub language: Option<String>,
    /// Links to the tracker's own site.
    #[serde(default)]
    pub urls: Vec<String>,
    /// Privacy model (`"private"`, `"semi-private"`, …).
    #[serde(default)]
    pub privacy: Option<String>,
    /// Download transport.
    pub protocol: Protocol,
    /// Feed/announce mechanisms this definition supports.
    #[serde(default)]
    pub supports: Vec<String>,
    /// Attribution for where the definition originated.
    #[serde(default)]
    pub source: Option<String>,
    /// User-supplied settings referenced by URL templates.
    #[serde(default)]
    pub settings: Vec<SettingSpec>,
    /// IRC connection and parsing configuration.
    pub irc: IrcConfig,
}

impl IndexerDefinition {
    /// Whether `supports` declares IRC as an announce mechanism.
    #[must_use]
    pub fn supports_irc(&self) -> bool {
        self.supports.iter().any(|s| s.eq_ignore_ascii_case("irc"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_a_minimal_definition() {
        let yaml = r"
identifier: example
name: Example Tracker
protocol: torrent
supports: [irc]
irc:
  network: ExampleNet
  server: irc.example.org
  port: 6697
  tls: true
  channels: ['#example-announce']
  announcers: ['Announce-Bot']
  parse:
    type: single
    lines:
      - pattern: '^(?P<torrentName>.+) - (?P<torrentUrl>\S+)$'
        vars: [torrentName, torrentUrl]
    match:
      infourl: 'https://example.org/torrents/{{ .torrentId }}'
      torrenturl: '{{ .torrentUrl }}'
";
        let definition: IndexerDefinition = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(definition.identifier, "example");
        assert!(definition.supports_irc());
        assert_eq!(definition.irc.channels, vec!["#example-announce".to_string()]);
    }
}
