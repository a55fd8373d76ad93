//! The indexer definition registry: load, index, and snapshot-swap definitions.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, RwLock};

use regex::Regex;
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::error::{IndexerError, IndexerResult};
use crate::model::IndexerDefinition;

/// A single definition plus its pre-compiled line-pattern regexes.
///
/// Regexes are compiled once at load time (`spec.md` §9 "regex
/// pre-compilation") rather than per-announce.
pub struct CompiledDefinition {
    /// The declarative definition as loaded from YAML.
    pub definition: IndexerDefinition,
    /// Compiled regex for each of `definition.irc.parse.lines`, in order,
    /// `None` for lines whose pattern failed to compile (logged and skipped
    /// per `spec.md` §4.1).
    pub line_patterns: Vec<Option<Regex>>,
}

/// Immutable, indexed view of every loaded definition at one point in time.
///
/// Readers take a clone of the `Arc` and never block; writers (definition
/// reloads) build a whole new snapshot and swap it in atomically.
#[derive(Default)]
pub struct RegistrySnapshot {
    by_identifier: HashMap<String, Arc<CompiledDefinition>>,
    by_announcer: HashMap<(String, String, String), Arc<CompiledDefinition>>,
}

impl RegistrySnapshot {
    fn build(definitions: Vec<IndexerDefinition>) -> Self {
        let mut by_identifier = HashMap::new();
        let mut by_announcer = HashMap::new();

        for definition in definitions {
            let mut line_patterns = Vec::with_capacity(definition.irc.parse.lines.len());
            for line in &definition.irc.parse.lines {
                match Regex::new(&line.pattern) {
                    Ok(regex) => line_patterns.push(Some(regex)),
                    Err(source) => {
                        warn!(
                            identifier = %definition.identifier,
                            pattern = %line.pattern,
                            error = %source,
                            "indexer definition line pattern failed to compile, skipping line"
                        );
                        line_patterns.push(None);
                    }
                }
            }

            let compiled = Arc::new(CompiledDefinition {
                definition: definition.clone(),
                line_patterns,
            });

            for channel in &definition.irc.channels {
                for announcer in &definition.irc.announcers {
                    by_announcer.insert(
                        (
                            definition.irc.network.clone(),
                            channel.clone(),
                            announcer.clone(),
                        ),
                        Arc::clone(&compiled),
                    );
                }
            }

            by_identifier.insert(definition.identifier.clone(), compiled);
        }

        Self {
            by_identifier,
            by_announcer,
        }
    }

    /// Look up a definition by its stable identifier.
    #[must_use]
    pub fn get_by_identifier(&self, identifier: &str) -> Option<Arc<CompiledDefinition>> {
        self.by_identifier.get(identifier).cloned()
    }

    /// Look up the definition that should parse an announce line observed
    /// on `(network, channel)` from `announcer`.
    #[must_use]
    pub fn get_parse_for_announcer(
        &self,
        network: &str,
        channel: &str,
        announcer: &str,
    ) -> Option<Arc<CompiledDefinition>> {
        self.by_announcer
            .get(&(network.to_string(), channel.to_string(), announcer.to_string()))
            .cloned()
    }

    /// Every loaded definition, in no particular order.
    pub fn definitions(&self) -> impl Iterator<Item = &Arc<CompiledDefinition>> {
        self.by_identifier.values()
    }

    /// Number of loaded definitions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_identifier.len()
    }

    /// Whether no definitions are loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_identifier.is_empty()
    }
}

/// Read-mostly registry of indexer definitions, guarded by a copy-on-write snapshot.
pub struct Registry {
    snapshot: RwLock<Arc<RegistrySnapshot>>,
}

impl Registry {
    /// Load definitions from the embedded defaults plus an optional on-disk
    /// override directory, where on-disk definitions with a matching
    /// `identifier` replace the embedded one.
    ///
    /// # Errors
    ///
    /// Returns an error if any embedded or on-disk definition is
    /// structurally invalid (fails to parse as YAML). An uncompilable line
    /// regex within an otherwise-valid definition is not fatal; it is
    /// logged and that line is skipped.
    pub fn load(override_dir: Option<&Path>) -> IndexerResult<Self> {
        let mut by_identifier: HashMap<String, IndexerDefinition> = HashMap::new();

        for (name, contents) in crate::embedded::DEFAULT_DEFINITIONS {
            let definition = parse_definition_yaml(name, contents)?;
            by_identifier.insert(definition.identifier.clone(), definition);
        }

        if let Some(dir) = override_dir {
            for entry in WalkDir::new(dir)
                .into_iter()
                .filter_map(std::result::Result::ok)
                .filter(|entry| entry.file_type().is_file())
            {
                let path = entry.path();
                if !matches_yaml_extension(path) {
                    continue;
                }
                let contents = std::fs::read_to_string(path).map_err(|source| IndexerError::Read {
                    path: path.to_path_buf(),
                    source,
                })?;
                let definition = parse_definition_yaml(&path.to_string_lossy(), &contents)?;
                info!(identifier = %definition.identifier, path = %path.display(), "loaded on-disk indexer definition override");
                by_identifier.insert(definition.identifier.clone(), definition);
            }
        }

        let definitions: Vec<_> = by_identifier.into_values().collect();
        let snapshot = Arc::new(RegistrySnapshot::build(definitions));
        Ok(Self {
            snapshot: RwLock::new(snapshot),
        })
    }

    /// Take a lock-free reference to the current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Arc<RegistrySnapshot> {
        Arc::clone(
            &self
                .snapshot
                .read()
                .unwrap_or_else(std::sync::PoisonError::into_inner),
        )
    }

    /// Reload from the same sources and atomically swap in a new snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error under the same conditions as [`Registry::load`].
    pub fn reload(&self, override_dir: Option<&Path>) -> IndexerResult<()> {
        let reloaded = Self::load(override_dir)?;
        let mut guard = self
            .snapshot
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        *guard = reloaded.snapshot();
        Ok(())
    }
}

fn matches_yaml_extension(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some("yml" | "yaml")
    )
}

fn parse_definition_yaml(source_name: &str, contents: &str) -> IndexerResult<IndexerDefinition> {
    serde_yaml::from_str(contents).map_err(|source| IndexerError::Invalid {
        path: source_name.into(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const EXAMPLE_YAML: &str = r"
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

    #[test]
    fn on_disk_override_replaces_matching_identifier() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("example.yml");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(EXAMPLE_YAML.as_bytes()).unwrap();

        let registry = Registry::load(Some(dir.path())).unwrap();
        let snapshot = registry.snapshot();
        assert!(snapshot.get_by_identifier("example").is_some());
    }

    #[test]
    fn get_parse_for_announcer_resolves_by_network_channel_announcer() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("example.yml");
        std::fs::write(&path, EXAMPLE_YAML).unwrap();

        let registry = Registry::load(Some(dir.path())).unwrap();
        let snapshot = registry.snapshot();
        let found =
            snapshot.get_parse_for_announcer("ExampleNet", "#example-announce", "Announce-Bot");
        assert!(found.is_some());
        assert!(snapshot
            .get_parse_for_announcer("ExampleNet", "#other-channel", "Announce-Bot")
            .is_none());
    }

    #[test]
    fn invalid_yaml_override_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.yml");
        std::fs::write(&path, "not: [valid").unwrap();

        assert!(Registry::load(Some(dir.path())).is_err());
    }
}
