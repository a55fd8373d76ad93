//! Indexer definitions baked into the binary at compile time.
//!
//! These cover a handful of well-known private trackers out of the box;
//! an on-disk override directory can add more or replace any of these by
//! identifier (see [`crate::registry::Registry::load`]).

/// `(source name, YAML contents)` pairs for every embedded definition.
pub static DEFAULT_DEFINITIONS: &[(&str, &str)] = &[
    (
        "embedded:redacted.yml",
        include_str!("../definitions/redacted.yml"),
    ),
    (
        "embedded:orpheus.yml",
        include_str!("../definitions/orpheus.yml"),
    ),
];
