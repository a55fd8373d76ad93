//! Declarative indexer definitions: schema, URL templating, and the
//! read-mostly registry that maps IRC announcers to the definition that
//! should parse their lines.

#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::cargo,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::multiple_crate_versions)]

mod embedded;
pub mod error;
pub mod model;
pub mod registry;
pub mod templating;

pub use error::{IndexerError, IndexerResult};
pub use model::{
    IndexerDefinition, IrcConfig, MatchTemplates, ParseLine, ParseSpec, ParseType, Protocol,
    SettingKind, SettingSpec,
};
pub use registry::{CompiledDefinition, Registry, RegistrySnapshot};
pub use templating::render_template;
