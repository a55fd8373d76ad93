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

//! The release value object, its deterministic name/tag parsers, and the
//! announce-capture variable mapper.
//!
//! Layout: `model.rs` (the `Release` type and its enums), `parser.rs`
//! (`ParseString`), `tags.rs` (`ParseReleaseTags`), `vars.rs` (`MapVars`),
//! `size.rs` (the shared byte-size grammar), `error.rs`.

pub mod error;
pub mod model;
pub mod parser;
pub mod size;
pub mod tags;
pub mod vars;

pub use error::{ReleaseError, ReleaseResult};
pub use model::{FilterStatus, Implementation, Origin, Protocol, Release};
pub use parser::parse_string;
pub use size::parse_size;
pub use tags::parse_release_tags;
pub use vars::map_vars;
