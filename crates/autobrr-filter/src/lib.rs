//! Filter engine: evaluates a parsed release against an ordered set of
//! user-defined filters and returns the winning filter plus every loser's
//! rejection codes.
//!
//! Layout: `model.rs` (the raw `Filter` type), `range.rs` (range-expression
//! parsing), `text.rs` (regex/glob text-match lists), `engine.rs`
//! (compilation and `Match`), `error.rs`.

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

pub mod engine;
pub mod error;
pub mod model;
pub mod range;
pub mod text;

pub use engine::{CompiledFilter, MatchOutcome, SizeOutcome, match_release};
pub use error::{FilterError, FilterResult};
pub use model::{ExternalScriptGate, ExternalWebhookGate, Filter, MaxDownloadsUnit, TagsMatchLogic};
pub use range::RangeExpr;
pub use text::TextMatcher;
