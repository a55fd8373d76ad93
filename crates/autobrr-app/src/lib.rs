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
#![allow(clippy::multiple_crate_versions)]

//! Binary bootstrap: wires the indexer registry, IRC sessions, and pipeline
//! coordinator together and runs until a shutdown signal arrives.
//!
//! Layout: `bootstrap.rs` (dependency construction and the boot sequence),
//! `sessions.rs` (deduplicating indexer definitions into IRC sessions),
//! `adapters.rs` (default `Repository`/`ActionDispatcher`/`MetadataFetcher`
//! implementations), `error.rs`.

/// Default `Repository`/`ActionDispatcher`/`MetadataFetcher` implementations.
pub mod adapters;
/// Application bootstrap and environment loading.
pub mod bootstrap;
/// Application-level error type.
pub mod error;
/// Deduplicating indexer definitions into IRC session configurations.
pub mod sessions;

pub use bootstrap::run_app;
pub use error::{AppError, AppResult};
