//! The release pipeline coordinator: the fan-in stage that resolves,
//! parses, filters, rate-caps, gates, and dispatches every announce line
//! emitted by the configured IRC sessions.
//!
//! Layout: `ports.rs` (`Repository`/`ActionDispatcher`/`MetadataFetcher`,
//! the external collaborator interfaces), `gates.rs` (the external
//! script/webhook veto gates), `coordinator.rs` (the worker pool and the
//! nine-step per-line handler), `model.rs`, `error.rs`.

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

mod coordinator;
pub mod error;
mod gates;
pub mod model;
pub mod ports;

pub use coordinator::{spawn, PipelineConfig, PipelineHandle};
pub use error::{PipelineError, PipelineResult};
pub use model::{ApprovedRelease, DispatchOutcome, DispatchStatus, ProcessOutcome};
pub use ports::{ActionDispatcher, MetadataFetcher, Repository};
