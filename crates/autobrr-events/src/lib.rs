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

//! Notification event bus for the announce→release pipeline.
//!
//! The bus provides a typed event enum, sequential identifiers, and support for
//! replaying recent events when subscribers reconnect (e.g. an admin UI
//! supplying `Last-Event-ID`). Internally it uses `tokio::broadcast` with a
//! bounded buffer; when the channel overflows, the oldest events are dropped,
//! matching the desired backpressure behaviour.
//!
//! Layout: `payloads.rs` (event enum + envelope), `error.rs` (publish
//! failures), `routing.rs` (the bus itself), `topics.rs` (topic helpers).

pub mod error;
pub mod payloads;
pub mod routing;
pub mod topics;

pub use error::{EventBusError, EventBusResult};
pub use payloads::{DEFAULT_REPLAY_CAPACITY, Event, EventEnvelope, EventId};
pub use routing::{EventBus, EventStream};
pub use topics::event_kind;
