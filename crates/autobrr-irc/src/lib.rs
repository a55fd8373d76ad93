//! IRC session manager: one cooperative state machine per configured
//! `(network, server, port)`, from `CONNECTING` through `READY` to
//! `CLOSING`, dispatching trusted announcers' lines to the pipeline.
//!
//! Layout: `model.rs` (`SessionConfig`, `SessionState`, `AnnounceLine`),
//! `backoff.rs` (exponential backoff with jitter), `mailbox.rs` (the
//! bounded outbound command queue), `connection.rs` (TCP/TLS dial),
//! `session.rs` (the state machine itself), `error.rs`.

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

mod backoff;
mod connection;
pub mod error;
mod mailbox;
pub mod model;
pub mod session;

pub use backoff::Backoff;
pub use error::{IrcError, IrcResult};
pub use mailbox::OutboundMailbox;
pub use model::{AnnounceLine, OutboundCommand, SessionConfig, SessionState};
pub use session::{SessionHandle, spawn};
