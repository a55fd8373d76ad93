//! Error types for IRC session connection and handshake failures.

use thiserror::Error;

/// Errors raised while running an IRC session. Every variant is handled by
/// the state machine itself (transition to `BackingOff` or `Closing`);
/// callers observe sessions through [`crate::session::SessionHandle`]
/// rather than by matching on this type.
#[derive(Debug, Error)]
pub enum IrcError {
    /// TCP dial to `server:port` failed or exceeded the connect deadline.
    #[error("failed to connect to {server}:{port}")]
    Connect {
        /// Server hostname.
        server: String,
        /// Server port.
        port: u16,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
    /// The TLS handshake failed.
    #[error("TLS handshake with {server} failed")]
    Tls {
        /// Server hostname.
        server: String,
        /// Underlying TLS error.
        #[source]
        source: std::io::Error,
    },
    /// The server rejected every attempted nick (`433` three times).
    #[error("nick {nick} (and its fallbacks) are all in use")]
    NickInUseExhausted {
        /// The base nick that was exhausted.
        nick: String,
    },
    /// The server rejected the `sasl` capability or the SASL exchange itself.
    #[error("SASL authentication was rejected")]
    SaslRejected,
    /// A handshake phase did not complete before its deadline.
    #[error("timed out waiting for {phase} to complete")]
    Timeout {
        /// Phase name (`"identifying"`, `"joining"`, …).
        phase: &'static str,
    },
    /// The read half of the connection closed unexpectedly.
    #[error("connection closed unexpectedly")]
    ConnectionClosed,
    /// An I/O error occurred while reading or writing the connection.
    #[error("IO error on IRC connection")]
    Io(#[from] std::io::Error),
}

/// Convenience alias for IRC session results.
pub type IrcResult<T> = Result<T, IrcError>;
