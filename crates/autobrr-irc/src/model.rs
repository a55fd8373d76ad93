//! Session configuration, state-machine states, and the announce payload
//! emitted to the pipeline.

use std::time::Duration;

use chrono::{DateTime, Utc};

/// Per-network connection and identity configuration. One [`SessionConfig`]
/// is shared by every indexer definition whose `irc.network` names the same
/// network; the pipeline bootstrap deduplicates definitions down to one
/// config per distinct `(network, server, port)`.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Network identifier, used for logging, metrics, and event payloads.
    pub network: String,
    /// Server hostname.
    pub server: String,
    /// Server port.
    pub port: u16,
    /// Whether to connect over TLS.
    pub tls: bool,
    /// Nick to register with; `REGISTERING` appends `_` up to 3 times on collision.
    pub nick: String,
    /// IRC username (the `USER` command's first argument).
    pub username: String,
    /// IRC realname (the `USER` command's trailing argument).
    pub realname: String,
    /// SASL PLAIN account, when the network requires SASL instead of NickServ.
    pub sasl_account: Option<String>,
    /// SASL PLAIN password.
    pub sasl_password: Option<String>,
    /// `NickServ IDENTIFY` password, used when `sasl_account` is unset.
    pub nickserv_password: Option<String>,
    /// Channels to join once identified.
    pub channels: Vec<String>,
    /// Announcer nicks whose `PRIVMSG`s are emitted to the pipeline.
    pub announcers: Vec<String>,
    /// Per-channel invite command to send when the channel requires an
    /// invite before `JOIN` succeeds (e.g. `PRIVMSG PT-BOT :invite KEY`).
    pub invite_commands: Vec<(String, String)>,
    /// Per-attempt connect timeout.
    pub connect_timeout: Duration,
    /// Interval between keepalive `PING`s sent once `READY`.
    pub ping_interval: Duration,
    /// Deadline for a `PONG` reply before the session is considered dead.
    pub pong_timeout: Duration,
}

impl SessionConfig {
    /// Default connect timeout per `spec.md` §4.4 (`CONNECTING`): 30 s.
    pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
    /// Default keepalive `PING` interval per `spec.md` §4.4 (`READY`): 60 s.
    pub const DEFAULT_PING_INTERVAL: Duration = Duration::from_secs(60);
    /// Default `PONG` deadline per `spec.md` §4.4 (`READY`): 90 s.
    pub const DEFAULT_PONG_TIMEOUT: Duration = Duration::from_secs(90);

    /// Invite command configured for `channel`, if any.
    #[must_use]
    pub fn invite_command_for(&self, channel: &str) -> Option<&str> {
        self.invite_commands
            .iter()
            .find(|(chan, _)| chan.eq_ignore_ascii_case(channel))
            .map(|(_, command)| command.as_str())
    }
}

/// State-machine states per `spec.md` §4.4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// No connection attempt in progress.
    Disconnected,
    /// TCP dial in progress.
    Connecting,
    /// TLS handshake in progress.
    TlsHandshake,
    /// `NICK`/`USER` sent, awaiting registration to complete.
    Registering,
    /// SASL or post-registration NickServ identification in progress.
    Identifying,
    /// Sending `JOIN` for each configured channel.
    Joining,
    /// Waiting for an `INVITE` reply after running an invite command.
    AwaitingInvites,
    /// Fully joined and reading announce lines.
    Ready,
    /// Waiting out an exponential backoff delay before reconnecting.
    BackingOff,
    /// Shutting down: `QUIT` sent, draining the writer, closing the socket.
    Closing,
}

impl SessionState {
    /// Lowercase label used for metrics and structured log fields.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::TlsHandshake => "tls_handshake",
            Self::Registering => "registering",
            Self::Identifying => "identifying",
            Self::Joining => "joining",
            Self::AwaitingInvites => "awaiting_invites",
            Self::Ready => "ready",
            Self::BackingOff => "backing_off",
            Self::Closing => "closing",
        }
    }
}

/// An announce line observed from a trusted announcer in a subscribed
/// channel, emitted to the pipeline in strict per-session arrival order.
#[derive(Debug, Clone)]
pub struct AnnounceLine {
    /// Network the line arrived on.
    pub network: String,
    /// Channel the line was posted to.
    pub channel: String,
    /// Announcer nick that posted the line.
    pub announcer: String,
    /// Raw `PRIVMSG` payload.
    pub payload: String,
    /// When the line was observed.
    pub timestamp: DateTime<Utc>,
}

/// A command queued for the writer task.
#[derive(Debug, Clone)]
pub enum OutboundCommand {
    /// A keepalive `PING`; never dropped by mailbox overflow.
    Ping(String),
    /// Any other raw protocol line.
    Line(String),
}

impl OutboundCommand {
    /// The raw line to write to the socket, terminated by the caller.
    #[must_use]
    pub fn as_line(&self) -> &str {
        match self {
            Self::Ping(line) | Self::Line(line) => line,
        }
    }

    /// Whether this command is a `PING`, exempt from overflow eviction.
    #[must_use]
    pub const fn is_ping(&self) -> bool {
        matches!(self, Self::Ping(_))
    }
}
