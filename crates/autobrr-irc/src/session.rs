//! The per-network cooperative state machine (`spec.md` §4.4).

use std::sync::Arc;
use std::time::Duration;

use autobrr_events::{Event, EventBus};
use autobrr_telemetry::Metrics;
use base64::{Engine as _, engine::general_purpose};
use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt};
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::backoff::Backoff;
use crate::connection::{self, BoxedReader, BoxedWriter};
use crate::error::{IrcError, IrcResult};
use crate::mailbox::OutboundMailbox;
use crate::model::{AnnounceLine, OutboundCommand, SessionConfig, SessionState};

static PRIVMSG_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^:(?P<nick>[^!\s]+)!\S+ PRIVMSG (?P<target>\S+) :(?P<payload>.*)$")
        .expect("PRIVMSG pattern is valid")
});
static INVITE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^:\S+ INVITE \S+ :?(?P<channel>#\S+)$").expect("INVITE pattern is valid"));
static NICK_IN_USE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^:\S+ 433 ").expect("433 numeric pattern is valid"));
static PING_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^PING :?(?P<token>.*)$").expect("PING pattern is valid"));
static CAP_ACK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^:\S+ CAP \S+ ACK :?.*\bsasl\b").expect("CAP ACK pattern is valid"));
static CAP_NAK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^:\S+ CAP \S+ NAK :?.*\bsasl\b").expect("CAP NAK pattern is valid"));
static AUTHENTICATE_PROMPT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^AUTHENTICATE \+$").expect("AUTHENTICATE prompt pattern is valid"));
static SASL_SUCCESS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^:\S+ 903 ").expect("903 numeric pattern is valid"));
static SASL_FAILURE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^:\S+ (904|905|906|907) ").expect("SASL failure numeric pattern is valid"));

/// A running session's externally visible handle.
pub struct SessionHandle {
    state_rx: watch::Receiver<SessionState>,
    cancellation: CancellationToken,
    join_handle: tokio::task::JoinHandle<()>,
}

impl SessionHandle {
    /// Current state-machine state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        *self.state_rx.borrow()
    }

    /// Request a graceful shutdown; the running task moves to `CLOSING`
    /// within the next I/O quantum and exits.
    pub fn shutdown(&self) {
        self.cancellation.cancel();
    }

    /// Wait for the session task to exit.
    ///
    /// # Panics
    ///
    /// Panics if the underlying task panicked.
    pub async fn join(self) {
        self.join_handle.await.expect("IRC session task panicked");
    }
}

/// Spawn a session task for one `(network, server, port)`.
#[must_use]
pub fn spawn(
    config: SessionConfig,
    announce_tx: mpsc::Sender<AnnounceLine>,
    events: EventBus,
    metrics: Metrics,
) -> SessionHandle {
    let cancellation = CancellationToken::new();
    let (state_tx, state_rx) = watch::channel(SessionState::Disconnected);
    let session = IrcSession {
        config,
        mailbox: Arc::new(OutboundMailbox::new(OutboundMailbox::DEFAULT_CAPACITY)),
        announce_tx,
        events,
        metrics,
        state_tx,
        cancellation: cancellation.clone(),
    };
    let join_handle = tokio::spawn(session.run());
    SessionHandle {
        state_rx,
        cancellation,
        join_handle,
    }
}

struct IrcSession {
    config: SessionConfig,
    mailbox: Arc<OutboundMailbox>,
    announce_tx: mpsc::Sender<AnnounceLine>,
    events: EventBus,
    metrics: Metrics,
    state_tx: watch::Sender<SessionState>,
    cancellation: CancellationToken,
}

impl IrcSession {
    fn set_state(&self, state: SessionState) {
        self.metrics.inc_irc_state_transition(&self.config.network, state.label());
        debug!(network = %self.config.network, state = state.label(), "IRC session state transition");
        let _ = self.state_tx.send(state);
    }

    async fn run(self) {
        let mut backoff = Backoff::new();
        let mut reconnecting = false;

        loop {
            if self.cancellation.is_cancelled() {
                self.set_state(SessionState::Closing);
                self.set_state(SessionState::Disconnected);
                return;
            }

            match self.run_one_connection(&mut backoff, reconnecting).await {
                Ok(()) => {
                    self.set_state(SessionState::Disconnected);
                    return;
                }
                Err(error) => {
                    warn!(network = %self.config.network, error = %error, "IRC session connection ended");
                    let _ = self.events.publish(Event::IrcDisconnected {
                        network: self.config.network.clone(),
                        reason: error.to_string(),
                    });
                    if self.cancellation.is_cancelled() {
                        self.set_state(SessionState::Disconnected);
                        return;
                    }
                    self.set_state(SessionState::BackingOff);
                    let delay = backoff.next_delay();
                    tokio::select! {
                        () = tokio::time::sleep(delay) => {}
                        () = self.cancellation.cancelled() => {
                            self.set_state(SessionState::Disconnected);
                            return;
                        }
                    }
                    self.metrics.inc_irc_reconnect(&self.config.network);
                    reconnecting = true;
                }
            }
        }
    }

    /// Run one full connect→ready→disconnect cycle. `Ok(())` only when
    /// shutdown was requested; any connection failure is `Err`.
    async fn run_one_connection(&self, backoff: &mut Backoff, reconnecting: bool) -> IrcResult<()> {
        self.set_state(SessionState::Connecting);
        let (mut reader, mut writer) = connection::dial(
            &self.config.server,
            self.config.port,
            self.config.tls,
            self.config.connect_timeout,
        )
        .await?;
        if self.config.tls {
            self.set_state(SessionState::TlsHandshake);
        }

        self.set_state(SessionState::Registering);
        self.register(&mut writer).await?;
        let nick = self.wait_for_registration(&mut reader, &mut writer).await?;

        self.set_state(SessionState::Identifying);
        self.identify(&mut reader, &mut writer, &nick).await?;

        self.set_state(SessionState::Joining);
        self.join_channels(&mut reader, &mut writer).await?;

        self.set_state(SessionState::Ready);
        if reconnecting {
            let _ = self.events.publish(Event::IrcReconnected {
                network: self.config.network.clone(),
                attempts: backoff.attempts(),
            });
        }
        let ready_since = tokio::time::Instant::now();
        let result = self.ready_loop(reader, writer).await;
        if ready_since.elapsed() >= Backoff::RESET_DWELL {
            backoff.reset();
        }
        result
    }

    async fn write_line(writer: &mut BoxedWriter, line: &str) -> IrcResult<()> {
        writer.write_all(line.as_bytes()).await?;
        writer.write_all(b"\r\n").await?;
        writer.flush().await?;
        Ok(())
    }

    async fn register(&self, writer: &mut BoxedWriter) -> IrcResult<()> {
        if self.config.sasl_account.is_some() {
            Self::write_line(writer, "CAP REQ :sasl").await?;
        }
        Self::write_line(writer, &format!("NICK {}", self.config.nick)).await?;
        Self::write_line(
            writer,
            &format!("USER {} 0 * :{}", self.config.username, self.config.realname),
        )
        .await
    }

    async fn wait_for_registration(&self, reader: &mut BoxedReader, writer: &mut BoxedWriter) -> IrcResult<String> {
        let nick = self.config.nick.clone();
        let deadline = tokio::time::Instant::now() + Duration::from_secs(30);

        if self.config.sasl_account.is_some() {
            self.negotiate_sasl(reader, writer, deadline).await?;
        }

        self.wait_for_welcome(reader, writer, nick, deadline).await
    }

    /// Completes the `CAP REQ :sasl` exchange `register()` started: waits for
    /// the CAP ACK, runs `AUTHENTICATE PLAIN`, then sends `CAP END` so the
    /// server resumes normal registration. The server withholds `001` until
    /// `CAP END` arrives, so this must run before `wait_for_welcome`.
    async fn negotiate_sasl(
        &self,
        reader: &mut BoxedReader,
        writer: &mut BoxedWriter,
        deadline: tokio::time::Instant,
    ) -> IrcResult<()> {
        loop {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            if remaining.is_zero() {
                return Err(IrcError::Timeout { phase: "registering" });
            }
            let line = self.read_line_with_deadline(reader, remaining).await?;
            if let Some(captures) = PING_RE.captures(&line) {
                Self::write_line(writer, &format!("PONG :{}", &captures["token"])).await?;
                continue;
            }
            if CAP_NAK_RE.is_match(&line) {
                return Err(IrcError::SaslRejected);
            }
            if CAP_ACK_RE.is_match(&line) {
                break;
            }
        }

        Self::write_line(writer, "AUTHENTICATE PLAIN").await?;
        loop {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            if remaining.is_zero() {
                return Err(IrcError::Timeout { phase: "registering" });
            }
            let line = self.read_line_with_deadline(reader, remaining).await?;
            if AUTHENTICATE_PROMPT_RE.is_match(&line) {
                break;
            }
        }

        let account = self.config.sasl_account.as_ref().expect("sasl_account present, checked by caller");
        let password = self
            .config
            .sasl_password
            .as_ref()
            .expect("sasl_password present alongside sasl_account");
        let payload = base64_plain(account, password);
        Self::write_line(writer, &format!("AUTHENTICATE {payload}")).await?;

        loop {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            if remaining.is_zero() {
                return Err(IrcError::Timeout { phase: "registering" });
            }
            let line = self.read_line_with_deadline(reader, remaining).await?;
            if SASL_SUCCESS_RE.is_match(&line) {
                break;
            }
            if SASL_FAILURE_RE.is_match(&line) {
                return Err(IrcError::SaslRejected);
            }
        }

        Self::write_line(writer, "CAP END").await
    }

    async fn wait_for_welcome(
        &self,
        reader: &mut BoxedReader,
        writer: &mut BoxedWriter,
        mut nick: String,
        deadline: tokio::time::Instant,
    ) -> IrcResult<String> {
        let mut attempts = 0u8;
        loop {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            if remaining.is_zero() {
                return Err(IrcError::Timeout { phase: "registering" });
            }
            let line = self.read_line_with_deadline(reader, remaining).await?;

            if NICK_IN_USE_RE.is_match(&line) {
                attempts += 1;
                if attempts > 3 {
                    return Err(IrcError::NickInUseExhausted { nick });
                }
                nick.push('_');
                Self::write_line(writer, &format!("NICK {nick}")).await?;
                continue;
            }
            if let Some(captures) = PING_RE.captures(&line) {
                Self::write_line(writer, &format!("PONG :{}", &captures["token"])).await?;
                continue;
            }
            // RPL_WELCOME (001) marks registration complete.
            if line.contains(" 001 ") {
                return Ok(nick);
            }
        }
    }

    async fn identify(&self, reader: &mut BoxedReader, writer: &mut BoxedWriter, nick: &str) -> IrcResult<()> {
        let Some(password) = &self.config.nickserv_password else {
            return Ok(());
        };
        Self::write_line(writer, &format!("PRIVMSG NickServ :IDENTIFY {nick} {password}")).await?;

        let deadline = Duration::from_secs(30);
        let line = self.read_line_with_deadline(reader, deadline).await?;
        if line.to_ascii_lowercase().contains("identified") {
            Ok(())
        } else {
            Err(IrcError::Timeout { phase: "identifying" })
        }
    }

    async fn join_channels(&self, reader: &mut BoxedReader, writer: &mut BoxedWriter) -> IrcResult<()> {
        for channel in &self.config.channels {
            Self::write_line(writer, &format!("JOIN {channel}")).await?;

            if let Some(invite_command) = self.config.invite_command_for(channel) {
                Self::write_line(writer, invite_command).await?;
                self.set_state(SessionState::AwaitingInvites);
                let deadline = Duration::from_secs(30);
                loop {
                    let line = self.read_line_with_deadline(reader, deadline).await?;
                    if let Some(captures) = INVITE_RE.captures(&line) {
                        if captures["channel"].eq_ignore_ascii_case(channel) {
                            break;
                        }
                    }
                }
                Self::write_line(writer, &format!("JOIN {channel}")).await?;
                self.set_state(SessionState::Joining);
            }
        }
        Ok(())
    }

    async fn ready_loop(&self, mut reader: BoxedReader, writer: BoxedWriter) -> IrcResult<()> {
        let writer_cancellation = self.cancellation.child_token();
        let writer_task = tokio::spawn(Self::writer_loop(
            writer,
            Arc::clone(&self.mailbox),
            writer_cancellation.clone(),
        ));

        let result = self.read_announce_lines(&mut reader).await;
        writer_cancellation.cancel();
        let _ = writer_task.await;
        result
    }

    async fn writer_loop(mut writer: BoxedWriter, mailbox: Arc<OutboundMailbox>, cancellation: CancellationToken) {
        loop {
            tokio::select! {
                () = cancellation.cancelled() => return,
                command = mailbox.pop() => {
                    if Self::write_line(&mut writer, command.as_line()).await.is_err() {
                        return;
                    }
                }
            }
        }
    }

    async fn read_announce_lines(&self, reader: &mut BoxedReader) -> IrcResult<()> {
        let mut last_pong = tokio::time::Instant::now();
        let mut ping_interval = tokio::time::interval(self.config.ping_interval);
        ping_interval.tick().await;

        loop {
            tokio::select! {
                () = self.cancellation.cancelled() => {
                    self.set_state(SessionState::Closing);
                    self.mailbox.push(OutboundCommand::Line("QUIT :shutting down".to_string()));
                    return Ok(());
                }
                _ = ping_interval.tick() => {
                    if last_pong.elapsed() > self.config.pong_timeout {
                        return Err(IrcError::Timeout { phase: "ready" });
                    }
                    self.mailbox.push(OutboundCommand::Ping(format!("PING :{}", self.config.network)));
                }
                line = read_line(reader) => {
                    let line = line?;
                    if let Some(captures) = PING_RE.captures(&line) {
                        self.mailbox.push(OutboundCommand::Line(format!("PONG :{}", &captures["token"])));
                        continue;
                    }
                    if line.contains(" PONG ") {
                        last_pong = tokio::time::Instant::now();
                        continue;
                    }
                    self.dispatch_privmsg(&line);
                }
            }
        }
    }

    fn dispatch_privmsg(&self, line: &str) {
        let Some(captures) = PRIVMSG_RE.captures(line) else {
            return;
        };
        let nick = &captures["nick"];
        let target = &captures["target"];
        let payload = &captures["payload"];

        if !self.config.announcers.iter().any(|a| a.eq_ignore_ascii_case(nick)) {
            return;
        }
        if !self.config.channels.iter().any(|c| c.eq_ignore_ascii_case(target)) {
            return;
        }

        let announce = AnnounceLine {
            network: self.config.network.clone(),
            channel: target.to_string(),
            announcer: nick.to_string(),
            payload: payload.to_string(),
            timestamp: Utc::now(),
        };
        if self.announce_tx.try_send(announce).is_err() {
            warn!(network = %self.config.network, "pipeline inbound queue full, dropping announce line");
        }
    }

    async fn read_line_with_deadline(&self, reader: &mut BoxedReader, timeout: Duration) -> IrcResult<String> {
        tokio::time::timeout(timeout, read_line(reader))
            .await
            .map_err(|_| IrcError::Timeout { phase: "handshake" })?
    }
}

async fn read_line(reader: &mut BoxedReader) -> IrcResult<String> {
    let mut line = String::new();
    let bytes = reader.read_line(&mut line).await?;
    if bytes == 0 {
        return Err(IrcError::ConnectionClosed);
    }
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

fn base64_plain(account: &str, password: &str) -> String {
    let raw = format!("{account}\0{account}\0{password}");
    general_purpose::STANDARD.encode(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn privmsg_regex_extracts_nick_target_and_payload() {
        let captures = PRIVMSG_RE
            .captures(":Drone!drone@tracker PRIVMSG #announce :Artist - Album [FLAC] - https://t/1")
            .unwrap();
        assert_eq!(&captures["nick"], "Drone");
        assert_eq!(&captures["target"], "#announce");
        assert_eq!(&captures["payload"], "Artist - Album [FLAC] - https://t/1");
    }

    #[test]
    fn invite_regex_extracts_channel() {
        let captures = INVITE_RE.captures(":PT-BOT!bot@tracker INVITE brrclient :#announce").unwrap();
        assert_eq!(&captures["channel"], "#announce");
    }

    #[test]
    fn sasl_plain_payload_matches_known_vector() {
        // "tim\0tim\0tanstaaftanstaaf" is the canonical RFC 4616 PLAIN example.
        assert_eq!(base64_plain("tim", "tanstaaftanstaaf"), "dGltAHRpbQB0YW5zdGFhZnRhbnN0YWFm");
    }

    #[test]
    fn cap_ack_and_nak_regexes_match_sasl_capability_replies() {
        assert!(CAP_ACK_RE.is_match(":irc.example.net CAP * ACK :sasl"));
        assert!(CAP_NAK_RE.is_match(":irc.example.net CAP * NAK :sasl"));
        assert!(!CAP_ACK_RE.is_match(":irc.example.net CAP * ACK :multi-prefix"));
    }

    #[test]
    fn authenticate_prompt_regex_matches_continuation_only() {
        assert!(AUTHENTICATE_PROMPT_RE.is_match("AUTHENTICATE +"));
        assert!(!AUTHENTICATE_PROMPT_RE.is_match("AUTHENTICATE PLAIN"));
    }

    #[test]
    fn sasl_numeric_regexes_match_success_and_failure_replies() {
        assert!(SASL_SUCCESS_RE.is_match(":irc.example.net 903 brrclient :SASL authentication successful"));
        assert!(SASL_FAILURE_RE.is_match(":irc.example.net 904 brrclient :SASL authentication failed"));
        assert!(!SASL_FAILURE_RE.is_match(":irc.example.net 903 brrclient :SASL authentication successful"));
    }
}
