//! Builds one [`SessionConfig`] per distinct `(network, server, port)` out
//! of every loaded indexer definition, merging channels and announcers for
//! indexers that share a network.
//!
//! `spec.md` does not name a per-network credential store; each network's
//! nick/SASL/NickServ identity, and its invite command where the indexer
//! definition requires one, is read from `IRC_<NETWORK>_*` environment
//! variables, keyed by the network name upper-cased with non-alphanumeric
//! characters replaced by `_` — the same environment-variable convention
//! `autobrr_config::AppConfig::from_env` uses for process-level settings.

use std::collections::BTreeMap;

use autobrr_indexer::{IrcConfig, RegistrySnapshot};
use autobrr_irc::SessionConfig;

use crate::error::{AppError, AppResult};

/// Build one deduplicated [`SessionConfig`] per `(network, server, port)`.
///
/// # Errors
///
/// Returns an error if a network's `IRC_<NETWORK>_NICK` environment variable
/// is unset.
pub fn build_session_configs(snapshot: &RegistrySnapshot) -> AppResult<Vec<SessionConfig>> {
    let mut by_key: BTreeMap<(String, String, u16), SessionConfig> = BTreeMap::new();

    for definition in snapshot.definitions() {
        let irc = &definition.definition.irc;
        let key = (irc.network.clone(), irc.server.clone(), irc.port);
        match by_key.get_mut(&key) {
            Some(existing) => merge_channels_and_announcers(existing, irc),
            None => {
                by_key.insert(key, session_config_for(irc)?);
            }
        }
    }

    Ok(by_key.into_values().collect())
}

fn merge_channels_and_announcers(config: &mut SessionConfig, irc: &IrcConfig) {
    for channel in &irc.channels {
        if !config.channels.contains(channel) {
            config.channels.push(channel.clone());
        }
    }
    for announcer in &irc.announcers {
        if !config.announcers.contains(announcer) {
            config.announcers.push(announcer.clone());
        }
    }

    // A network's invite command is configured once and applies to every
    // channel on it; extend coverage to channels merged in from this definition.
    if let Some(command) = config.invite_commands.first().map(|(_, command)| command.clone()) {
        for channel in &config.channels {
            if !config.invite_commands.iter().any(|(chan, _)| chan == channel) {
                config.invite_commands.push((channel.clone(), command.clone()));
            }
        }
    }
}

fn session_config_for(irc: &IrcConfig) -> AppResult<SessionConfig> {
    let env_key = network_env_key(&irc.network);
    let nick = std::env::var(format!("IRC_{env_key}_NICK")).map_err(|_| AppError::MissingEnv {
        name: "IRC_<NETWORK>_NICK",
    })?;
    let username = std::env::var(format!("IRC_{env_key}_USERNAME")).unwrap_or_else(|_| nick.clone());
    let realname = std::env::var(format!("IRC_{env_key}_REALNAME")).unwrap_or_else(|_| "autobrr".to_string());
    let sasl_account = std::env::var(format!("IRC_{env_key}_SASL_ACCOUNT")).ok();
    let sasl_password = std::env::var(format!("IRC_{env_key}_SASL_PASSWORD")).ok();
    let nickserv_password = std::env::var(format!("IRC_{env_key}_NICKSERV_PASSWORD")).ok();
    let invite_command = std::env::var(format!("IRC_{env_key}_INVITE_COMMAND")).ok();
    let invite_commands = invite_commands_for(&irc.channels, invite_command.as_deref());

    Ok(SessionConfig {
        network: irc.network.clone(),
        server: irc.server.clone(),
        port: irc.port,
        tls: irc.tls,
        nick,
        username,
        realname,
        sasl_account,
        sasl_password,
        nickserv_password,
        channels: irc.channels.clone(),
        announcers: irc.announcers.clone(),
        invite_commands,
        connect_timeout: SessionConfig::DEFAULT_CONNECT_TIMEOUT,
        ping_interval: SessionConfig::DEFAULT_PING_INTERVAL,
        pong_timeout: SessionConfig::DEFAULT_PONG_TIMEOUT,
    })
}

/// Pairs `command` with every channel, when a network's `IRC_<NETWORK>_INVITE_COMMAND`
/// is configured. Indexer definitions declare `invite_command` as a single
/// per-network setting, so the same command applies to every channel joined
/// on that network.
fn invite_commands_for(channels: &[String], command: Option<&str>) -> Vec<(String, String)> {
    match command {
        Some(command) => channels.iter().map(|channel| (channel.clone(), command.to_string())).collect(),
        None => Vec::new(),
    }
}

fn network_env_key(network: &str) -> String {
    network
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn network_env_key_upper_cases_and_replaces_punctuation() {
        assert_eq!(network_env_key("PassThePopcorn"), "PASSTHEPOPCORN");
        assert_eq!(network_env_key("Orpheus-Network"), "ORPHEUS_NETWORK");
    }

    #[test]
    fn merge_deduplicates_channels_and_announcers() {
        let mut config = SessionConfig {
            network: "TestNet".to_string(),
            server: "irc.test.invalid".to_string(),
            port: 6697,
            tls: true,
            nick: "nick".to_string(),
            username: "nick".to_string(),
            realname: "autobrr".to_string(),
            sasl_account: None,
            sasl_password: None,
            nickserv_password: None,
            channels: vec!["#one".to_string()],
            announcers: vec!["Bot-A".to_string()],
            invite_commands: Vec::new(),
            connect_timeout: SessionConfig::DEFAULT_CONNECT_TIMEOUT,
            ping_interval: SessionConfig::DEFAULT_PING_INTERVAL,
            pong_timeout: SessionConfig::DEFAULT_PONG_TIMEOUT,
        };

        let other_indexer_yaml = r"
identifier: other
name: Other Tracker
protocol: torrent
supports: [irc]
irc:
  network: TestNet
  server: irc.test.invalid
  port: 6697
  tls: true
  channels: ['#one', '#two']
  announcers: ['Bot-A', 'Bot-B']
  parse:
    type: single
    lines:
      - pattern: '^(?P<torrentName>.+)$'
        vars: [torrentName]
    match:
      infourl: 'https://test.invalid'
      torrenturl: 'https://test.invalid'
";
        let definition: autobrr_indexer::IndexerDefinition = serde_yaml::from_str(other_indexer_yaml).unwrap();
        merge_channels_and_announcers(&mut config, &definition.irc);

        assert_eq!(config.channels, vec!["#one".to_string(), "#two".to_string()]);
        assert_eq!(config.announcers, vec!["Bot-A".to_string(), "Bot-B".to_string()]);
    }

    #[test]
    fn invite_commands_for_pairs_every_channel_when_configured() {
        let channels = vec!["#one".to_string(), "#two".to_string()];
        assert_eq!(invite_commands_for(&channels, None), Vec::new());
        assert_eq!(
            invite_commands_for(&channels, Some("PRIVMSG PT-BOT :invite KEY")),
            vec![
                ("#one".to_string(), "PRIVMSG PT-BOT :invite KEY".to_string()),
                ("#two".to_string(), "PRIVMSG PT-BOT :invite KEY".to_string()),
            ]
        );
    }

    #[test]
    fn merge_extends_invite_command_to_newly_merged_channels() {
        let mut config = SessionConfig {
            network: "TestNet".to_string(),
            server: "irc.test.invalid".to_string(),
            port: 6697,
            tls: true,
            nick: "nick".to_string(),
            username: "nick".to_string(),
            realname: "autobrr".to_string(),
            sasl_account: None,
            sasl_password: None,
            nickserv_password: None,
            channels: vec!["#one".to_string()],
            announcers: vec!["Bot-A".to_string()],
            invite_commands: vec![("#one".to_string(), "PRIVMSG PT-BOT :invite KEY".to_string())],
            connect_timeout: SessionConfig::DEFAULT_CONNECT_TIMEOUT,
            ping_interval: SessionConfig::DEFAULT_PING_INTERVAL,
            pong_timeout: SessionConfig::DEFAULT_PONG_TIMEOUT,
        };

        let other_indexer_yaml = r"
identifier: other
name: Other Tracker
protocol: torrent
supports: [irc]
irc:
  network: TestNet
  server: irc.test.invalid
  port: 6697
  tls: true
  channels: ['#one', '#two']
  announcers: ['Bot-A']
  parse:
    type: single
    lines:
      - pattern: '^(?P<torrentName>.+)$'
        vars: [torrentName]
    match:
      infourl: 'https://test.invalid'
      torrenturl: 'https://test.invalid'
";
        let definition: autobrr_indexer::IndexerDefinition = serde_yaml::from_str(other_indexer_yaml).unwrap();
        merge_channels_and_announcers(&mut config, &definition.irc);

        assert_eq!(
            config.invite_commands,
            vec![
                ("#one".to_string(), "PRIVMSG PT-BOT :invite KEY".to_string()),
                ("#two".to_string(), "PRIVMSG PT-BOT :invite KEY".to_string()),
            ]
        );
    }
}
