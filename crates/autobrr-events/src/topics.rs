//! Event topic identifiers used across transports.

/// Machine-friendly discriminator for SSE consumers.
#[must_use]
pub const fn event_kind(event: &crate::payloads::Event) -> &'static str {
    event.kind()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payloads::Event;

    #[test]
    fn event_kind_matches_payload() {
        assert_eq!(
            event_kind(&Event::IrcDisconnected {
                network: "ptp".into(),
                reason: "eof".into()
            }),
            "irc_disconnected"
        );
        assert_eq!(
            event_kind(&Event::PushError {
                indexer: "ptp".into(),
                torrent_name: "n".into(),
                message: "timeout".into(),
            }),
            "push_error"
        );
    }
}
