//! Bounded outbound command mailbox: capacity 64, overflow drops the oldest
//! non-`PING` command (`spec.md` §4.4 concurrency contract).

use std::collections::VecDeque;
use std::sync::Mutex;

use tokio::sync::Notify;
use tracing::warn;

use crate::model::OutboundCommand;

/// Single-writer-task outbound queue shared with the rest of the session.
pub struct OutboundMailbox {
    queue: Mutex<VecDeque<OutboundCommand>>,
    notify: Notify,
    capacity: usize,
}

impl OutboundMailbox {
    /// Create a mailbox with the given bounded capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            queue: Mutex::new(VecDeque::with_capacity(capacity)),
            notify: Notify::new(),
            capacity,
        }
    }

    /// Default capacity per `spec.md` §4.4: 64.
    pub const DEFAULT_CAPACITY: usize = 64;

    /// Enqueue a command, evicting the oldest non-`PING` command if full.
    pub fn push(&self, command: OutboundCommand) {
        {
            let mut queue = self.lock();
            if queue.len() >= self.capacity {
                if let Some(position) = queue.iter().position(|queued| !queued.is_ping()) {
                    let dropped = queue.remove(position);
                    warn!(
                        dropped = ?dropped.map(|c| c.as_line().to_string()),
                        "outbound mailbox full, dropped oldest non-PING command"
                    );
                } else {
                    warn!("outbound mailbox full of PINGs, dropping incoming command");
                    return;
                }
            }
            queue.push_back(command);
        }
        self.notify.notify_one();
    }

    /// Wait for and remove the next queued command.
    pub async fn pop(&self) -> OutboundCommand {
        loop {
            if let Some(command) = self.lock().pop_front() {
                return command;
            }
            self.notify.notified().await;
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<OutboundCommand>> {
        self.queue.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overflow_drops_oldest_non_ping() {
        let mailbox = OutboundMailbox::new(2);
        mailbox.push(OutboundCommand::Line("JOIN #a".to_string()));
        mailbox.push(OutboundCommand::Line("JOIN #b".to_string()));
        mailbox.push(OutboundCommand::Line("JOIN #c".to_string()));

        let queue = mailbox.lock();
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.front().unwrap().as_line(), "JOIN #b");
    }

    #[test]
    fn pings_are_never_evicted_by_a_full_queue_of_pings() {
        let mailbox = OutboundMailbox::new(1);
        mailbox.push(OutboundCommand::Ping("PING :1".to_string()));
        mailbox.push(OutboundCommand::Ping("PING :2".to_string()));

        let queue = mailbox.lock();
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.front().unwrap().as_line(), "PING :1");
    }

    #[tokio::test]
    async fn pop_waits_for_a_push() {
        let mailbox = std::sync::Arc::new(OutboundMailbox::new(4));
        let waiter = {
            let mailbox = mailbox.clone();
            tokio::spawn(async move { mailbox.pop().await })
        };
        tokio::task::yield_now().await;
        mailbox.push(OutboundCommand::Line("PRIVMSG #a :hi".to_string()));
        let command = waiter.await.unwrap();
        assert_eq!(command.as_line(), "PRIVMSG #a :hi");
    }
}
