//! Exponential backoff with jitter for `BACKING_OFF` (`spec.md` §4.4):
//! base 5 s, cap 5 min, reset after a `READY` dwell of at least 30 s.

use std::time::Duration;

use rand::Rng;

/// Tracks reconnect attempts for one session and computes the next delay.
#[derive(Debug, Clone, Copy)]
pub struct Backoff {
    attempt: u32,
}

impl Backoff {
    /// Base delay before the first backoff.
    pub const BASE: Duration = Duration::from_secs(5);
    /// Maximum delay, regardless of attempt count.
    pub const CAP: Duration = Duration::from_secs(300);
    /// Minimum `READY` dwell time that resets the attempt counter.
    pub const RESET_DWELL: Duration = Duration::from_secs(30);

    /// A fresh backoff tracker with no attempts recorded.
    #[must_use]
    pub const fn new() -> Self {
        Self { attempt: 0 }
    }

    /// Record a failed connection attempt and return the delay to wait
    /// before the next one, with up to 20% jitter applied.
    pub fn next_delay(&mut self) -> Duration {
        let exponent = self.attempt.min(10);
        self.attempt = self.attempt.saturating_add(1);
        let scaled = Self::BASE.saturating_mul(1 << exponent).min(Self::CAP);
        jitter(scaled)
    }

    /// Reset the attempt counter after a sufficiently long `READY` dwell.
    pub fn reset(&mut self) {
        self.attempt = 0;
    }

    /// Number of reconnect attempts consumed since the last reset.
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        self.attempt
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new()
    }
}

fn jitter(base: Duration) -> Duration {
    let factor = rand::rng().random_range(0.8..=1.2_f64);
    #[expect(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "backoff delays stay well within u64 millisecond range"
    )]
    let millis = (base.as_millis() as f64 * factor) as u64;
    Duration::from_millis(millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_jitter_margin(base: Duration) -> Duration {
        Duration::from_millis(u64::try_from(base.as_millis()).unwrap_or(u64::MAX) * 12 / 10)
    }

    #[test]
    fn delays_grow_and_cap_at_five_minutes() {
        let mut backoff = Backoff::new();
        for _ in 0..15 {
            let delay = backoff.next_delay();
            assert!(delay <= with_jitter_margin(Backoff::CAP));
        }
    }

    #[test]
    fn reset_restarts_from_the_base_delay() {
        let mut backoff = Backoff::new();
        for _ in 0..5 {
            backoff.next_delay();
        }
        backoff.reset();
        let delay = backoff.next_delay();
        assert!(delay <= with_jitter_margin(Backoff::BASE));
    }
}
