//! Reconnection delay.

use std::time::Duration;

/// Doubling reconnection delay with a ceiling.
///
/// `next_delay` hands out the current delay and doubles it for the next
/// failure; `reset` restores the initial delay after a successful open.
#[derive(Debug, Clone)]
pub struct ReconnectBackoff {
    initial: Duration,
    max: Duration,
    current: Duration,
}

impl ReconnectBackoff {
    /// Creates a backoff starting at `initial`, capped at `max`.
    pub fn new(initial: Duration, max: Duration) -> Self {
        let max = max.max(initial);
        Self {
            initial,
            max,
            current: initial,
        }
    }

    /// Returns the delay the next wait will use.
    pub fn current(&self) -> Duration {
        self.current
    }

    /// Returns the delay to wait now and doubles the next one.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = self.current.saturating_mul(2).min(self.max);
        delay
    }

    /// Restores the initial delay.
    pub fn reset(&mut self) {
        self.current = self.initial;
    }
}
