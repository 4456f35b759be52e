//! Capped exponential backoff between empty or failed polls.

use crate::config::BackoffConfig;
use std::time::Duration;

/// Backoff state for the worker's poll loop.
#[derive(Debug, Clone)]
pub struct Backoff {
    config: BackoffConfig,
    current: Duration,
}

impl Backoff {
    /// Creates a backoff starting at `config.initial`.
    #[must_use]
    pub fn new(config: BackoffConfig) -> Self {
        Self {
            current: config.initial.min(config.max),
            config,
        }
    }

    /// Returns the delay the next sleep will use.
    #[must_use]
    pub const fn current(&self) -> Duration {
        self.current
    }

    /// Returns the delay to sleep now and grows the next one by the
    /// configured factor, capped at the maximum.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = self.grown(delay);
        delay
    }

    /// Restores the initial delay after a successful poll.
    pub fn reset(&mut self) {
        self.current = self.config.initial.min(self.config.max);
    }

    #[expect(
        clippy::float_arithmetic,
        reason = "backoff growth factor is fractional"
    )]
    fn grown(&self, delay: Duration) -> Duration {
        Duration::try_from_secs_f64(delay.as_secs_f64() * self.config.factor)
            .map_or(self.config.max, |next| next.min(self.config.max))
    }
}
