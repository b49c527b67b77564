//! Reconnect backoff

use std::time::Duration;

use crate::config::ReconnectConfig;

/// Capped multiplicative reconnect delay
///
/// Starts at the initial delay. Every [`advance`](Self::advance) multiplies
/// the current delay and caps it; [`reset`](Self::reset) goes back to the
/// initial delay.
#[derive(Debug, Clone)]
pub struct ReconnectBackoff {
    initial_ms: u64,
    max_ms: u64,
    multiplier: f64,
    current_ms: u64,
}

impl ReconnectBackoff {
    pub fn new(initial_ms: u64, max_ms: u64, multiplier: f64) -> Self {
        let max_ms = max_ms.max(initial_ms);
        Self {
            initial_ms,
            max_ms,
            multiplier: multiplier.max(1.0),
            current_ms: initial_ms,
        }
    }

    pub fn from_config(config: &ReconnectConfig) -> Self {
        Self::new(config.initial_delay_ms, config.max_delay_ms, config.multiplier)
    }

    /// Current delay in milliseconds
    pub fn current_ms(&self) -> u64 {
        self.current_ms
    }

    pub fn current(&self) -> Duration {
        Duration::from_millis(self.current_ms)
    }

    /// Grow the delay and return the new value
    pub fn advance(&mut self) -> Duration {
        let next = (self.current_ms as f64 * self.multiplier).round();
        self.current_ms = if next >= self.max_ms as f64 {
            self.max_ms
        } else {
            next as u64
        };
        self.current()
    }

    pub fn reset(&mut self) {
        self.current_ms = self.initial_ms;
    }
}

impl Default for ReconnectBackoff {
    fn default() -> Self {
        Self::from_config(&ReconnectConfig::default())
    }
}
