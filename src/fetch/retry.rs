use crate::config::FetchConfig;
use std::time::Duration;

/// Per-operation retry counters
///
/// Created at the start of a collection, threaded through every fetch of
/// that collection, and discarded at its end. Never shared between
/// operations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetryState {
    /// Attempts since the last success
    pub retry_count: u32,

    /// Consecutive rate-limit cooldowns on the current endpoint
    pub cooldown_count: u32,

    /// The endpoint was just rotated and has not been retried since
    pub session_was_reset: bool,
}

impl RetryState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a page that ended the attempt loop cleanly
    pub fn record_success(&mut self) {
        self.retry_count = 0;
        self.cooldown_count = 0;
        self.session_was_reset = false;
    }

    /// Records giving up; the next fetch starts with a fresh budget
    pub fn give_up(&mut self) {
        self.retry_count = 0;
    }
}

/// Fixed delays and thresholds of the retry policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Politeness delay after every attempt
    pub attempt_delay: Duration,

    /// Delay after rotating to another endpoint
    pub rotate_delay: Duration,

    /// Wait after a rate-limited response
    pub cooldown_delay: Duration,

    /// Consecutive cooldowns before re-binding the same endpoint
    pub cooldown_threshold: u32,

    /// Jitter range between pages of one feed
    pub page_jitter: (Duration, Duration),
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&FetchConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(config: &FetchConfig) -> Self {
        Self {
            attempt_delay: Duration::from_millis(config.attempt_delay_ms),
            rotate_delay: Duration::from_millis(config.rotate_delay_ms),
            cooldown_delay: Duration::from_millis(config.cooldown_delay_ms),
            cooldown_threshold: config.cooldown_threshold.max(1),
            page_jitter: (
                Duration::from_millis(config.page_jitter_min_ms),
                Duration::from_millis(config.page_jitter_max_ms),
            ),
        }
    }

    /// A policy that never sleeps
    pub fn immediate() -> Self {
        Self {
            attempt_delay: Duration::ZERO,
            rotate_delay: Duration::ZERO,
            cooldown_delay: Duration::ZERO,
            cooldown_threshold: 5,
            page_jitter: (Duration::ZERO, Duration::ZERO),
        }
    }
}
