//! Retry policy
//!
//! The schedule is plain data rather than control flow: a policy says how
//! many attempts to make and how the backoff grows, and the dispatcher
//! executes it. Keeping the schedule inert makes it trivially configurable
//! and lets the whole loop sit under one external deadline.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Bounded-retry schedule with multiplicative backoff.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total delivery attempts, including the first.
    pub max_attempts: u32,
    /// Wait after the first failed attempt.
    pub initial_backoff_ms: u64,
    /// Growth factor applied per further failure.
    pub backoff_multiplier: f64,
    /// Ceiling on any single wait.
    pub max_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 100,
            backoff_multiplier: 2.0,
            max_backoff_ms: 5_000,
        }
    }
}

impl RetryPolicy {
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_initial_backoff_ms(mut self, initial_backoff_ms: u64) -> Self {
        self.initial_backoff_ms = initial_backoff_ms;
        self
    }

    pub fn with_backoff_multiplier(mut self, backoff_multiplier: f64) -> Self {
        self.backoff_multiplier = backoff_multiplier;
        self
    }

    pub fn with_max_backoff_ms(mut self, max_backoff_ms: u64) -> Self {
        self.max_backoff_ms = max_backoff_ms;
        self
    }

    /// Wait before the retry that follows the given 1-based failed attempt.
    pub fn backoff_after(&self, failed_attempt: u32) -> Duration {
        let exponent = failed_attempt.saturating_sub(1).min(31);
        let grown =
            self.initial_backoff_ms as f64 * self.backoff_multiplier.powi(exponent as i32);
        Duration::from_millis((grown as u64).min(self.max_backoff_ms))
    }
}
