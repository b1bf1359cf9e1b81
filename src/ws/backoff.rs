//! Bounded exponential reconnect policy
//!
//! Delay doubles per attempt from a base up to a cap, and the attempt budget
//! is fixed: 5s, 10s, 20s, 30s, 30s, ... for at most 10 attempts with the
//! defaults. Converges quickly for transient blips without hammering the
//! server during an outage.

use std::time::Duration;

/// Reconnect scheduling policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Delay before the first retry
    pub base_delay: Duration,
    /// Upper bound on any retry delay
    pub max_delay: Duration,
    /// Retry budget since the last successful open
    pub max_attempts: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(5),
            max_delay: Duration::from_secs(30),
            max_attempts: 10,
        }
    }
}

impl ReconnectPolicy {
    /// Create a policy with explicit parameters
    pub fn new(base_delay: Duration, max_delay: Duration, max_attempts: u32) -> Self {
        Self {
            base_delay,
            max_delay,
            max_attempts,
        }
    }

    /// Delay before the given attempt fires
    ///
    /// `attempt` is 1-based: `base * 2^(attempt-1)`, capped at `max_delay`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(31);
        self.base_delay
            .saturating_mul(1u32 << exp)
            .min(self.max_delay)
    }

    /// True once the attempt counter has passed the budget
    #[inline]
    pub fn exhausted(&self, attempt: u32) -> bool {
        attempt > self.max_attempts
    }
}
