//! Bounded retry policy shared by every adapter's session lifecycle.

use std::time::Duration;

/// Fixed-count, fixed-delay retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt. Total attempts = `max_retries + 1`.
    pub max_retries: u32,
    /// Pause before every retry.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::fixed(Duration::from_secs(2), 1)
    }
}

impl RetryPolicy {
    pub const fn fixed(delay: Duration, max_retries: u32) -> Self {
        Self { max_retries, delay }
    }

    pub const fn attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Delay to wait after the given 0-based attempt failed, or `None` when
    /// the budget is spent.
    pub fn delay_after(&self, attempt: u32) -> Option<Duration> {
        (attempt < self.max_retries).then_some(self.delay)
    }
}
