//! Retrieval tuning knobs.
//!
//! Every value has a default; `SAWPRICE_*` environment variables override
//! them through [`RetrievalConfig::from_env`].
//!
//! | Variable | Default |
//! |----------|---------|
//! | `SAWPRICE_NAVIGATION_TIMEOUT_MS` | 20000 |
//! | `SAWPRICE_READINESS_TIMEOUT_MS` | 8000 |
//! | `SAWPRICE_READINESS_POLL_MS` | 250 |
//! | `SAWPRICE_SETTLE_MS` | 5000 |
//! | `SAWPRICE_NAV_RETRIES` | 1 |
//! | `SAWPRICE_NAV_RETRY_DELAY_MS` | 2000 |
//! | `SAWPRICE_SCROLL_MAX_ITERATIONS` | 6 |
//! | `SAWPRICE_SCROLL_PAUSE_MS` | 750 |
//! | `SAWPRICE_MAX_ITEMS` | 5 |
//! | `SAWPRICE_CLOSE_TIMEOUT_MS` | 5000 |
//! | `SAWPRICE_LAUNCHES_PER_MINUTE` | 30 |
//! | `SAWPRICE_USER_AGENT` | desktop Chrome UA |

use std::env;
use std::time::Duration;

use crate::{RetryPolicy, ValidationError};

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Timeouts, retry and extraction limits applied by every adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrievalConfig {
    pub navigation_timeout: Duration,
    pub readiness_timeout: Duration,
    pub readiness_poll: Duration,
    /// Fixed pause for sources without a readiness marker.
    pub settle: Duration,
    pub navigation_retry: RetryPolicy,
    pub scroll_max_iterations: u32,
    pub scroll_pause: Duration,
    pub max_items: usize,
    pub close_timeout: Duration,
    pub launches_per_minute: u32,
    pub user_agent: String,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            navigation_timeout: Duration::from_secs(20),
            readiness_timeout: Duration::from_secs(8),
            readiness_poll: Duration::from_millis(250),
            settle: Duration::from_secs(5),
            navigation_retry: RetryPolicy::default(),
            scroll_max_iterations: 6,
            scroll_pause: Duration::from_millis(750),
            max_items: 5,
            close_timeout: Duration::from_secs(5),
            launches_per_minute: 30,
            user_agent: String::from(DEFAULT_USER_AGENT),
        }
    }
}

impl RetrievalConfig {
    /// Defaults overridden by `SAWPRICE_*` variables from the process environment.
    pub fn from_env() -> Result<Self, ValidationError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ValidationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(ms) = read_u64(&lookup, "SAWPRICE_NAVIGATION_TIMEOUT_MS")? {
            config.navigation_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = read_u64(&lookup, "SAWPRICE_READINESS_TIMEOUT_MS")? {
            config.readiness_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = read_u64(&lookup, "SAWPRICE_READINESS_POLL_MS")? {
            config.readiness_poll = Duration::from_millis(ms.max(1));
        }
        if let Some(ms) = read_u64(&lookup, "SAWPRICE_SETTLE_MS")? {
            config.settle = Duration::from_millis(ms);
        }
        if let Some(retries) = read_u64(&lookup, "SAWPRICE_NAV_RETRIES")? {
            config.navigation_retry.max_retries = to_u32("SAWPRICE_NAV_RETRIES", retries)?;
        }
        if let Some(ms) = read_u64(&lookup, "SAWPRICE_NAV_RETRY_DELAY_MS")? {
            config.navigation_retry.delay = Duration::from_millis(ms);
        }
        if let Some(count) = read_u64(&lookup, "SAWPRICE_SCROLL_MAX_ITERATIONS")? {
            config.scroll_max_iterations = to_u32("SAWPRICE_SCROLL_MAX_ITERATIONS", count)?;
        }
        if let Some(ms) = read_u64(&lookup, "SAWPRICE_SCROLL_PAUSE_MS")? {
            config.scroll_pause = Duration::from_millis(ms);
        }
        if let Some(count) = read_u64(&lookup, "SAWPRICE_MAX_ITEMS")? {
            if count == 0 {
                return Err(ValidationError::InvalidConfig {
                    key: "SAWPRICE_MAX_ITEMS",
                    value: count.to_string(),
                });
            }
            config.max_items = usize::try_from(count).unwrap_or(usize::MAX);
        }
        if let Some(ms) = read_u64(&lookup, "SAWPRICE_CLOSE_TIMEOUT_MS")? {
            config.close_timeout = Duration::from_millis(ms);
        }
        if let Some(count) = read_u64(&lookup, "SAWPRICE_LAUNCHES_PER_MINUTE")? {
            config.launches_per_minute = to_u32("SAWPRICE_LAUNCHES_PER_MINUTE", count)?.max(1);
        }
        if let Some(agent) = lookup("SAWPRICE_USER_AGENT").filter(|value| !value.trim().is_empty()) {
            config.user_agent = agent.trim().to_owned();
        }

        Ok(config)
    }

    /// Longest time one adapter invocation can take before it settles.
    pub fn worst_case_budget(&self) -> Duration {
        let attempts = self.navigation_retry.attempts();
        let navigation = self.navigation_timeout * attempts
            + self.navigation_retry.delay * self.navigation_retry.max_retries;
        let readiness = self.readiness_timeout.max(self.settle);
        let scrolling = self.scroll_pause * self.scroll_max_iterations;
        navigation + readiness + scrolling + self.close_timeout
    }
}

fn read_u64<F>(lookup: &F, key: &'static str) -> Result<Option<u64>, ValidationError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return Ok(None);
    };
    raw.trim()
        .parse::<u64>()
        .map(Some)
        .map_err(|_| ValidationError::InvalidConfig { key, value: raw })
}

fn to_u32(key: &'static str, value: u64) -> Result<u32, ValidationError> {
    u32::try_from(value).map_err(|_| ValidationError::InvalidConfig {
        key,
        value: value.to_string(),
    })
}
