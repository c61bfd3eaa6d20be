use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use governor::clock::DefaultClock;
use governor::state::direct::NotKeyed;
use governor::state::InMemoryState;
use governor::{Quota, RateLimiter};

/// Per-adapter budget for browser launches.
#[derive(Clone)]
pub struct LaunchThrottle {
    limiter: Arc<DirectRateLimiter>,
    per_minute: u32,
}

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

impl LaunchThrottle {
    pub fn per_minute(limit: u32) -> Self {
        let per_minute = limit.max(1);
        Self {
            limiter: Arc::new(RateLimiter::direct(quota_from_window(
                Duration::from_secs(60),
                per_minute,
            ))),
            per_minute,
        }
    }

    /// Takes one launch from the budget; `false` when it is exhausted.
    pub fn try_acquire(&self) -> bool {
        self.limiter.check().is_ok()
    }

    pub const fn limit(&self) -> u32 {
        self.per_minute
    }
}

impl std::fmt::Debug for LaunchThrottle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LaunchThrottle")
            .field("per_minute", &self.per_minute)
            .finish()
    }
}

fn quota_from_window(window: Duration, limit: u32) -> Quota {
    let burst = NonZeroU32::new(limit).unwrap_or(NonZeroU32::MIN);
    let seconds_per_cell = (window.as_secs_f64() / f64::from(burst.get())).max(0.001);

    Quota::with_period(Duration::from_secs_f64(seconds_per_cell))
        .unwrap_or_else(|| Quota::per_minute(burst))
        .allow_burst(burst)
}
