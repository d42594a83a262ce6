//! Client-side request rate limiting.
//!
//! A leaky-bucket limiter shared by every request a client sends. The
//! bucket holds `max_rate` units and drains continuously over `period`;
//! [`RateLimiter::acquire`] suspends the caller until the requested
//! weight fits. `RateLimiter::unlimited()` turns the limiter off without
//! changing call sites.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

/// Leaky-bucket rate limiter.
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
/// use pixiv_app_api::limiter::RateLimiter;
///
/// # async fn example() {
/// // At most 100 requests per minute.
/// let limiter = RateLimiter::new(100.0, Duration::from_secs(60));
/// limiter.acquire(1.0).await;
/// # }
/// ```
#[derive(Debug)]
pub struct RateLimiter {
    config: Option<Config>,
    state: Mutex<BucketState>,
}

#[derive(Debug, Clone, Copy)]
struct Config {
    max_rate: f64,
    period: Duration,
}

#[derive(Debug)]
struct BucketState {
    /// Currently committed weight in the bucket.
    level: f64,
    last_check: Instant,
}

impl RateLimiter {
    /// Creates a limiter allowing `max_rate` units per `period`.
    ///
    /// A non-positive `max_rate` or a zero `period` disables limiting.
    #[must_use]
    pub fn new(max_rate: f64, period: Duration) -> Self {
        let config = (max_rate > 0.0 && !period.is_zero()).then_some(Config { max_rate, period });
        Self {
            config,
            state: Mutex::new(BucketState {
                level: 0.0,
                last_check: Instant::now(),
            }),
        }
    }

    /// Creates a limiter that never blocks.
    #[must_use]
    pub fn unlimited() -> Self {
        Self {
            config: None,
            state: Mutex::new(BucketState {
                level: 0.0,
                last_check: Instant::now(),
            }),
        }
    }

    /// Whether this limiter actually limits.
    #[must_use]
    pub fn is_limited(&self) -> bool {
        self.config.is_some()
    }

    /// Acquires `weight` units of capacity, suspending until they fit.
    ///
    /// Holding the bucket lock across the sleep keeps acquisition fair:
    /// concurrent callers drain in arrival order rather than racing the
    /// refreshed level.
    pub async fn acquire(&self, weight: f64) {
        let Some(config) = self.config else {
            return;
        };
        let drain_rate = config.max_rate / config.period.as_secs_f64();
        let mut state = self.state.lock().await;
        loop {
            let now = Instant::now();
            let elapsed = now.duration_since(state.last_check).as_secs_f64();
            state.level = (state.level - elapsed * drain_rate).max(0.0);
            state.last_check = now;

            if state.level + weight <= config.max_rate {
                state.level += weight;
                return;
            }

            let needed = state.level + weight - config.max_rate;
            let wait = Duration::from_secs_f64(needed / drain_rate);
            debug!(wait_ms = wait.as_millis() as u64, "rate limit reached, waiting");
            tokio::time::sleep(wait).await;
        }
    }
}
