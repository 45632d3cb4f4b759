//! Process-wide rate limiting for embedding-provider calls.
//!
//! A sliding one-minute window of acquisition instants, guarded by a single
//! async mutex. Waiters queue on the mutex in FIFO order; there is no
//! priority scheduling. Acquisition past the configured timeout fails with
//! `RateLimitTimeout` and is not retried at this layer.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::search::core::config::RateLimitConfig;
use crate::search::core::errors::{SearchError, SearchResult};

const WINDOW: Duration = Duration::from_secs(60);

/// Sliding-window rate limiter shared by all search invocations.
pub struct RateLimiter {
    config: RateLimitConfig,
    window: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    /// Create a new rate limiter.
    #[must_use]
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            window: Mutex::new(VecDeque::new()),
        }
    }

    /// Acquire one call slot, waiting until one frees up within the window.
    ///
    /// # Errors
    /// Returns `RateLimitTimeout` if no slot frees up before the configured
    /// acquisition timeout.
    pub async fn acquire(&self) -> SearchResult<()> {
        let started = Instant::now();
        let deadline = started + Duration::from_millis(self.config.acquire_timeout_ms);

        loop {
            let next_free = {
                let mut window = self.window.lock().await;
                let now = Instant::now();
                while let Some(front) = window.front() {
                    if now.duration_since(*front) >= WINDOW {
                        window.pop_front();
                    } else {
                        break;
                    }
                }

                if window.len() < self.config.max_per_minute {
                    window.push_back(now);
                    return Ok(());
                }

                // Oldest acquisition leaves the window first.
                window.front().map_or(now, |front| *front + WINDOW)
            };

            if next_free >= deadline {
                let waited_ms =
                    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
                return Err(SearchError::RateLimitTimeout { waited_ms });
            }

            tokio::time::sleep_until(next_free).await;
        }
    }

    /// Number of acquisitions currently inside the window.
    pub async fn in_flight(&self) -> usize {
        let mut window = self.window.lock().await;
        let now = Instant::now();
        while let Some(front) = window.front() {
            if now.duration_since(*front) >= WINDOW {
                window.pop_front();
            } else {
                break;
            }
        }
        window.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(max_per_minute: usize, acquire_timeout_ms: u64) -> RateLimiter {
        RateLimiter::new(RateLimitConfig {
            max_per_minute,
            acquire_timeout_ms,
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_acquires_up_to_limit() {
        let limiter = limiter(2, 1_000);
        limiter.acquire().await.expect("first");
        limiter.acquire().await.expect("second");
        assert_eq!(limiter.in_flight().await, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out_when_window_full() {
        let limiter = limiter(1, 1_000);
        limiter.acquire().await.expect("first");
        let err = limiter.acquire().await.expect_err("window full");
        assert!(matches!(err, SearchError::RateLimitTimeout { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slot_frees_after_window() {
        let limiter = limiter(1, 120_000);
        limiter.acquire().await.expect("first");
        // Auto-advancing paused time lets the sleep_until complete.
        limiter.acquire().await.expect("second after window");
        assert_eq!(limiter.in_flight().await, 1);
    }
}
