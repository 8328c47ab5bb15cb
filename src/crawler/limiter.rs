//! Adaptive rate limiting
//!
//! One limiter instance covers the whole crawl. It bounds parallelism with a
//! semaphore and enforces a uniformly random pause in `[0, delay)` before
//! each fetch. The delay is adjusted AIMD-style around its initial value:
//! overload statuses add twice the step, successful responses subtract one
//! step, and the delay never leaves `[initial, 10 * initial]`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::sync::{AcquireError, OwnedSemaphorePermit, Semaphore};

/// Process-wide fetch throttle with an adjustable random delay
pub struct RateLimiter {
    /// Initial delay `D0` in milliseconds; also the floor
    base_ms: u64,

    /// Adjustment step `D0 / parallelism` in milliseconds
    step_ms: u64,

    /// Ceiling `10 * D0` in milliseconds
    max_ms: u64,

    /// Current upper bound of the random pause, updated concurrently
    delay_ms: AtomicU64,

    permits: Arc<Semaphore>,
}

impl RateLimiter {
    /// Creates a limiter with initial delay `D0` and the given parallelism cap
    pub fn new(initial_delay: Duration, parallelism: usize) -> Self {
        let parallelism = parallelism.max(1);
        let base_ms = initial_delay.as_millis() as u64;
        Self {
            base_ms,
            step_ms: base_ms / parallelism as u64,
            max_ms: base_ms.saturating_mul(10),
            delay_ms: AtomicU64::new(base_ms),
            permits: Arc::new(Semaphore::new(parallelism)),
        }
    }

    /// Acquires one of the parallelism permits
    pub async fn acquire(&self) -> Result<OwnedSemaphorePermit, AcquireError> {
        self.permits.clone().acquire_owned().await
    }

    /// Sleeps for a uniformly random duration in `[0, delay)`
    pub async fn pause(&self) {
        let pause = self.draw();
        if !pause.is_zero() {
            tokio::time::sleep(pause).await;
        }
    }

    fn draw(&self) -> Duration {
        let ceiling = self.delay_ms.load(Ordering::Relaxed);
        if ceiling == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::thread_rng().gen_range(0..ceiling))
    }

    /// Reacts to an overload status (429/502/503/504) by widening the delay
    ///
    /// Adds `2 * step`, clamped to `10 * D0`. Logs when the clamp engages.
    pub fn on_overload(&self, status: u16) {
        let increment = self.step_ms.saturating_mul(2);
        if increment == 0 {
            return;
        }
        let prev = self.fetch_update(|cur| cur.saturating_add(increment).min(self.max_ms));
        let now = prev.saturating_add(increment).min(self.max_ms);
        if prev.saturating_add(increment) > self.max_ms {
            tracing::warn!(
                "HTTP {}, delay clamped at maximum ({} ms)",
                status,
                self.max_ms
            );
        } else {
            tracing::info!(
                "HTTP {}, increasing delay by {} ms ({} ms)",
                status,
                increment,
                now
            );
        }
    }

    /// Reacts to a scraped response with `status < 400` by narrowing the delay
    ///
    /// Subtracts one step, but only while the delay sits above its initial
    /// value; the floor is `D0`.
    pub fn on_success(&self, status: u16) {
        if self.step_ms == 0 {
            return;
        }
        let updated = self.delay_ms.fetch_update(
            Ordering::SeqCst,
            Ordering::SeqCst,
            |cur| {
                if cur > self.base_ms {
                    Some(cur.saturating_sub(self.step_ms).max(self.base_ms))
                } else {
                    None
                }
            },
        );
        if let Ok(prev) = updated {
            tracing::info!(
                "STATUS {}, decreasing delay by {} ms ({} ms)",
                status,
                self.step_ms,
                prev.saturating_sub(self.step_ms).max(self.base_ms)
            );
        }
    }

    fn fetch_update(&self, f: impl Fn(u64) -> u64) -> u64 {
        let res = self
            .delay_ms
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |cur| Some(f(cur)));
        // the closure always returns Some, so fetch_update cannot fail
        res.unwrap_or_else(|v| v)
    }

    /// Current upper bound of the random pause
    pub fn current_delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms.load(Ordering::SeqCst))
    }

    /// The configured initial delay `D0`
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_ms)
    }
}
