//! Requests-per-second limiter shared by every call to one provider

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

/// FIFO rate limiter
///
/// Permits are handed out on a fixed grid `1 / rps` apart. A caller reserves
/// the next free slot under the mutex, releases it, then sleeps until its
/// slot. The tokio mutex queues waiters in arrival order.
#[derive(Debug)]
pub struct RateLimiter {
    interval: Duration,
    next_slot: Mutex<Option<Instant>>,
}

impl RateLimiter {
    /// Create a limiter admitting at most `requests_per_second` permits per second
    pub fn new(requests_per_second: f64) -> Self {
        let interval = Some(requests_per_second)
            .filter(|rps| rps.is_finite() && *rps > 0.0)
            .and_then(|rps| Duration::try_from_secs_f64(1.0 / rps).ok())
            .unwrap_or(Duration::from_secs(1));
        Self {
            interval,
            next_slot: Mutex::new(None),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Wait until a permit is available
    pub async fn acquire(&self) {
        let slot = {
            let mut next = self.next_slot.lock().await;
            let now = Instant::now();
            let slot = match *next {
                Some(reserved) if reserved > now => reserved,
                _ => now,
            };
            *next = Some(slot + self.interval);
            slot
        };

        tokio::time::sleep_until(slot).await;
    }
}
