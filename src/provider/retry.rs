//! Fixed-schedule retry policy

use std::time::Duration;

use backoff::backoff::Backoff;

/// Default retry bound: 2 retries, 3 attempts in total
pub const DEFAULT_MAX_RETRIES: u32 = 2;

/// Default delays before retry 1 and retry 2
pub const DEFAULT_BACKOFF_SCHEDULE_MS: [u64; 2] = [1_000, 3_000];

/// Bounded retry with an ordered delay schedule
///
/// Retry `n` waits `schedule[n]`, clamped to the last entry once the
/// schedule runs out. After `max_retries` delays the policy yields `None`
/// and the caller gives up.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    max_retries: u32,
    schedule: Vec<Duration>,
    retries_issued: u32,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, schedule: Vec<Duration>) -> Self {
        Self {
            max_retries,
            schedule,
            retries_issued: 0,
        }
    }

    pub fn from_millis(max_retries: u32, schedule_ms: &[u64]) -> Self {
        Self::new(
            max_retries,
            schedule_ms.iter().copied().map(Duration::from_millis).collect(),
        )
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Total attempts including the first one
    pub fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }

    /// Delay before the retry with index `retry` (0-based)
    pub fn delay_for(&self, retry: u32) -> Duration {
        let last = self.schedule.len().saturating_sub(1);
        self.schedule
            .get((retry as usize).min(last))
            .copied()
            .unwrap_or(Duration::ZERO)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_millis(DEFAULT_MAX_RETRIES, &DEFAULT_BACKOFF_SCHEDULE_MS)
    }
}

impl Backoff for RetryPolicy {
    fn reset(&mut self) {
        self.retries_issued = 0;
    }

    fn next_backoff(&mut self) -> Option<Duration> {
        if self.retries_issued >= self.max_retries {
            return None;
        }
        let delay = self.delay_for(self.retries_issued);
        self.retries_issued += 1;
        Some(delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_schedule() {
        let mut policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts(), 3);
        assert_eq!(policy.next_backoff(), Some(Duration::from_secs(1)));
        assert_eq!(policy.next_backoff(), Some(Duration::from_secs(3)));
        assert_eq!(policy.next_backoff(), None);
    }

    #[test]
    fn test_schedule_clamps_to_last_delay() {
        let mut policy = RetryPolicy::from_millis(4, &[100, 250]);
        let delays: Vec<_> = std::iter::from_fn(|| policy.next_backoff()).collect();
        assert_eq!(
            delays,
            vec![
                Duration::from_millis(100),
                Duration::from_millis(250),
                Duration::from_millis(250),
                Duration::from_millis(250),
            ]
        );
    }

    #[test]
    fn test_reset_restarts_schedule() {
        let mut policy = RetryPolicy::default();
        policy.next_backoff();
        policy.next_backoff();
        policy.reset();
        assert_eq!(policy.next_backoff(), Some(Duration::from_secs(1)));
    }

    #[test]
    fn test_empty_schedule_retries_immediately() {
        let policy = RetryPolicy::new(1, Vec::new());
        assert_eq!(policy.delay_for(0), Duration::ZERO);
    }
}
