//! Connect retry policy

use crate::types::BackoffKind;
use std::time::Duration;

/// Delay schedule between failed connect attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Same delay after every failure
    Fixed(Duration),
    /// `base * 2^(attempt-1)`, capped at `max`
    Exponential { base: Duration, max: Duration },
}

/// Bounded connect retry policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total connect attempts, first one included
    pub max_attempts: u32,
    pub backoff: Backoff,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Backoff) -> Self {
        Self {
            max_attempts,
            backoff,
        }
    }

    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self::new(max_attempts, Backoff::Fixed(delay))
    }

    pub fn exponential(max_attempts: u32, base: Duration, max: Duration) -> Self {
        Self::new(max_attempts, Backoff::Exponential { base, max })
    }

    /// Build from configuration values
    pub fn from_settings(max_attempts: u32, delay: Duration, kind: BackoffKind) -> Self {
        match kind {
            BackoffKind::Fixed => Self::fixed(max_attempts, delay),
            BackoffKind::Exponential => {
                Self::exponential(max_attempts, delay, crate::defaults::MAX_BACKOFF_DELAY.max(delay))
            }
        }
    }

    /// Whether another attempt is allowed after `attempts_made` failures
    pub fn should_retry(&self, attempts_made: u32) -> bool {
        attempts_made < self.max_attempts
    }

    /// Delay to wait after failed attempt number `attempt` (1-based).
    /// `None` once the attempt budget is spent.
    pub fn delay_for(&self, attempt: u32) -> Option<Duration> {
        if attempt == 0 || !self.should_retry(attempt) {
            return None;
        }

        let delay = match self.backoff {
            Backoff::Fixed(delay) => delay,
            Backoff::Exponential { base, max } => {
                let factor = 1u32.checked_shl(attempt - 1).unwrap_or(u32::MAX);
                base.checked_mul(factor).unwrap_or(max).min(max)
            }
        };

        Some(delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_backoff_stops_at_limit() {
        let policy = RetryPolicy::fixed(3, Duration::from_secs(5));

        assert_eq!(policy.delay_for(1), Some(Duration::from_secs(5)));
        assert_eq!(policy.delay_for(2), Some(Duration::from_secs(5)));
        // No sleep after the final failed attempt
        assert_eq!(policy.delay_for(3), None);
        assert!(policy.should_retry(2));
        assert!(!policy.should_retry(3));
    }

    #[test]
    fn test_exponential_backoff_doubles_and_caps() {
        let policy = RetryPolicy::exponential(10, Duration::from_millis(100), Duration::from_millis(500));

        assert_eq!(policy.delay_for(1), Some(Duration::from_millis(100)));
        assert_eq!(policy.delay_for(2), Some(Duration::from_millis(200)));
        assert_eq!(policy.delay_for(3), Some(Duration::from_millis(400)));
        assert_eq!(policy.delay_for(4), Some(Duration::from_millis(500)));
        assert_eq!(policy.delay_for(9), Some(Duration::from_millis(500)));
    }

    #[test]
    fn test_exponential_large_attempt_does_not_overflow() {
        let policy = RetryPolicy::exponential(100, Duration::from_secs(1), Duration::from_secs(300));
        assert_eq!(policy.delay_for(64), Some(Duration::from_secs(300)));
    }

    #[test]
    fn test_single_attempt_never_sleeps() {
        let policy = RetryPolicy::fixed(1, Duration::from_secs(1));
        assert_eq!(policy.delay_for(1), None);
        assert!(!policy.should_retry(1));
    }

    #[test]
    fn test_from_settings() {
        let fixed = RetryPolicy::from_settings(3, Duration::from_secs(2), BackoffKind::Fixed);
        assert_eq!(fixed.backoff, Backoff::Fixed(Duration::from_secs(2)));

        let exp = RetryPolicy::from_settings(3, Duration::from_secs(2), BackoffKind::Exponential);
        assert!(matches!(exp.backoff, Backoff::Exponential { .. }));
    }
}
