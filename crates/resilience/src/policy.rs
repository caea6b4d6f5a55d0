//! A `RetryPolicy`: how many times to try again, and how long to wait
//! between attempts. Shared by the scheduler's node-retry path and the
//! agent tool loop's tool-call retries, so both sides of the engine
//! compute backoff the same way.

use std::time::Duration;

/// How delay grows across attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffKind {
    /// Same delay every attempt.
    Fixed,
    /// `base_delay * 2^(attempt - 1)`, capped at `max_delay`.
    Exponential,
}

/// Retry configuration: attempt budget, backoff shape, and jitter.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first. `1` disables
    /// retrying entirely.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Upper bound on any computed delay.
    pub max_delay: Duration,
    /// How the delay grows with each successive attempt.
    pub backoff: BackoffKind,
    /// Jitter fraction in `[0.0, 1.0]`; `0.0` disables jitter.
    pub jitter_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            backoff: BackoffKind::Exponential,
            jitter_factor: 0.1,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries: exactly one attempt.
    #[must_use]
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Construct a policy with the given attempt budget and base delay,
    /// exponential backoff, a 60x base-delay cap, and light jitter.
    #[must_use]
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            max_delay: base_delay * 60,
            backoff: BackoffKind::Exponential,
            jitter_factor: 0.1,
        }
    }

    /// Override the maximum delay cap.
    #[must_use]
    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    /// Override the jitter fraction, clamped to `[0.0, 1.0]`.
    #[must_use]
    pub fn with_jitter(mut self, jitter_factor: f64) -> Self {
        self.jitter_factor = jitter_factor.clamp(0.0, 1.0);
        self
    }

    /// Use fixed (non-exponential) backoff.
    #[must_use]
    pub fn with_fixed_backoff(mut self) -> Self {
        self.backoff = BackoffKind::Fixed;
        self
    }

    /// Whether another attempt is allowed after `attempts_made` already
    /// happened (`attempts_made` is 1 after the first try).
    #[must_use]
    pub fn allows_retry(&self, attempts_made: u32) -> bool {
        attempts_made < self.max_attempts
    }

    /// Delay to wait before the attempt numbered `attempt` (1-based: the
    /// delay before the *first* retry is `delay_for(1)`).
    ///
    /// Deterministic given `attempt` — jitter is derived from the
    /// attempt number rather than a random source, so the same policy
    /// applied to the same attempt always waits the same amount. That
    /// keeps the scheduler's retry timing reproducible in tests without
    /// threading a random number generator through the whole engine.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let unjittered = match self.backoff {
            BackoffKind::Fixed => self.base_delay,
            BackoffKind::Exponential => {
                let factor = 2_u32.saturating_pow(attempt.saturating_sub(1));
                self.base_delay.saturating_mul(factor)
            }
        };
        let capped = unjittered.min(self.max_delay);

        if self.jitter_factor <= 0.0 {
            return capped;
        }
        let jitter_range = (capped.as_millis() as f64 * self.jitter_factor) as u64;
        let jitter_ms = if jitter_range == 0 {
            0
        } else {
            u64::from(attempt) % (jitter_range + 1)
        };
        (capped + Duration::from_millis(jitter_ms)).min(self.max_delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn none_allows_exactly_one_attempt() {
        let policy = RetryPolicy::none();
        assert!(!policy.allows_retry(1));
    }

    #[test]
    fn default_allows_three_attempts() {
        let policy = RetryPolicy::default();
        assert!(policy.allows_retry(1));
        assert!(policy.allows_retry(2));
        assert!(!policy.allows_retry(3));
    }

    #[test]
    fn exponential_backoff_doubles_each_attempt() {
        let policy = RetryPolicy::new(5, Duration::from_secs(1)).with_jitter(0.0);
        assert_eq!(policy.delay_for(1), Duration::from_secs(1));
        assert_eq!(policy.delay_for(2), Duration::from_secs(2));
        assert_eq!(policy.delay_for(3), Duration::from_secs(4));
    }

    #[test]
    fn fixed_backoff_never_grows() {
        let policy = RetryPolicy::new(5, Duration::from_secs(1))
            .with_fixed_backoff()
            .with_jitter(0.0);
        assert_eq!(policy.delay_for(1), policy.delay_for(4));
    }

    #[test]
    fn delay_is_capped_at_max_delay() {
        let policy = RetryPolicy::new(10, Duration::from_secs(1))
            .with_max_delay(Duration::from_secs(5))
            .with_jitter(0.0);
        assert_eq!(policy.delay_for(10), Duration::from_secs(5));
    }

    #[test]
    fn jitter_never_pushes_past_max_delay() {
        let policy = RetryPolicy::new(10, Duration::from_secs(1))
            .with_max_delay(Duration::from_secs(2))
            .with_jitter(1.0);
        for attempt in 1..=10 {
            assert!(policy.delay_for(attempt) <= Duration::from_secs(2));
        }
    }

    #[test]
    fn delay_for_zero_is_zero() {
        assert_eq!(RetryPolicy::default().delay_for(0), Duration::ZERO);
    }
}
