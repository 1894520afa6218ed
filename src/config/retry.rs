//! Retry policy and backoff strategies.

use rand::Rng;
use std::time::Duration;

/// How the wait between attempts grows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackoffStrategy {
    /// `base × 2^(n−1)` with jitter, capped at the maximum delay.
    #[default]
    Exponential,
    /// `base × n`, capped at the maximum delay.
    Linear,
    /// Always `base`.
    Constant,
}

/// Outcome of a single attempt, as seen by the retry decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// The server answered with this status code.
    Status(u16),
    /// The request failed below HTTP.
    Transport,
}

/// Configuration for retry behavior.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Whether failed attempts are retried at all.
    pub enabled: bool,

    /// Maximum number of retries after the first attempt.
    pub max_attempts: u32,

    /// Retry 4xx responses other than 429 and 412.
    pub retry_client_errors: bool,

    /// Retry 400 and 422 responses.
    pub retry_validation_errors: bool,

    /// Backoff strategy between attempts.
    pub backoff_strategy: BackoffStrategy,

    /// Base delay fed into the backoff strategy.
    pub base_delay: Duration,

    /// Upper bound for exponential and linear delays.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            max_attempts: 3,
            retry_client_errors: false,
            retry_validation_errors: false,
            backoff_strategy: BackoffStrategy::Exponential,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// A policy that makes exactly one attempt.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Whether this policy allows any retry.
    pub fn is_active(&self) -> bool {
        self.enabled && self.max_attempts > 0
    }

    /// Set the maximum number of retries.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Set the backoff strategy and its delays.
    pub fn with_backoff(
        mut self,
        strategy: BackoffStrategy,
        base_delay: Duration,
        max_delay: Duration,
    ) -> Self {
        self.backoff_strategy = strategy;
        self.base_delay = base_delay;
        self.max_delay = max_delay;
        self
    }

    /// Opt in to retrying 4xx responses other than 429.
    pub fn with_client_error_retries(mut self, retry: bool) -> Self {
        self.retry_client_errors = retry;
        self
    }

    /// Opt in to retrying 400 and 422 responses.
    pub fn with_validation_error_retries(mut self, retry: bool) -> Self {
        self.retry_validation_errors = retry;
        self
    }

    /// Calculate the delay before retry number `attempt` (1-indexed).
    ///
    /// Exponential delays are jittered as `d + U[0, d/2) − d/4`, so attempt 1
    /// with a 1 s base lands in `[0.75 s, 1.25 s)`. Exponential and linear
    /// delays never exceed `max_delay`; constant delays are always `base_delay`.
    ///
    /// # Example
    ///
    /// ```
    /// use std::time::Duration;
    /// use integrations_mail::config::{BackoffStrategy, RetryPolicy};
    ///
    /// let policy = RetryPolicy::default().with_backoff(
    ///     BackoffStrategy::Linear,
    ///     Duration::from_secs(1),
    ///     Duration::from_secs(30),
    /// );
    /// let mut rng = rand::thread_rng();
    /// assert_eq!(policy.delay_for_attempt(3, &mut rng), Duration::from_secs(3));
    /// ```
    pub fn delay_for_attempt<R: Rng>(&self, attempt: u32, rng: &mut R) -> Duration {
        let attempt = attempt.max(1);

        match self.backoff_strategy {
            BackoffStrategy::Constant => self.base_delay,
            BackoffStrategy::Linear => self.base_delay.saturating_mul(attempt).min(self.max_delay),
            BackoffStrategy::Exponential => {
                let exponent = (attempt - 1).min(62) as i32;
                let delay = self.base_delay.as_secs_f64() * 2f64.powi(exponent);
                let jitter = if delay > 0.0 {
                    rng.gen_range(0.0..delay / 2.0)
                } else {
                    0.0
                };
                let jittered = (delay + jitter - delay / 4.0).max(0.0);
                Duration::try_from_secs_f64(jittered)
                    .map_or(self.max_delay, |d| d.min(self.max_delay))
            }
        }
    }

    /// Decide whether to retry after the attempt numbered `attempt` (0-indexed).
    ///
    /// Transport failures, 429 and 5xx are retried while attempts remain.
    /// 412 is never retried.
    ///
    /// # Example
    ///
    /// ```
    /// use integrations_mail::config::{AttemptOutcome, RetryPolicy};
    ///
    /// let policy = RetryPolicy::default();
    /// assert!(policy.should_retry(0, AttemptOutcome::Status(503)));
    /// assert!(!policy.should_retry(0, AttemptOutcome::Status(400)));
    /// assert!(!policy.should_retry(3, AttemptOutcome::Transport));
    /// ```
    pub fn should_retry(&self, attempt: u32, outcome: AttemptOutcome) -> bool {
        self.is_active() && attempt < self.max_attempts && self.is_retryable(outcome)
    }

    /// Whether `outcome` is worth retrying, ignoring the attempt budget.
    pub fn is_retryable(&self, outcome: AttemptOutcome) -> bool {
        match outcome {
            AttemptOutcome::Transport => true,
            AttemptOutcome::Status(429) => true,
            AttemptOutcome::Status(status) if status >= 500 => true,
            AttemptOutcome::Status(412) => false,
            AttemptOutcome::Status(400 | 422) if self.retry_validation_errors => true,
            AttemptOutcome::Status(400..=499) => self.retry_client_errors,
            AttemptOutcome::Status(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use rstest::rstest;

    fn exponential() -> RetryPolicy {
        RetryPolicy::default().with_backoff(
            BackoffStrategy::Exponential,
            Duration::from_secs(1),
            Duration::from_secs(30),
        )
    }

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert!(policy.enabled);
        assert_eq!(policy.max_attempts, 3);
        assert!(!policy.retry_client_errors);
        assert_eq!(policy.backoff_strategy, BackoffStrategy::Exponential);
        assert_eq!(policy.base_delay, Duration::from_secs(1));
        assert_eq!(policy.max_delay, Duration::from_secs(30));
    }

    #[test]
    fn test_exponential_first_attempt_range() {
        let policy = exponential();
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..500 {
            let delay = policy.delay_for_attempt(1, &mut rng);
            assert!(delay >= Duration::from_millis(750), "{delay:?}");
            assert!(delay <= Duration::from_secs(2), "{delay:?}");
        }
    }

    #[test]
    fn test_exponential_grows_and_caps() {
        let policy = exponential();
        let mut rng = StdRng::seed_from_u64(42);

        for _ in 0..200 {
            let first = policy.delay_for_attempt(1, &mut rng);
            let second = policy.delay_for_attempt(2, &mut rng);
            assert!(second > first, "{second:?} <= {first:?}");
        }

        for attempt in 1..100 {
            assert!(policy.delay_for_attempt(attempt, &mut rng) <= Duration::from_secs(30));
        }
        assert!(policy.delay_for_attempt(u32::MAX, &mut rng) <= Duration::from_secs(30));
    }

    #[test]
    fn test_exponential_with_unbounded_cap_or_huge_base() {
        let uncapped = RetryPolicy::default().with_backoff(
            BackoffStrategy::Exponential,
            Duration::from_secs(10),
            Duration::MAX,
        );
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(uncapped.delay_for_attempt(63, &mut rng), Duration::MAX);
        assert_eq!(uncapped.delay_for_attempt(u32::MAX, &mut rng), Duration::MAX);
        assert!(uncapped.delay_for_attempt(1, &mut rng) < Duration::from_secs(13));

        let huge_base = RetryPolicy::default().with_backoff(
            BackoffStrategy::Exponential,
            Duration::from_secs(u64::MAX),
            Duration::from_secs(30),
        );
        for attempt in [1, 2, 40, 63] {
            assert_eq!(huge_base.delay_for_attempt(attempt, &mut rng), Duration::from_secs(30));
        }
    }

    #[test]
    fn test_exponential_seeded_is_deterministic() {
        let policy = exponential();
        let a = policy.delay_for_attempt(3, &mut StdRng::seed_from_u64(9));
        let b = policy.delay_for_attempt(3, &mut StdRng::seed_from_u64(9));
        assert_eq!(a, b);
    }

    #[test]
    fn test_linear_delays() {
        let policy = RetryPolicy::default().with_backoff(
            BackoffStrategy::Linear,
            Duration::from_secs(1),
            Duration::from_secs(30),
        );
        let mut rng = StdRng::seed_from_u64(1);

        assert_eq!(policy.delay_for_attempt(1, &mut rng), Duration::from_secs(1));
        assert_eq!(policy.delay_for_attempt(2, &mut rng), Duration::from_secs(2));
        assert_eq!(policy.delay_for_attempt(3, &mut rng), Duration::from_secs(3));
        assert_eq!(policy.delay_for_attempt(45, &mut rng), Duration::from_secs(30));
    }

    #[test]
    fn test_constant_delays() {
        let policy = RetryPolicy::default().with_backoff(
            BackoffStrategy::Constant,
            Duration::from_secs(1),
            Duration::from_secs(30),
        );
        let mut rng = StdRng::seed_from_u64(1);

        for attempt in 1..10 {
            assert_eq!(policy.delay_for_attempt(attempt, &mut rng), Duration::from_secs(1));
        }
    }

    #[rstest]
    #[case(AttemptOutcome::Status(429), false, true)]
    #[case(AttemptOutcome::Status(503), false, true)]
    #[case(AttemptOutcome::Status(500), false, true)]
    #[case(AttemptOutcome::Status(400), false, false)]
    #[case(AttemptOutcome::Status(400), true, true)]
    #[case(AttemptOutcome::Status(404), true, true)]
    #[case(AttemptOutcome::Status(412), true, false)]
    #[case(AttemptOutcome::Status(200), true, false)]
    #[case(AttemptOutcome::Status(302), true, false)]
    #[case(AttemptOutcome::Transport, false, true)]
    fn test_should_retry_table(
        #[case] outcome: AttemptOutcome,
        #[case] retry_client_errors: bool,
        #[case] expected: bool,
    ) {
        let policy = RetryPolicy::default().with_client_error_retries(retry_client_errors);
        assert_eq!(policy.should_retry(0, outcome), expected);
    }

    #[test]
    fn test_should_retry_stops_at_limit() {
        let policy = RetryPolicy::default().with_max_attempts(2);
        assert!(policy.should_retry(1, AttemptOutcome::Status(503)));
        assert!(!policy.should_retry(2, AttemptOutcome::Status(503)));
        assert!(!policy.should_retry(2, AttemptOutcome::Transport));
    }

    #[test]
    fn test_validation_retries_only_cover_400_and_422() {
        let policy = RetryPolicy::default().with_validation_error_retries(true);
        assert!(policy.should_retry(0, AttemptOutcome::Status(400)));
        assert!(policy.should_retry(0, AttemptOutcome::Status(422)));
        assert!(!policy.should_retry(0, AttemptOutcome::Status(404)));
    }

    #[test]
    fn test_disabled_policy_never_retries() {
        let policy = RetryPolicy::disabled();
        assert!(!policy.should_retry(0, AttemptOutcome::Transport));

        let zero = RetryPolicy::default().with_max_attempts(0);
        assert!(!zero.is_active());
        assert!(!zero.should_retry(0, AttemptOutcome::Status(503)));
    }
}
