//! Single-resource token bucket with lazy refill.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::config::rate_limit::validate_limit;
use crate::config::{CategoryLimit, ConfigError};
use crate::error::{MailError, MailResult};

use super::clock::{Clock, SystemClock};

/// Added to every computed wait so a waiter does not wake a hair before
/// the token it is waiting for exists.
pub const WAIT_EPSILON: Duration = Duration::from_millis(1);

/// Point-in-time view of a bucket.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BucketSnapshot {
    /// Whether the bucket enforces its limit.
    pub enabled: bool,
    /// Refill rate in tokens per second.
    pub requests_per_second: f64,
    /// Capacity.
    pub burst_size: u32,
    /// Tokens available right now (fractional).
    pub tokens_available: f64,
    /// Time until at least one whole token is available.
    pub next_refill: Duration,
}

struct BucketState {
    tokens: f64,
    max_tokens: f64,
    refill_rate: f64,
    last_refill: Instant,
    enabled: bool,
}

impl BucketState {
    fn refill(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_rate).min(self.max_tokens);
        if now > self.last_refill {
            self.last_refill = now;
        }
    }

    fn time_until_token(&self) -> Duration {
        if self.tokens >= 1.0 {
            return Duration::ZERO;
        }
        Duration::try_from_secs_f64((1.0 - self.tokens) / self.refill_rate).unwrap_or(Duration::MAX)
    }
}

/// Token bucket rate limiter.
///
/// Tokens refill continuously at `requests_per_second` up to `burst_size`.
/// All state lives behind one lock which is never held across an await.
/// Waiters are not queued: whichever waiter re-takes the lock first after
/// its sleep gets the next token.
pub struct TokenBucket {
    label: &'static str,
    state: Mutex<BucketState>,
    clock: Arc<dyn Clock>,
}

impl TokenBucket {
    /// Create a full bucket on the tokio clock.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidRateLimit` for a non-positive rate or zero burst.
    pub fn new(requests_per_second: f64, burst_size: u32) -> Result<Self, ConfigError> {
        Self::with_clock(requests_per_second, burst_size, Arc::new(SystemClock))
    }

    /// Create a full bucket reading time from `clock`.
    pub fn with_clock(
        requests_per_second: f64,
        burst_size: u32,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ConfigError> {
        validate_limit(requests_per_second, burst_size)?;
        let now = clock.now();
        Ok(Self {
            label: "default",
            state: Mutex::new(BucketState {
                tokens: burst_size as f64,
                max_tokens: burst_size as f64,
                refill_rate: requests_per_second,
                last_refill: now,
                enabled: true,
            }),
            clock,
        })
    }

    /// Create a bucket from a category limit.
    pub fn from_limit(limit: &CategoryLimit, clock: Arc<dyn Clock>) -> Result<Self, ConfigError> {
        let bucket = Self::with_clock(limit.requests_per_second, limit.burst_size, clock)?;
        bucket.set_enabled(limit.enabled);
        Ok(bucket)
    }

    /// Name used in log events.
    pub fn with_label(mut self, label: &'static str) -> Self {
        self.label = label;
        self
    }

    /// Take one token, waiting until one is available.
    ///
    /// A disabled bucket returns immediately without consuming. If `cancel`
    /// fires during the wait, returns [`MailError::Cancelled`] and consumes
    /// nothing.
    ///
    /// # Example
    ///
    /// ```
    /// use integrations_mail::resilience::TokenBucket;
    /// use tokio_util::sync::CancellationToken;
    ///
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let bucket = TokenBucket::new(10.0, 5)?;
    /// bucket.acquire(&CancellationToken::new()).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn acquire(&self, cancel: &CancellationToken) -> MailResult<()> {
        let wait = {
            let mut state = self.state.lock();
            if !state.enabled {
                return Ok(());
            }
            state.refill(self.clock.now());
            if state.tokens >= 1.0 {
                state.tokens -= 1.0;
                return Ok(());
            }
            state.time_until_token().saturating_add(WAIT_EPSILON)
        };

        debug!(
            bucket = self.label,
            wait_ms = u64::try_from(wait.as_millis()).unwrap_or(u64::MAX),
            "Waiting for rate limit token"
        );

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(bucket = self.label, "Rate limit wait cancelled");
                return Err(MailError::Cancelled);
            }
            _ = tokio::time::sleep(wait) => {}
        }

        let mut state = self.state.lock();
        if !state.enabled {
            return Ok(());
        }
        state.refill(self.clock.now());
        state.tokens = (state.tokens - 1.0).max(0.0);
        Ok(())
    }

    /// Take one token if available without waiting.
    pub fn try_acquire(&self) -> bool {
        let mut state = self.state.lock();
        if !state.enabled {
            return true;
        }
        state.refill(self.clock.now());
        if state.tokens >= 1.0 {
            state.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Replace rate and capacity in place.
    ///
    /// Tokens above the new capacity are dropped immediately.
    pub fn update_config(&self, requests_per_second: f64, burst_size: u32) -> Result<(), ConfigError> {
        validate_limit(requests_per_second, burst_size)?;

        let mut state = self.state.lock();
        state.refill(self.clock.now());
        state.refill_rate = requests_per_second;
        state.max_tokens = burst_size as f64;
        state.tokens = state.tokens.min(state.max_tokens);

        trace!(
            bucket = self.label,
            requests_per_second,
            burst_size,
            "Token bucket reconfigured"
        );
        Ok(())
    }

    /// Turn enforcement on or off. Token state is preserved.
    pub fn set_enabled(&self, enabled: bool) {
        self.state.lock().enabled = enabled;
    }

    /// Whether the bucket enforces its limit.
    pub fn is_enabled(&self) -> bool {
        self.state.lock().enabled
    }

    /// Refill and report current state.
    pub fn snapshot(&self) -> BucketSnapshot {
        let mut state = self.state.lock();
        state.refill(self.clock.now());
        BucketSnapshot {
            enabled: state.enabled,
            requests_per_second: state.refill_rate,
            burst_size: state.max_tokens as u32,
            tokens_available: state.tokens,
            next_refill: state.time_until_token(),
        }
    }
}

impl std::fmt::Debug for TokenBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("TokenBucket")
            .field("label", &self.label)
            .field("tokens", &state.tokens)
            .field("max_tokens", &state.max_tokens)
            .field("refill_rate", &state.refill_rate)
            .field("enabled", &state.enabled)
            .finish()
    }
}
