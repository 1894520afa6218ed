//! Resilience layer: rate limiting, retries and idempotency.
//!
//! - [`TokenBucket`]: lazy-refill token bucket, cancellable waits
//! - [`RateLimiterRegistry`]: one bucket per [`EndpointCategory`]
//! - [`RetryOrchestrator`]: attempt loop with backoff
//! - [`IdempotencyKeyManager`]: key generation and injection rules

mod clock;
mod idempotency;
mod rate_limiter;
mod retry;
mod token_bucket;

pub use clock::{Clock, SystemClock};
pub use idempotency::{generate_key, IdempotencyKeyManager, KeyBuilder};
pub use rate_limiter::{EndpointCategory, RateLimitStatus, RateLimiterRegistry};
pub use retry::RetryOrchestrator;
pub use token_bucket::{BucketSnapshot, TokenBucket, WAIT_EPSILON};
