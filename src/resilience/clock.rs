//! Time source used by the token buckets.

use std::fmt::Debug;
use tokio::time::Instant;

/// Monotonic time source.
///
/// Buckets read the clock on every refill. Tests substitute
/// [`ManualClock`](crate::mocks::ManualClock) to move time explicitly.
pub trait Clock: Send + Sync + Debug {
    /// Current instant.
    fn now(&self) -> Instant;
}

/// Clock backed by the tokio runtime.
///
/// Follows tokio's paused time in tests that use `start_paused`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}
