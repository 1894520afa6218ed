//! Retry orchestration.
//!
//! [`RetryOrchestrator::send`] drives the attempt loop for one logical call:
//!
//! ```text
//! Attempting(0) ──success / non-retryable──▶ Done
//!      │
//!      └─retryable, n < max──▶ Waiting(n) ──backoff──▶ Attempting(n+1)
//!                                    │
//!                                    └─cancelled──▶ Cancelled
//! ```
//!
//! A retryable failure on the last attempt ends the loop with
//! [`MailError::RetriesExhausted`] for HTTP responses, or the transport error
//! itself for network failures.

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::{AttemptOutcome, RetryPolicy};
use crate::error::{MailError, MailResult};
use crate::http::{MailResponse, OutgoingRequest, Transport};

/// Sends requests through a [`Transport`] with retries and backoff.
pub struct RetryOrchestrator {
    transport: Arc<dyn Transport>,
    rng: Mutex<StdRng>,
}

impl RetryOrchestrator {
    /// Create an orchestrator with an entropy-seeded jitter source.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Create an orchestrator with deterministic jitter.
    pub fn with_seed(transport: Arc<dyn Transport>, seed: u64) -> Self {
        Self {
            transport,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// The underlying transport.
    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// Send `request`, retrying per `policy`.
    ///
    /// Makes at most `policy.max_attempts + 1` network attempts, each with a
    /// fresh copy of the buffered request. Non-retryable responses, error
    /// statuses included, are returned as `Ok` for the caller to classify.
    /// With retries disabled the single attempt's outcome is returned as is.
    ///
    /// # Errors
    ///
    /// - [`MailError::Cancelled`] if `cancel` fires during an attempt or a backoff wait.
    /// - [`MailError::RetriesExhausted`] if the last allowed attempt produced a retryable response.
    /// - [`MailError::Network`] if the last allowed attempt failed below HTTP.
    pub async fn send(
        &self,
        request: OutgoingRequest,
        policy: &RetryPolicy,
        cancel: &CancellationToken,
    ) -> MailResult<MailResponse> {
        let mut attempt: u32 = 0;

        loop {
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!(attempt, "Request cancelled");
                    return Err(MailError::Cancelled);
                }
                result = self.transport.send(request.clone()) => result,
            };

            let outcome = match &result {
                Ok(response) => AttemptOutcome::Status(response.status.as_u16()),
                Err(MailError::Network { .. }) => AttemptOutcome::Transport,
                Err(_) => return result,
            };

            if !policy.is_active() || !policy.is_retryable(outcome) {
                return result;
            }

            if attempt >= policy.max_attempts {
                warn!(
                    attempts = attempt + 1,
                    method = %request.method,
                    url = %request.url,
                    "Giving up after exhausting retries"
                );
                return match result {
                    Ok(response) => Err(MailError::RetriesExhausted {
                        attempts: attempt + 1,
                        last: Box::new(response.to_error()),
                    }),
                    Err(error) => Err(error),
                };
            }

            attempt += 1;
            let delay = {
                let mut rng = self.rng.lock();
                policy.delay_for_attempt(attempt, &mut *rng)
            };

            let delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
            match &result {
                Ok(response) => debug!(
                    attempt,
                    delay_ms,
                    status = response.status.as_u16(),
                    "Retrying request"
                ),
                Err(error) => debug!(
                    attempt,
                    delay_ms,
                    error = %error,
                    "Retrying request"
                ),
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!(attempt, "Backoff cancelled");
                    return Err(MailError::Cancelled);
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}

impl std::fmt::Debug for RetryOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryOrchestrator").finish_non_exhaustive()
    }
}
