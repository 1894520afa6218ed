//! The call path every API request goes through.

use http::header::{HeaderName, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::MailConfig;
use crate::error::{MailError, MailResult};
use crate::resilience::{EndpointCategory, IdempotencyKeyManager, RateLimiterRegistry, RetryOrchestrator};

use super::request::{MailRequest, OutgoingRequest, IDEMPOTENCY_KEY_HEADER};
use super::response::MailResponse;
use super::transport::{ReqwestTransport, Transport};

/// HTTP client for the mail API.
///
/// For each request this client:
/// 1. classifies the endpoint,
/// 2. injects an idempotency key into POST requests that lack one,
/// 3. resolves the URL and adds authentication,
/// 4. waits for a rate limit token and sends through the [`RetryOrchestrator`],
/// 5. turns error statuses into [`MailError::Api`].
pub struct MailHttpClient {
    config: Arc<MailConfig>,
    rate_limiter: Arc<RateLimiterRegistry>,
    idempotency: IdempotencyKeyManager,
    orchestrator: RetryOrchestrator,
}

impl MailHttpClient {
    /// Create a client backed by reqwest.
    pub fn new(config: MailConfig) -> MailResult<Self> {
        let transport = Arc::new(ReqwestTransport::new(&config)?) as Arc<dyn Transport>;
        Self::with_transport(config, transport)
    }

    /// Create a client with a custom transport.
    pub fn with_transport(config: MailConfig, transport: Arc<dyn Transport>) -> MailResult<Self> {
        let rate_limiter = Arc::new(RateLimiterRegistry::new(&config.rate_limit)?);
        Ok(Self {
            idempotency: IdempotencyKeyManager::new(config.idempotency.clone()),
            orchestrator: RetryOrchestrator::new(transport),
            rate_limiter,
            config: Arc::new(config),
        })
    }

    /// Use a fixed seed for backoff jitter.
    pub fn with_jitter_seed(mut self, seed: u64) -> Self {
        let transport = Arc::clone(self.orchestrator.transport());
        self.orchestrator = RetryOrchestrator::with_seed(transport, seed);
        self
    }

    /// Client configuration.
    pub fn config(&self) -> &MailConfig {
        &self.config
    }

    /// The rate limiter registry owned by this client.
    pub fn rate_limiter(&self) -> &Arc<RateLimiterRegistry> {
        &self.rate_limiter
    }

    /// The idempotency key manager.
    pub fn idempotency(&self) -> &IdempotencyKeyManager {
        &self.idempotency
    }

    /// Send `request` and return the successful response.
    ///
    /// # Errors
    ///
    /// - [`MailError::Api`] for error statuses that were not retried.
    /// - [`MailError::RetriesExhausted`] when every attempt failed retryably.
    /// - [`MailError::Cancelled`] if `cancel` fired at any wait.
    pub async fn execute(
        &self,
        request: MailRequest,
        cancel: &CancellationToken,
    ) -> MailResult<MailResponse> {
        let category = EndpointCategory::classify(request.method(), request.path());
        debug!(
            method = %request.method(),
            path = request.path(),
            category = category.as_str(),
            "Executing request"
        );

        let outgoing = self.prepare(request)?;
        self.rate_limiter.acquire(cancel, category).await?;

        let response = self
            .orchestrator
            .send(outgoing, &self.config.retry, cancel)
            .await
            .map_err(|e| {
                if !e.is_cancelled() {
                    debug!(error = %e, request_id = e.request_id(), "Request failed");
                }
                e
            })?;

        if response.is_success() {
            return Ok(response);
        }

        let error = response.to_error();
        debug!(
            status = response.status.as_u16(),
            request_id = error.request_id(),
            "Request rejected"
        );
        Err(error)
    }

    /// Send `request` and decode the JSON response body.
    pub async fn execute_json<T: DeserializeOwned>(
        &self,
        request: MailRequest,
        cancel: &CancellationToken,
    ) -> MailResult<T> {
        self.execute(request, cancel).await?.json()
    }

    fn prepare(&self, request: MailRequest) -> MailResult<OutgoingRequest> {
        let existing = request.existing_idempotency_key().to_string();
        let parts = request.into_parts();
        let mut headers = parts.headers;

        if self.idempotency.should_inject(&parts.method, &existing) {
            if let Some(key) = self.idempotency.ensure_key(&existing) {
                headers.insert(
                    HeaderName::from_static(IDEMPOTENCY_KEY_HEADER),
                    header_value(&key)?,
                );
            }
        }

        let mut auth = header_value(&self.config.bearer_token())?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(USER_AGENT, header_value(&self.config.user_agent)?);

        let mut url = self.config.endpoint_url(&parts.path)?;
        if !parts.query.is_empty() {
            url.query_pairs_mut().extend_pairs(&parts.query);
        }

        Ok(OutgoingRequest {
            method: parts.method,
            url,
            headers,
            body: parts.body,
        })
    }
}

fn header_value(value: &str) -> MailResult<HeaderValue> {
    HeaderValue::from_str(value).map_err(|e| MailError::InvalidRequest {
        message: format!("invalid header value: {}", e),
    })
}

impl std::fmt::Debug for MailHttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MailHttpClient")
            .field("config", &self.config)
            .field("rate_limiter", &self.rate_limiter)
            .finish_non_exhaustive()
    }
}
