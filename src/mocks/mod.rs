//! Mock implementations for testing.
//!
//! [`MockTransport`] replays scripted responses and records every request it
//! sees. [`ManualClock`] is a time source that only moves when told to.

use async_trait::async_trait;
use bytes::Bytes;
use http::{HeaderMap, HeaderValue, StatusCode};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use crate::error::{MailError, MailResult};
use crate::http::{MailResponse, OutgoingRequest, Transport};
use crate::resilience::Clock;

/// Mock response configuration
#[derive(Debug, Clone)]
pub struct MockResponse {
    /// HTTP status code
    pub status: u16,
    /// Response headers
    pub headers: Vec<(String, String)>,
    /// Response body
    pub body: Bytes,
    /// Delay before responding
    pub delay: Option<Duration>,
    /// Fail with a network error instead of responding
    pub network_error: Option<String>,
}

impl MockResponse {
    /// A response with `status` and an empty body.
    pub fn status(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Bytes::new(),
            delay: None,
            network_error: None,
        }
    }

    /// A 200 response with a JSON body.
    pub fn json<T: Serialize>(data: &T) -> Self {
        Self::status(200)
            .with_header("content-type", "application/json")
            .with_body(serde_json::to_vec(data).unwrap_or_default())
    }

    /// An API error response with the standard error body.
    pub fn api_error(status: u16, code: &str, message: &str) -> Self {
        let body = serde_json::json!({ "code": code, "message": message });
        Self::json(&body).with_status(status)
    }

    /// A 429 response carrying `Retry-After`.
    pub fn rate_limited(retry_after_secs: u64) -> Self {
        Self::api_error(429, "rate_limited", "Too many requests")
            .with_header("retry-after", &retry_after_secs.to_string())
    }

    /// A transport failure.
    pub fn network_error(message: impl Into<String>) -> Self {
        Self {
            network_error: Some(message.into()),
            ..Self::status(0)
        }
    }

    /// Override the status code.
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    /// Add a response header.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    /// Set the body.
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Add delay to response
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    fn into_result(self) -> MailResult<MailResponse> {
        if let Some(message) = self.network_error {
            return Err(MailError::Network {
                message,
                source: None,
            });
        }

        let status = StatusCode::from_u16(self.status).map_err(|e| MailError::InvalidRequest {
            message: format!("mock status {} is invalid: {}", self.status, e),
        })?;

        let mut headers = HeaderMap::new();
        for (name, value) in &self.headers {
            if let (Ok(name), Ok(value)) = (
                http::header::HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                headers.append(name, value);
            }
        }

        Ok(MailResponse::new(status, headers, self.body))
    }
}

/// Mock HTTP transport for testing
pub struct MockTransport {
    responses: Arc<Mutex<VecDeque<MockResponse>>>,
    requests: Arc<Mutex<Vec<OutgoingRequest>>>,
    default_response: Option<MockResponse>,
}

impl MockTransport {
    /// Create a new mock transport
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(VecDeque::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
            default_response: None,
        }
    }

    /// Add a response to the queue
    pub fn add_response(self, response: MockResponse) -> Self {
        self.responses.lock().push_back(response);
        self
    }

    /// Add multiple responses
    pub fn add_responses(self, responses: impl IntoIterator<Item = MockResponse>) -> Self {
        self.responses.lock().extend(responses);
        self
    }

    /// Set default response when queue is empty
    pub fn with_default_response(mut self, response: MockResponse) -> Self {
        self.default_response = Some(response);
        self
    }

    /// Get recorded requests
    pub fn recorded_requests(&self) -> Vec<OutgoingRequest> {
        self.requests.lock().clone()
    }

    /// Get the last recorded request
    pub fn last_request(&self) -> Option<OutgoingRequest> {
        self.requests.lock().last().cloned()
    }

    /// Number of requests sent so far
    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    /// Get remaining response count
    pub fn remaining_responses(&self) -> usize {
        self.responses.lock().len()
    }

    fn next_response(&self) -> Option<MockResponse> {
        self.responses
            .lock()
            .pop_front()
            .or_else(|| self.default_response.clone())
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: OutgoingRequest) -> MailResult<MailResponse> {
        self.requests.lock().push(request);

        let response = self.next_response().ok_or_else(|| MailError::Network {
            message: "No mock response configured".to_string(),
            source: None,
        })?;

        if let Some(delay) = response.delay {
            tokio::time::sleep(delay).await;
        }

        response.into_result()
    }
}

impl std::fmt::Debug for MockTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockTransport")
            .field("pending_responses", &self.responses.lock().len())
            .field("recorded_requests", &self.requests.lock().len())
            .finish()
    }
}

/// Clock that only advances when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<Instant>,
}

impl ManualClock {
    /// Start at the current tokio instant.
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Instant::now()),
        }
    }

    /// Move time forward.
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock();
        *now += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock()
    }
}
