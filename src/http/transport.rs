//! Transport layer abstraction for HTTP communication.
//!
//! The default implementation uses reqwest. Tests plug in
//! [`MockTransport`](crate::mocks::MockTransport).

use async_trait::async_trait;
use reqwest::Client;

use crate::config::MailConfig;
use crate::error::{MailError, MailResult};

use super::request::OutgoingRequest;
use super::response::MailResponse;

/// Trait for HTTP transport implementations.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one request and buffer the response.
    ///
    /// # Errors
    ///
    /// Returns [`MailError::Network`] when no HTTP response was received.
    /// HTTP error statuses are returned as ordinary responses.
    async fn send(&self, request: OutgoingRequest) -> MailResult<MailResponse>;
}

/// Reqwest-based HTTP transport implementation.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Create a transport with the timeouts and user agent from `config`.
    pub fn new(config: &MailConfig) -> MailResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| MailError::Configuration {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self { client })
    }

    /// Wrap an existing reqwest client.
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: OutgoingRequest) -> MailResult<MailResponse> {
        let mut builder = self
            .client
            .request(request.method, request.url)
            .headers(request.headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(MailError::network)?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(MailError::network)?;

        Ok(MailResponse::new(status, headers, body))
    }
}
