//! Mail client implementation.
//!
//! `MailClient` is the main entry point. It owns one HTTP client, and with
//! it one rate limiter registry, so separately configured clients in the
//! same process never share limits.

use std::sync::Arc;

use crate::config::MailConfig;
use crate::error::MailResult;
use crate::http::{MailHttpClient, Transport};
use crate::resilience::{IdempotencyKeyManager, RateLimiterRegistry};
use crate::services::{MessagesService, StatisticsService};

/// Main client for the mail API.
///
/// Cloning is cheap; clones share the HTTP client and rate limits.
///
/// # Example
///
/// ```rust,no_run
/// use integrations_mail::{MailClient, MailConfig};
/// use integrations_mail::resilience::EndpointCategory;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = MailConfig::builder()
///     .api_key("key")
///     .account_id("acct")
///     .build()?;
/// let client = MailClient::new(config)?;
///
/// client.rate_limiter().configure(EndpointCategory::SendMessage, 20.0, 40)?;
/// println!("{:?}", client.rate_limiter().status(EndpointCategory::SendMessage));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct MailClient {
    http: Arc<MailHttpClient>,
    messages: MessagesService,
    statistics: StatisticsService,
}

impl MailClient {
    /// Create a client backed by reqwest.
    pub fn new(config: MailConfig) -> MailResult<Self> {
        Ok(Self::from_http(MailHttpClient::new(config)?))
    }

    /// Create a client from environment variables.
    pub fn from_env() -> MailResult<Self> {
        Self::new(MailConfig::from_env()?)
    }

    /// Create a client with a custom transport.
    pub fn with_transport(config: MailConfig, transport: Arc<dyn Transport>) -> MailResult<Self> {
        Ok(Self::from_http(MailHttpClient::with_transport(config, transport)?))
    }

    /// Wrap an already built HTTP client.
    pub fn from_http(http: MailHttpClient) -> Self {
        let http = Arc::new(http);
        Self {
            messages: MessagesService::new(Arc::clone(&http)),
            statistics: StatisticsService::new(Arc::clone(&http)),
            http,
        }
    }

    /// Message operations.
    pub fn messages(&self) -> &MessagesService {
        &self.messages
    }

    /// Statistics operations.
    pub fn statistics(&self) -> &StatisticsService {
        &self.statistics
    }

    /// Runtime rate limit tuning and status.
    pub fn rate_limiter(&self) -> &RateLimiterRegistry {
        self.http.rate_limiter()
    }

    /// Idempotency key manager.
    pub fn idempotency(&self) -> &IdempotencyKeyManager {
        self.http.idempotency()
    }

    /// Underlying HTTP client, for endpoints without a service wrapper.
    pub fn http(&self) -> &MailHttpClient {
        &self.http
    }

    /// Client configuration.
    pub fn config(&self) -> &MailConfig {
        self.http.config()
    }
}
