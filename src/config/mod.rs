//! Configuration module for the mail API client.
//!
//! This module provides configuration types and builders for creating and
//! customizing client behavior, including:
//!
//! - Credentials and account selection
//! - Base URL and timeouts
//! - Retry policy and backoff
//! - Per-category rate limits
//! - Idempotency key generation

use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;
use url::Url;

pub mod error;
pub mod idempotency;
pub mod rate_limit;
pub mod retry;

pub use error::ConfigError;
pub use idempotency::IdempotencyPolicy;
pub use rate_limit::{CategoryLimit, CustomerLimits, LimitOverride, RateLimitConfig};
pub use retry::{AttemptOutcome, BackoffStrategy, RetryPolicy};

/// Default API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.mail.example.com";

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default connect timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration for the mail client.
#[derive(Clone)]
pub struct MailConfig {
    /// API key sent as a bearer token.
    pub(crate) api_key: SecretString,

    /// Account the client operates on.
    pub account_id: String,

    /// Base URL for API requests.
    pub base_url: Url,

    /// Timeout for the entire request.
    pub timeout: Duration,

    /// Timeout for establishing connections.
    pub connect_timeout: Duration,

    /// User agent string.
    pub user_agent: String,

    /// Retry policy applied to every call.
    pub retry: RetryPolicy,

    /// Rate limiting configuration.
    pub rate_limit: RateLimitConfig,

    /// Idempotency key policy.
    pub idempotency: IdempotencyPolicy,
}

impl std::fmt::Debug for MailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MailConfig")
            .field("api_key", &"[REDACTED]")
            .field("account_id", &self.account_id)
            .field("base_url", &self.base_url.as_str())
            .field("timeout", &self.timeout)
            .field("connect_timeout", &self.connect_timeout)
            .field("user_agent", &self.user_agent)
            .field("retry", &self.retry)
            .field("rate_limit", &self.rate_limit)
            .field("idempotency", &self.idempotency)
            .finish()
    }
}

impl MailConfig {
    /// Create a new configuration builder.
    ///
    /// # Example
    ///
    /// ```
    /// use integrations_mail::config::MailConfig;
    ///
    /// # fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let config = MailConfig::builder()
    ///     .api_key("key-123")
    ///     .account_id("acct-1")
    ///     .build()?;
    /// assert_eq!(config.account_id, "acct-1");
    /// # Ok(())
    /// # }
    /// ```
    pub fn builder() -> MailConfigBuilder {
        MailConfigBuilder::default()
    }

    /// Create a configuration from environment variables.
    ///
    /// Reads:
    /// - `MAIL_API_KEY` and `MAIL_ACCOUNT_ID` (required)
    /// - `MAIL_BASE_URL`
    /// - `MAIL_TIMEOUT_SECS`
    /// - `MAIL_MAX_RETRIES`
    /// - `MAIL_RATE_LIMIT_ENABLED`
    /// - `MAIL_IDEMPOTENCY_AUTO`
    /// - `MAIL_IDEMPOTENCY_PREFIX`
    ///
    /// # Example
    ///
    /// ```no_run
    /// use integrations_mail::config::MailConfig;
    ///
    /// # fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let config = MailConfig::from_env()?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Create a configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |variable: &'static str| {
            lookup(variable).ok_or(ConfigError::MissingVariable { variable })
        };
        let api_key = required("MAIL_API_KEY")?;
        let account_id = required("MAIL_ACCOUNT_ID")?;

        let mut builder = Self::builder().api_key(api_key).account_id(account_id);

        if let Some(url) = lookup("MAIL_BASE_URL") {
            builder = builder.base_url(url);
        }

        if let Some(secs) = lookup("MAIL_TIMEOUT_SECS") {
            let secs = parse_env::<u64>("MAIL_TIMEOUT_SECS", &secs)?;
            builder = builder.timeout(Duration::from_secs(secs));
        }

        let mut retry = RetryPolicy::default();
        if let Some(retries) = lookup("MAIL_MAX_RETRIES") {
            retry.max_attempts = parse_env::<u32>("MAIL_MAX_RETRIES", &retries)?;
        }
        builder = builder.retry(retry);

        if let Some(enabled) = lookup("MAIL_RATE_LIMIT_ENABLED") {
            let enabled = parse_env::<bool>("MAIL_RATE_LIMIT_ENABLED", &enabled)?;
            builder = builder.rate_limit(RateLimitConfig {
                enabled,
                ..RateLimitConfig::default()
            });
        }

        let mut idempotency = IdempotencyPolicy::default();
        if let Some(auto) = lookup("MAIL_IDEMPOTENCY_AUTO") {
            idempotency.auto_generate = parse_env::<bool>("MAIL_IDEMPOTENCY_AUTO", &auto)?;
        }
        if let Some(prefix) = lookup("MAIL_IDEMPOTENCY_PREFIX") {
            idempotency = idempotency.with_prefix(prefix);
        }

        builder.idempotency(idempotency).build()
    }

    /// The API key, for building the authorization header.
    pub(crate) fn bearer_token(&self) -> String {
        format!("Bearer {}", self.api_key.expose_secret())
    }

    /// Resolve an API path against the base URL.
    ///
    /// # Example
    ///
    /// ```
    /// use integrations_mail::config::MailConfig;
    ///
    /// # fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let config = MailConfig::builder()
    ///     .api_key("key")
    ///     .account_id("acct")
    ///     .base_url("http://localhost:8080/mail/")
    ///     .build()?;
    ///
    /// let url = config.endpoint_url("/v2/accounts/acct/messages")?;
    /// assert_eq!(url.as_str(), "http://localhost:8080/mail/v2/accounts/acct/messages");
    /// # Ok(())
    /// # }
    /// ```
    pub fn endpoint_url(&self, path: &str) -> Result<Url, ConfigError> {
        let joined = format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        Url::parse(&joined).map_err(|e| ConfigError::InvalidUrl {
            url: joined.clone(),
            reason: e.to_string(),
        })
    }
}

fn parse_env<T: std::str::FromStr>(variable: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse::<T>().map_err(|_| ConfigError::InvalidVariable {
        variable,
        value: value.to_string(),
    })
}

/// Builder for creating mail client configurations.
#[derive(Default)]
pub struct MailConfigBuilder {
    api_key: Option<SecretString>,
    account_id: Option<String>,
    base_url: Option<String>,
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    user_agent: Option<String>,
    retry: Option<RetryPolicy>,
    rate_limit: Option<RateLimitConfig>,
    idempotency: Option<IdempotencyPolicy>,
}

impl MailConfigBuilder {
    /// Set the API key.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(SecretString::new(key.into()));
        self
    }

    /// Set the account identifier used in request paths.
    pub fn account_id(mut self, account_id: impl Into<String>) -> Self {
        self.account_id = Some(account_id.into());
        self
    }

    /// Set a custom base URL.
    ///
    /// Useful for pointing the client at a local mock server.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the request timeout.
    pub fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }

    /// Set the connection timeout.
    pub fn connect_timeout(mut self, duration: Duration) -> Self {
        self.connect_timeout = Some(duration);
        self
    }

    /// Set a custom user agent string.
    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = Some(ua.into());
        self
    }

    /// Set the retry policy.
    ///
    /// # Example
    ///
    /// ```
    /// use integrations_mail::config::{MailConfig, RetryPolicy};
    ///
    /// let builder = MailConfig::builder()
    ///     .api_key("key")
    ///     .account_id("acct")
    ///     .retry(RetryPolicy::default().with_max_attempts(5));
    /// ```
    pub fn retry(mut self, policy: RetryPolicy) -> Self {
        self.retry = Some(policy);
        self
    }

    /// Set the rate limiting configuration.
    pub fn rate_limit(mut self, config: RateLimitConfig) -> Self {
        self.rate_limit = Some(config);
        self
    }

    /// Set the idempotency policy.
    pub fn idempotency(mut self, policy: IdempotencyPolicy) -> Self {
        self.idempotency = Some(policy);
        self
    }

    /// Build the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingField` if the API key or account id is
    /// missing, `ConfigError::InvalidUrl` for a malformed base URL and
    /// `ConfigError::InvalidRateLimit` for a non-positive rate or zero burst.
    pub fn build(self) -> Result<MailConfig, ConfigError> {
        let api_key = self
            .api_key
            .filter(|k| !k.expose_secret().is_empty())
            .ok_or_else(|| ConfigError::MissingField {
                field: "api_key",
            })?;

        let account_id = self
            .account_id
            .filter(|a| !a.is_empty())
            .ok_or_else(|| ConfigError::MissingField {
                field: "account_id",
            })?;

        let raw_url = self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL);
        let invalid_url = |reason: String| ConfigError::InvalidUrl {
            url: raw_url.to_string(),
            reason,
        };
        let base_url = Url::parse(raw_url).map_err(|e| invalid_url(e.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(invalid_url("cannot be used as a base".to_string()));
        }

        let rate_limit = self.rate_limit.unwrap_or_default();
        rate_limit.validate()?;

        Ok(MailConfig {
            api_key,
            account_id,
            base_url,
            timeout: self.timeout.unwrap_or(DEFAULT_TIMEOUT),
            connect_timeout: self.connect_timeout.unwrap_or(DEFAULT_CONNECT_TIMEOUT),
            user_agent: self.user_agent.unwrap_or_else(|| crate::USER_AGENT.to_string()),
            retry: self.retry.unwrap_or_default(),
            rate_limit,
            idempotency: self.idempotency.unwrap_or_default(),
        })
    }
}
