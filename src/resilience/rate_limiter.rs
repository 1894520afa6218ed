//! Per-category rate limiting.
//!
//! Every outgoing request is classified into an [`EndpointCategory`] and
//! takes one token from that category's [`TokenBucket`] before it is sent.

use http::Method;
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::rate_limit::validate_limit;
use crate::config::{ConfigError, CustomerLimits, RateLimitConfig};
use crate::error::MailResult;

use super::clock::{Clock, SystemClock};
use super::token_bucket::TokenBucket;

/// Class of API traffic with its own rate limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndpointCategory {
    /// Everything not covered by another category.
    General,
    /// Reporting endpoints under a `statistics` path segment.
    Statistics,
    /// `POST .../accounts/{id}/messages`.
    SendMessage,
}

impl EndpointCategory {
    /// Every category.
    pub const ALL: [EndpointCategory; 3] = [
        EndpointCategory::General,
        EndpointCategory::Statistics,
        EndpointCategory::SendMessage,
    ];

    /// Stable name for logs.
    pub fn as_str(self) -> &'static str {
        match self {
            EndpointCategory::General => "general",
            EndpointCategory::Statistics => "statistics",
            EndpointCategory::SendMessage => "send_message",
        }
    }

    /// Classify a request.
    ///
    /// A POST to exactly `.../accounts/{id}/messages` is a send. Sub-resources
    /// of that path such as `.../messages/{mid}` are not. Anything with a
    /// `statistics` segment is statistics traffic. Everything else is general.
    ///
    /// # Examples
    ///
    /// ```
    /// use http::Method;
    /// use integrations_mail::resilience::EndpointCategory;
    ///
    /// assert_eq!(
    ///     EndpointCategory::classify(&Method::POST, "/v2/accounts/42/messages"),
    ///     EndpointCategory::SendMessage
    /// );
    /// assert_eq!(
    ///     EndpointCategory::classify(&Method::GET, "/v2/accounts/42/messages/abc"),
    ///     EndpointCategory::General
    /// );
    /// assert_eq!(
    ///     EndpointCategory::classify(&Method::GET, "/v2/accounts/42/statistics/bounce"),
    ///     EndpointCategory::Statistics
    /// );
    /// ```
    pub fn classify(method: &Method, path: &str) -> Self {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        if *method == Method::POST && is_send_path(&segments) {
            return EndpointCategory::SendMessage;
        }

        if segments.iter().any(|s| *s == "statistics") {
            return EndpointCategory::Statistics;
        }

        EndpointCategory::General
    }
}

fn is_send_path(segments: &[&str]) -> bool {
    matches!(segments, [.., "accounts", _, "messages"])
}

impl fmt::Display for EndpointCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Observability snapshot for one category.
#[derive(Debug, Clone, PartialEq)]
pub struct RateLimitStatus {
    /// The category described.
    pub category: EndpointCategory,
    /// Whether requests in this category are currently limited.
    pub enabled: bool,
    /// Refill rate.
    pub requests_per_second: f64,
    /// Capacity.
    pub burst_size: u32,
    /// Tokens available now.
    pub tokens_available: f64,
    /// Estimated time until a token is available.
    pub next_refill: Duration,
}

/// One token bucket per [`EndpointCategory`], plus a global switch.
///
/// Owned by a client instance; two clients never share limits.
pub struct RateLimiterRegistry {
    general: TokenBucket,
    statistics: TokenBucket,
    send_message: TokenBucket,
    global_enabled: RwLock<bool>,
}

impl RateLimiterRegistry {
    /// Build a registry from configuration.
    pub fn new(config: &RateLimitConfig) -> Result<Self, ConfigError> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Build a registry whose buckets read time from `clock`.
    pub fn with_clock(config: &RateLimitConfig, clock: Arc<dyn Clock>) -> Result<Self, ConfigError> {
        let bucket = |category: EndpointCategory| {
            TokenBucket::from_limit(config.limit(category), clock.clone())
                .map(|b| b.with_label(category.as_str()))
        };

        Ok(Self {
            general: bucket(EndpointCategory::General)?,
            statistics: bucket(EndpointCategory::Statistics)?,
            send_message: bucket(EndpointCategory::SendMessage)?,
            global_enabled: RwLock::new(config.enabled),
        })
    }

    /// The bucket backing `category`.
    pub fn bucket(&self, category: EndpointCategory) -> &TokenBucket {
        match category {
            EndpointCategory::General => &self.general,
            EndpointCategory::Statistics => &self.statistics,
            EndpointCategory::SendMessage => &self.send_message,
        }
    }

    /// Wait for a token in `category`.
    ///
    /// Returns immediately when limiting is globally disabled.
    pub async fn acquire(&self, cancel: &CancellationToken, category: EndpointCategory) -> MailResult<()> {
        if !self.is_global_enabled() {
            return Ok(());
        }
        self.bucket(category).acquire(cancel).await
    }

    /// Change rate and burst for one category.
    pub fn configure(
        &self,
        category: EndpointCategory,
        requests_per_second: f64,
        burst_size: u32,
    ) -> Result<(), ConfigError> {
        self.bucket(category).update_config(requests_per_second, burst_size)?;
        debug!(
            category = category.as_str(),
            requests_per_second, burst_size, "Rate limit configured"
        );
        Ok(())
    }

    /// Enable or disable limiting for one category.
    pub fn enable(&self, category: EndpointCategory, enabled: bool) {
        self.bucket(category).set_enabled(enabled);
        debug!(category = category.as_str(), enabled, "Rate limit category toggled");
    }

    /// Enable or disable limiting for every category.
    ///
    /// Per-category settings are untouched, so re-enabling restores them.
    pub fn set_global_enabled(&self, enabled: bool) {
        *self.global_enabled.write() = enabled;
        debug!(enabled, "Rate limiting toggled globally");
    }

    /// Whether limiting is globally enabled.
    pub fn is_global_enabled(&self) -> bool {
        *self.global_enabled.read()
    }

    /// Apply sparse overrides.
    ///
    /// Every present override is validated before any is applied.
    ///
    /// # Example
    ///
    /// ```
    /// use integrations_mail::config::{CustomerLimits, RateLimitConfig};
    /// use integrations_mail::resilience::{EndpointCategory, RateLimiterRegistry};
    ///
    /// # fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let registry = RateLimiterRegistry::new(&RateLimitConfig::default())?;
    /// registry.apply_customer_limits(&CustomerLimits::default().statistics(5.0, 10))?;
    ///
    /// assert_eq!(registry.status(EndpointCategory::Statistics).burst_size, 10);
    /// assert_eq!(registry.status(EndpointCategory::General).burst_size, 200);
    /// # Ok(())
    /// # }
    /// ```
    pub fn apply_customer_limits(&self, limits: &CustomerLimits) -> Result<(), ConfigError> {
        for category in EndpointCategory::ALL {
            if let Some(o) = limits.get(category) {
                validate_limit(o.requests_per_second, o.burst_size)?;
            }
        }

        for category in EndpointCategory::ALL {
            if let Some(o) = limits.get(category) {
                self.configure(category, o.requests_per_second, o.burst_size)?;
            }
        }
        Ok(())
    }

    /// Snapshot of one category.
    pub fn status(&self, category: EndpointCategory) -> RateLimitStatus {
        let snapshot = self.bucket(category).snapshot();
        RateLimitStatus {
            category,
            enabled: self.is_global_enabled() && snapshot.enabled,
            requests_per_second: snapshot.requests_per_second,
            burst_size: snapshot.burst_size,
            tokens_available: snapshot.tokens_available,
            next_refill: snapshot.next_refill,
        }
    }
}

impl fmt::Debug for RateLimiterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateLimiterRegistry")
            .field("global_enabled", &self.is_global_enabled())
            .field("general", &self.general)
            .field("statistics", &self.statistics)
            .field("send_message", &self.send_message)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CategoryLimit;
    use crate::error::MailError;
    use rstest::rstest;
    use tokio::time::Instant;

    #[rstest]
    #[case(Method::POST, "/v2/accounts/42/messages", EndpointCategory::SendMessage)]
    #[case(Method::POST, "/v2/accounts/42/messages/", EndpointCategory::SendMessage)]
    #[case(Method::POST, "/v2/accounts/42/messages?dry_run=1", EndpointCategory::SendMessage)]
    #[case(Method::GET, "/v2/accounts/42/messages", EndpointCategory::General)]
    #[case(Method::GET, "/v2/accounts/42/messages/abc", EndpointCategory::General)]
    #[case(Method::POST, "/v2/accounts/42/messages/abc/cancel", EndpointCategory::General)]
    #[case(Method::GET, "/v2/accounts/42/statistics/bounce", EndpointCategory::Statistics)]
    #[case(Method::POST, "/v2/accounts/42/statistics", EndpointCategory::Statistics)]
    #[case(Method::GET, "/v2/accounts/42/statisticsx", EndpointCategory::General)]
    #[case(Method::DELETE, "/v2/accounts/42/templates/7", EndpointCategory::General)]
    fn test_classify(#[case] method: Method, #[case] path: &str, #[case] expected: EndpointCategory) {
        assert_eq!(EndpointCategory::classify(&method, path), expected);
    }

    #[test]
    fn test_default_status() {
        let registry = RateLimiterRegistry::new(&RateLimitConfig::default()).unwrap();

        let general = registry.status(EndpointCategory::General);
        assert!(general.enabled);
        assert_eq!(general.requests_per_second, 100.0);
        assert_eq!(general.burst_size, 200);

        let stats = registry.status(EndpointCategory::Statistics);
        assert_eq!(stats.requests_per_second, 1.0);
        assert_eq!(stats.burst_size, 1);
    }

    #[test]
    fn test_apply_customer_limits_is_sparse_and_atomic() {
        let registry = RateLimiterRegistry::new(&RateLimitConfig::default()).unwrap();

        registry
            .apply_customer_limits(&CustomerLimits::default().send_message(10.0, 20))
            .unwrap();
        assert_eq!(registry.status(EndpointCategory::SendMessage).burst_size, 20);
        assert_eq!(registry.status(EndpointCategory::General).burst_size, 200);

        let bad = CustomerLimits::default().general(50.0, 50).statistics(0.0, 1);
        assert!(registry.apply_customer_limits(&bad).is_err());
        assert_eq!(registry.status(EndpointCategory::General).burst_size, 200);
    }

    #[tokio::test(start_paused = true)]
    async fn test_global_toggle_restores_category_state() {
        let config = RateLimitConfig::default()
            .with_limit(EndpointCategory::Statistics, CategoryLimit::new(1.0, 1));
        let registry = RateLimiterRegistry::new(&config).unwrap();
        registry.enable(EndpointCategory::General, false);
        let cancel = CancellationToken::new();

        registry.set_global_enabled(false);
        let start = Instant::now();
        for _ in 0..5 {
            registry.acquire(&cancel, EndpointCategory::Statistics).await.unwrap();
        }
        assert!(start.elapsed() < Duration::from_millis(10));
        assert!(!registry.status(EndpointCategory::Statistics).enabled);

        registry.set_global_enabled(true);
        assert!(!registry.status(EndpointCategory::General).enabled);
        let stats = registry.status(EndpointCategory::Statistics);
        assert!(stats.enabled);
        assert_eq!(stats.tokens_available, 1.0);

        registry.acquire(&cancel, EndpointCategory::Statistics).await.unwrap();
        registry.acquire(&cancel, EndpointCategory::Statistics).await.unwrap();
        assert!(start.elapsed() >= Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_categories_are_independent() {
        let registry = RateLimiterRegistry::new(&RateLimitConfig::default()).unwrap();
        let cancel = CancellationToken::new();

        registry.acquire(&cancel, EndpointCategory::Statistics).await.unwrap();

        let start = Instant::now();
        registry.acquire(&cancel, EndpointCategory::General).await.unwrap();
        registry.acquire(&cancel, EndpointCategory::SendMessage).await.unwrap();
        assert!(start.elapsed() < Duration::from_millis(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_acquire_cancelled() {
        let registry = RateLimiterRegistry::new(&RateLimitConfig::default()).unwrap();
        let cancel = CancellationToken::new();
        registry.acquire(&cancel, EndpointCategory::Statistics).await.unwrap();

        cancel.cancel();
        let result = registry.acquire(&cancel, EndpointCategory::Statistics).await;
        assert!(matches!(result, Err(MailError::Cancelled)));
    }
}
