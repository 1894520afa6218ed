//! Rate limiting configuration.

use crate::resilience::EndpointCategory;

use super::ConfigError;

/// Token bucket settings for one endpoint category.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CategoryLimit {
    /// Sustained requests per second (refill rate).
    pub requests_per_second: f64,

    /// Maximum burst size (token bucket capacity).
    pub burst_size: u32,

    /// Whether this category is limited at all.
    pub enabled: bool,
}

impl CategoryLimit {
    /// An enabled limit with the given rate and burst.
    pub fn new(requests_per_second: f64, burst_size: u32) -> Self {
        Self {
            requests_per_second,
            burst_size,
            enabled: true,
        }
    }

    /// Default limit for a category.
    ///
    /// General and send traffic get 100 rps with a burst of 200;
    /// statistics endpoints get 1 rps with a burst of 1.
    pub fn default_for(category: EndpointCategory) -> Self {
        match category {
            EndpointCategory::General | EndpointCategory::SendMessage => Self::new(100.0, 200),
            EndpointCategory::Statistics => Self::new(1.0, 1),
        }
    }

    /// Check that the rate is positive and finite and the burst is at least one.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_limit(self.requests_per_second, self.burst_size)
    }
}

pub(crate) fn validate_limit(requests_per_second: f64, burst_size: u32) -> Result<(), ConfigError> {
    if !requests_per_second.is_finite() || requests_per_second <= 0.0 {
        return Err(ConfigError::InvalidRateLimit {
            reason: format!("requests_per_second must be positive, got {}", requests_per_second),
        });
    }
    if burst_size == 0 {
        return Err(ConfigError::InvalidRateLimit {
            reason: "burst_size must be at least 1".to_string(),
        });
    }
    Ok(())
}

/// Per-category rate limiting configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct RateLimitConfig {
    /// Global switch; when false no bucket is consulted.
    pub enabled: bool,

    /// Limit for ordinary API calls.
    pub general: CategoryLimit,

    /// Limit for statistics endpoints.
    pub statistics: CategoryLimit,

    /// Limit for message sends.
    pub send_message: CategoryLimit,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            general: CategoryLimit::default_for(EndpointCategory::General),
            statistics: CategoryLimit::default_for(EndpointCategory::Statistics),
            send_message: CategoryLimit::default_for(EndpointCategory::SendMessage),
        }
    }
}

impl RateLimitConfig {
    /// Configuration with rate limiting switched off globally.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Limit for `category`.
    pub fn limit(&self, category: EndpointCategory) -> &CategoryLimit {
        match category {
            EndpointCategory::General => &self.general,
            EndpointCategory::Statistics => &self.statistics,
            EndpointCategory::SendMessage => &self.send_message,
        }
    }

    /// Replace the limit for `category`.
    pub fn with_limit(mut self, category: EndpointCategory, limit: CategoryLimit) -> Self {
        match category {
            EndpointCategory::General => self.general = limit,
            EndpointCategory::Statistics => self.statistics = limit,
            EndpointCategory::SendMessage => self.send_message = limit,
        }
        self
    }

    /// Validate every category.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for category in EndpointCategory::ALL {
            self.limit(category).validate()?;
        }
        Ok(())
    }
}

/// Rate and burst for one category in a [`CustomerLimits`] override.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LimitOverride {
    /// New refill rate.
    pub requests_per_second: f64,
    /// New capacity.
    pub burst_size: u32,
}

/// Sparse per-account overrides; absent categories are left untouched.
///
/// # Example
///
/// ```
/// use integrations_mail::config::CustomerLimits;
///
/// let limits = CustomerLimits::default().send_message(20.0, 40);
/// assert!(limits.general.is_none());
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CustomerLimits {
    /// Override for general traffic.
    pub general: Option<LimitOverride>,
    /// Override for statistics traffic.
    pub statistics: Option<LimitOverride>,
    /// Override for message sends.
    pub send_message: Option<LimitOverride>,
}

impl CustomerLimits {
    /// Override general traffic limits.
    pub fn general(mut self, requests_per_second: f64, burst_size: u32) -> Self {
        self.general = Some(LimitOverride {
            requests_per_second,
            burst_size,
        });
        self
    }

    /// Override statistics limits.
    pub fn statistics(mut self, requests_per_second: f64, burst_size: u32) -> Self {
        self.statistics = Some(LimitOverride {
            requests_per_second,
            burst_size,
        });
        self
    }

    /// Override message send limits.
    pub fn send_message(mut self, requests_per_second: f64, burst_size: u32) -> Self {
        self.send_message = Some(LimitOverride {
            requests_per_second,
            burst_size,
        });
        self
    }

    /// Override present for `category`, if any.
    pub fn get(&self, category: EndpointCategory) -> Option<&LimitOverride> {
        match category {
            EndpointCategory::General => self.general.as_ref(),
            EndpointCategory::Statistics => self.statistics.as_ref(),
            EndpointCategory::SendMessage => self.send_message.as_ref(),
        }
    }
}
