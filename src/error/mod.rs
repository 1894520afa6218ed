//! Error types for the mail API client.
//!
//! Every failure surfaced by the client is a [`MailError`]. HTTP-level
//! failures carry an [`ErrorKind`] from the closed taxonomy produced by the
//! error classifier in [`mapping`], which also decides retryability.
//!
//! # Examples
//!
//! ```rust
//! use integrations_mail::error::{ErrorKind, MailError};
//!
//! fn handle(error: &MailError) {
//!     if error.is_cancelled() {
//!         return;
//!     }
//!     match error.kind() {
//!         Some(ErrorKind::RateLimit) => println!("slow down: {:?}", error.retry_after()),
//!         Some(kind) if kind.is_retryable() => println!("transient: {}", error),
//!         _ => println!("permanent: {}", error),
//!     }
//! }
//! ```

mod mapping;

pub use mapping::{
    classify_status, extract_request_id, extract_retry_after, map_http_error, parse_error_body,
    ApiErrorBody, REQUEST_ID_HEADER, RETRY_AFTER_HEADER,
};

use std::fmt;
use std::time::Duration;
use thiserror::Error;

use crate::config::ConfigError;
use crate::webhooks::WebhookError;

/// Result type alias for mail client operations.
pub type MailResult<T> = Result<T, MailError>;

/// Closed taxonomy of API failure kinds.
///
/// Each kind has a fixed retryability verdict: only [`ErrorKind::RateLimit`],
/// [`ErrorKind::Server`] and [`ErrorKind::Network`] are retryable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// 401: missing or invalid credentials.
    Authentication,
    /// 403: credentials lack access to the resource.
    Permission,
    /// 400: the request was rejected as malformed.
    Validation,
    /// 404: the resource does not exist.
    NotFound,
    /// 409: the request conflicts with current resource state.
    Conflict,
    /// 429: the account is being throttled.
    RateLimit,
    /// 412: the idempotency key was reused with a different request.
    Idempotency,
    /// 5xx: the service failed.
    Server,
    /// The request never produced an HTTP response.
    Network,
    /// Any status outside the table.
    Unknown,
}

impl ErrorKind {
    /// Whether failures of this kind are retryable by default.
    pub fn is_retryable(self) -> bool {
        matches!(self, ErrorKind::RateLimit | ErrorKind::Server | ErrorKind::Network)
    }

    /// Stable string code for the kind.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Authentication => "authentication",
            ErrorKind::Permission => "permission",
            ErrorKind::Validation => "validation",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::RateLimit => "rate_limit",
            ErrorKind::Idempotency => "idempotency",
            ErrorKind::Server => "server",
            ErrorKind::Network => "network",
            ErrorKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Top-level error type for the mail API client.
#[derive(Debug, Error)]
pub enum MailError {
    /// The API answered with a failure status.
    #[error("API error ({kind}, HTTP {status}): {message}")]
    Api {
        /// Classified kind of the failure.
        kind: ErrorKind,
        /// HTTP status code.
        status: u16,
        /// Message from the error body, or the status reason.
        message: String,
        /// Request tracing identifier from the response headers.
        request_id: Option<String>,
        /// Server-provided wait hint, only populated for rate limit errors.
        retry_after: Option<Duration>,
    },

    /// The request failed below HTTP (DNS, connect, reset, timeout).
    #[error("Network error: {message}")]
    Network {
        /// Description of the transport failure.
        message: String,
        /// Underlying error.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Every allowed attempt produced a retryable response.
    #[error("Retries exhausted after {attempts} attempts: {last}")]
    RetriesExhausted {
        /// Number of network attempts made.
        attempts: u32,
        /// Error built from the last response.
        last: Box<MailError>,
    },

    /// The operation was cancelled by the caller.
    #[error("Operation cancelled")]
    Cancelled,

    /// The client is misconfigured.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the configuration problem.
        message: String,
    },

    /// A request or response body could not be (de)serialized.
    #[error("Serialization error: {message}")]
    Serialization {
        /// Description of the serialization failure.
        message: String,
    },

    /// The request was rejected before it was sent.
    #[error("Invalid request: {message}")]
    InvalidRequest {
        /// Description of the problem.
        message: String,
    },

    /// Webhook signature verification failed.
    #[error("Webhook error: {0}")]
    Webhook(#[from] WebhookError),
}

impl MailError {
    /// Creates a network error from any transport failure.
    pub fn network<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        MailError::Network {
            message: error.to_string(),
            source: Some(Box::new(error)),
        }
    }

    /// Returns the classified kind, if this error came from the API or the network.
    ///
    /// Cancellation and local errors have no kind.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            MailError::Api { kind, .. } => Some(*kind),
            MailError::Network { .. } => Some(ErrorKind::Network),
            MailError::RetriesExhausted { last, .. } => last.kind(),
            _ => None,
        }
    }

    /// Returns true if the error is retryable by default.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use integrations_mail::error::MailError;
    ///
    /// assert!(!MailError::Cancelled.is_retryable());
    /// ```
    pub fn is_retryable(&self) -> bool {
        match self {
            MailError::RetriesExhausted { .. } => false,
            other => other.kind().map_or(false, ErrorKind::is_retryable),
        }
    }

    /// Returns true if the operation was cancelled.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, MailError::Cancelled)
    }

    /// Returns the HTTP status code, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            MailError::Api { status, .. } => Some(*status),
            MailError::RetriesExhausted { last, .. } => last.status(),
            _ => None,
        }
    }

    /// Returns the request tracing identifier, if the server sent one.
    pub fn request_id(&self) -> Option<&str> {
        match self {
            MailError::Api { request_id, .. } => request_id.as_deref(),
            MailError::RetriesExhausted { last, .. } => last.request_id(),
            _ => None,
        }
    }

    /// Returns the server's Retry-After hint for rate limit errors.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            MailError::Api { retry_after, .. } => *retry_after,
            MailError::RetriesExhausted { last, .. } => last.retry_after(),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for MailError {
    fn from(err: serde_json::Error) -> Self {
        MailError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<reqwest::Error> for MailError {
    fn from(err: reqwest::Error) -> Self {
        MailError::network(err)
    }
}

impl From<ConfigError> for MailError {
    fn from(err: ConfigError) -> Self {
        MailError::Configuration {
            message: err.to_string(),
        }
    }
}
