//! HTTP outcome classification.
//!
//! Maps status codes onto the [`ErrorKind`] taxonomy and builds
//! [`MailError::Api`] values from failed responses. The mapping is a fixed
//! table:
//!
//! | Status | Kind |
//! |--------|------|
//! | 400 | [`ErrorKind::Validation`] |
//! | 401 | [`ErrorKind::Authentication`] |
//! | 403 | [`ErrorKind::Permission`] |
//! | 404 | [`ErrorKind::NotFound`] |
//! | 409 | [`ErrorKind::Conflict`] |
//! | 412 | [`ErrorKind::Idempotency`] |
//! | 429 | [`ErrorKind::RateLimit`] |
//! | 5xx | [`ErrorKind::Server`] |
//! | other | [`ErrorKind::Unknown`] |
//!
//! # Error Response Format
//!
//! ```json
//! {
//!   "code": "invalid_recipient",
//!   "message": "Recipient address is malformed"
//! }
//! ```

use http::HeaderMap;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{ErrorKind, MailError};

/// Response header carrying the server's wait hint, in whole seconds.
pub const RETRY_AFTER_HEADER: &str = "retry-after";

/// Response header carrying the request tracing identifier.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// JSON error body returned by the API.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiErrorBody {
    /// Machine-readable error code.
    #[serde(default, alias = "error", alias = "errorCode")]
    pub code: Option<String>,

    /// Human-readable message.
    #[serde(default, alias = "Message", alias = "detail")]
    pub message: Option<String>,
}

/// Classify an HTTP status code.
///
/// # Examples
///
/// ```rust
/// use integrations_mail::error::{classify_status, ErrorKind};
///
/// assert_eq!(classify_status(429), ErrorKind::RateLimit);
/// assert_eq!(classify_status(502), ErrorKind::Server);
/// assert_eq!(classify_status(418), ErrorKind::Unknown);
/// ```
pub fn classify_status(status: u16) -> ErrorKind {
    match status {
        400 => ErrorKind::Validation,
        401 => ErrorKind::Authentication,
        403 => ErrorKind::Permission,
        404 => ErrorKind::NotFound,
        409 => ErrorKind::Conflict,
        412 => ErrorKind::Idempotency,
        429 => ErrorKind::RateLimit,
        500..=599 => ErrorKind::Server,
        _ => ErrorKind::Unknown,
    }
}

/// Read the `Retry-After` header as a whole number of seconds.
///
/// HTTP-date values and malformed numbers yield `None`.
pub fn extract_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

/// Read the request tracing identifier header.
pub fn extract_request_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
        .map(String::from)
}

/// Parse an API error body, tolerating empty or non-JSON payloads.
pub fn parse_error_body(body: &[u8]) -> Option<ApiErrorBody> {
    if body.is_empty() {
        return None;
    }
    serde_json::from_slice(body).ok()
}

/// Build a [`MailError::Api`] from a failed response.
///
/// `Retry-After` is only consulted when the status classifies as
/// [`ErrorKind::RateLimit`].
pub fn map_http_error(status: u16, headers: &HeaderMap, body: &[u8]) -> MailError {
    let kind = classify_status(status);

    let message = parse_error_body(body)
        .and_then(|b| match (b.code, b.message) {
            (Some(code), Some(message)) => Some(format!("{}: {}", code, message)),
            (None, Some(message)) => Some(message),
            (Some(code), None) => Some(code),
            (None, None) => None,
        })
        .unwrap_or_else(|| {
            http::StatusCode::from_u16(status)
                .ok()
                .and_then(|s| s.canonical_reason())
                .unwrap_or("Unexpected status")
                .to_string()
        });

    let retry_after = if kind == ErrorKind::RateLimit {
        extract_retry_after(headers)
    } else {
        None
    };

    MailError::Api {
        kind,
        status,
        message,
        request_id: extract_request_id(headers),
        retry_after,
    }
}
