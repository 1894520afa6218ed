//! Response type.

use bytes::Bytes;
use http::{HeaderMap, StatusCode};
use serde::de::DeserializeOwned;

use crate::error::{extract_request_id, map_http_error, MailError, MailResult};

/// A fully buffered HTTP response.
#[derive(Debug, Clone)]
pub struct MailResponse {
    /// Status code.
    pub status: StatusCode,
    /// Response headers.
    pub headers: HeaderMap,
    /// Response body.
    pub body: Bytes,
}

impl MailResponse {
    /// Create a response.
    pub fn new(status: StatusCode, headers: HeaderMap, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
        }
    }

    /// True for 2xx and 3xx.
    pub fn is_success(&self) -> bool {
        self.status.is_success() || self.status.is_redirection()
    }

    /// The request tracing identifier header, if present.
    pub fn request_id(&self) -> Option<String> {
        extract_request_id(&self.headers)
    }

    /// Deserialize the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> MailResult<T> {
        serde_json::from_slice(&self.body).map_err(|e| MailError::Serialization {
            message: format!("failed to decode response body: {}", e),
        })
    }

    /// Classify this response as an error.
    pub fn to_error(&self) -> MailError {
        map_http_error(self.status.as_u16(), &self.headers, &self.body)
    }

    /// Pass through successful responses; classify the rest.
    pub fn error_for_status(self) -> MailResult<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(self.to_error())
        }
    }
}
