//! Request types.
//!
//! [`MailRequest`] is what service wrappers build: a method, an API path and
//! an optional JSON body. [`OutgoingRequest`] is the fully resolved template
//! the retry loop replays; its body is buffered once and cloned cheaply per
//! attempt.

use bytes::Bytes;
use http::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use http::{HeaderMap, Method};
use serde::Serialize;
use url::Url;

use crate::error::{MailError, MailResult};

/// Header carrying the idempotency key on mutating requests.
pub const IDEMPOTENCY_KEY_HEADER: &str = "idempotency-key";

/// An API call before authentication and URL resolution.
#[derive(Debug, Clone)]
pub struct MailRequest {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    headers: HeaderMap,
    body: Option<Bytes>,
}

impl MailRequest {
    /// Create a request for `path` (relative to the base URL).
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    /// GET `path`.
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    /// POST `path`.
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    /// Append a query parameter.
    pub fn query(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((name.into(), value.to_string()));
        self
    }

    /// Append a query parameter if present.
    pub fn query_opt<V: ToString>(self, name: &str, value: Option<V>) -> Self {
        match value {
            Some(v) => self.query(name, v),
            None => self,
        }
    }

    /// Set a header.
    pub fn header(mut self, name: &str, value: &str) -> MailResult<Self> {
        let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| MailError::InvalidRequest {
            message: format!("invalid header name {}: {}", name, e),
        })?;
        let value = HeaderValue::from_str(value).map_err(|e| MailError::InvalidRequest {
            message: format!("invalid value for header {}: {}", name, e),
        })?;
        self.headers.insert(name, value);
        Ok(self)
    }

    /// Serialize `body` as the JSON payload.
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> MailResult<Self> {
        let bytes = serde_json::to_vec(body)?;
        self.headers
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        self.body = Some(Bytes::from(bytes));
        Ok(self)
    }

    /// Attach an explicit idempotency key.
    pub fn idempotency_key(self, key: &str) -> MailResult<Self> {
        self.header(IDEMPOTENCY_KEY_HEADER, key)
    }

    /// HTTP method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// API path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Query parameters in insertion order.
    pub fn query_pairs(&self) -> &[(String, String)] {
        &self.query
    }

    /// Headers set so far.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// The idempotency key already on the request, or `""`.
    pub fn existing_idempotency_key(&self) -> &str {
        self.headers
            .get(IDEMPOTENCY_KEY_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
    }

    pub(crate) fn into_parts(self) -> RequestParts {
        RequestParts {
            method: self.method,
            path: self.path,
            query: self.query,
            headers: self.headers,
            body: self.body,
        }
    }
}

pub(crate) struct RequestParts {
    pub(crate) method: Method,
    pub(crate) path: String,
    pub(crate) query: Vec<(String, String)>,
    pub(crate) headers: HeaderMap,
    pub(crate) body: Option<Bytes>,
}

/// A resolved request, replayed verbatim on every attempt.
#[derive(Debug, Clone)]
pub struct OutgoingRequest {
    /// HTTP method.
    pub method: Method,
    /// Absolute URL including query.
    pub url: Url,
    /// Every header to send.
    pub headers: HeaderMap,
    /// Buffered body.
    pub body: Option<Bytes>,
}

impl OutgoingRequest {
    /// Create a request without headers or body.
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    /// Set the body.
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Value of a header as a string, if present and valid.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}
