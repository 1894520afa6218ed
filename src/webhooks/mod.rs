//! Webhook verification.
//!
//! The API signs each webhook delivery with HMAC-SHA256 over
//! `"{timestamp}.{body}"` using the account's webhook secret and sends the
//! hex digest, optionally prefixed with `sha256=`.

use chrono::{DateTime, Utc};
use constant_time_eq::constant_time_eq;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Default timestamp tolerance (5 minutes)
pub const DEFAULT_TOLERANCE: Duration = Duration::from_secs(300);

/// Header carrying the signature.
pub const SIGNATURE_HEADER: &str = "x-mail-signature";

/// Header carrying the signing timestamp (unix seconds).
pub const TIMESTAMP_HEADER: &str = "x-mail-timestamp";

/// Webhook verification failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WebhookError {
    /// The signature does not match the payload.
    #[error("Invalid webhook signature")]
    InvalidSignature,

    /// The timestamp header is not a unix timestamp.
    #[error("Invalid webhook timestamp: {value}")]
    InvalidTimestamp {
        /// The raw header value.
        value: String,
    },

    /// The timestamp is outside the tolerance window.
    #[error("Webhook timestamp {timestamp} is outside the {tolerance_secs}s tolerance")]
    ExpiredTimestamp {
        /// The parsed timestamp.
        timestamp: i64,
        /// Allowed skew in seconds.
        tolerance_secs: u64,
    },

    /// The payload is not a valid event.
    #[error("Invalid webhook payload: {message}")]
    InvalidPayload {
        /// Decoder message.
        message: String,
    },
}

/// A delivery or engagement event pushed by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookEvent {
    /// Event id.
    pub id: String,
    /// Event type, e.g. `message.delivered`.
    #[serde(rename = "type")]
    pub event_type: String,
    /// Message the event concerns.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    /// When the event happened.
    pub occurred_at: DateTime<Utc>,
    /// Event-specific data.
    #[serde(default)]
    pub data: serde_json::Value,
}

/// Webhook signature verifier
pub struct WebhookVerifier {
    secret: SecretString,
    tolerance: Duration,
}

impl WebhookVerifier {
    /// Create a new verifier with the webhook secret
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: SecretString::new(secret.into()),
            tolerance: DEFAULT_TOLERANCE,
        }
    }

    /// Set custom timestamp tolerance
    pub fn with_tolerance(mut self, tolerance: Duration) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Verify a delivery against the current time.
    ///
    /// # Example
    ///
    /// ```
    /// use integrations_mail::webhooks::WebhookVerifier;
    ///
    /// let verifier = WebhookVerifier::new("whsec");
    /// let now = chrono::Utc::now().timestamp().to_string();
    /// let body = br#"{"id":"evt_1"}"#;
    ///
    /// let signature = verifier.sign(&now, body).unwrap();
    /// assert!(verifier.verify(&now, &signature, body).is_ok());
    /// assert!(verifier.verify(&now, "sha256=00", body).is_err());
    /// ```
    pub fn verify(&self, timestamp: &str, signature: &str, body: &[u8]) -> Result<(), WebhookError> {
        self.verify_at(timestamp, signature, body, Utc::now().timestamp())
    }

    /// Verify a delivery against `now` (unix seconds).
    pub fn verify_at(
        &self,
        timestamp: &str,
        signature: &str,
        body: &[u8],
        now: i64,
    ) -> Result<(), WebhookError> {
        let ts: i64 = timestamp.trim().parse().map_err(|_| {
            warn!(timestamp, "Invalid webhook timestamp format");
            WebhookError::InvalidTimestamp {
                value: timestamp.to_string(),
            }
        })?;

        let age = now.saturating_sub(ts).unsigned_abs();
        if age > self.tolerance.as_secs() {
            warn!(
                timestamp = ts,
                age,
                tolerance = self.tolerance.as_secs(),
                "Webhook timestamp outside tolerance"
            );
            return Err(WebhookError::ExpiredTimestamp {
                timestamp: ts,
                tolerance_secs: self.tolerance.as_secs(),
            });
        }

        let provided = signature.trim();
        let provided = provided.strip_prefix("sha256=").unwrap_or(provided);
        let expected = self.compute_signature(timestamp.trim(), body)?;

        if !constant_time_eq(provided.to_ascii_lowercase().as_bytes(), expected.as_bytes()) {
            warn!("Webhook signature mismatch");
            return Err(WebhookError::InvalidSignature);
        }

        debug!(timestamp = ts, "Webhook signature verified");
        Ok(())
    }

    /// Verify a delivery and decode its event.
    pub fn verify_event<T: DeserializeOwned>(
        &self,
        timestamp: &str,
        signature: &str,
        body: &[u8],
    ) -> Result<T, WebhookError> {
        self.verify(timestamp, signature, body)?;
        serde_json::from_slice(body).map_err(|e| WebhookError::InvalidPayload {
            message: e.to_string(),
        })
    }

    /// Produce the `sha256=`-prefixed signature for a payload.
    pub fn sign(&self, timestamp: &str, body: &[u8]) -> Result<String, WebhookError> {
        Ok(format!("sha256={}", self.compute_signature(timestamp, body)?))
    }

    fn compute_signature(&self, timestamp: &str, body: &[u8]) -> Result<String, WebhookError> {
        let mut mac = Hmac::<Sha256>::new_from_slice(self.secret.expose_secret().as_bytes())
            .map_err(|_| WebhookError::InvalidSignature)?;
        mac.update(timestamp.as_bytes());
        mac.update(b".");
        mac.update(body);
        Ok(hex::encode(mac.finalize().into_bytes()))
    }
}

impl std::fmt::Debug for WebhookVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookVerifier")
            .field("secret", &"[REDACTED]")
            .field("tolerance", &self.tolerance)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_700_000_000;
    const BODY: &[u8] = br#"{"id":"evt_1","type":"message.delivered","message_id":"m1","occurred_at":"2023-11-14T22:13:20Z"}"#;

    fn verifier() -> WebhookVerifier {
        WebhookVerifier::new("whsec_test")
    }

    #[test]
    fn test_signature_covers_timestamp_and_body() {
        let v = verifier();
        let sig = v.compute_signature("100", b"payload").unwrap();
        assert_eq!(sig.len(), 64);
        assert!(sig.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_eq!(sig, v.compute_signature("100", b"payload").unwrap());

        assert_ne!(sig, v.compute_signature("101", b"payload").unwrap());
        assert_ne!(sig, v.compute_signature("100", b"payload2").unwrap());
    }

    #[test]
    fn test_sign_and_verify() {
        let v = verifier();
        let ts = NOW.to_string();
        let signature = v.sign(&ts, BODY).unwrap();
        assert!(signature.starts_with("sha256="));

        assert!(v.verify_at(&ts, &signature, BODY, NOW).is_ok());
        let bare = signature.trim_start_matches("sha256=");
        assert!(v.verify_at(&ts, bare, BODY, NOW).is_ok());
        assert!(v.verify_at(&ts, &bare.to_uppercase(), BODY, NOW).is_ok());
    }

    #[test]
    fn test_tampered_body_rejected() {
        let v = verifier();
        let ts = NOW.to_string();
        let signature = v.sign(&ts, BODY).unwrap();

        assert_eq!(
            v.verify_at(&ts, &signature, b"{}", NOW),
            Err(WebhookError::InvalidSignature)
        );
        assert_eq!(
            WebhookVerifier::new("other").verify_at(&ts, &signature, BODY, NOW),
            Err(WebhookError::InvalidSignature)
        );
    }

    #[test]
    fn test_timestamp_checks() {
        let v = verifier().with_tolerance(Duration::from_secs(60));
        let old = (NOW - 61).to_string();
        let signature = v.sign(&old, BODY).unwrap();

        assert!(matches!(
            v.verify_at(&old, &signature, BODY, NOW),
            Err(WebhookError::ExpiredTimestamp { tolerance_secs: 60, .. })
        ));

        let future = (NOW + 30).to_string();
        let signature = v.sign(&future, BODY).unwrap();
        assert!(v.verify_at(&future, &signature, BODY, NOW).is_ok());

        assert!(matches!(
            v.verify_at("yesterday", "sha256=00", BODY, NOW),
            Err(WebhookError::InvalidTimestamp { .. })
        ));
    }

    #[test]
    fn test_verify_event() {
        let v = verifier();
        let ts = Utc::now().timestamp().to_string();
        let signature = v.sign(&ts, BODY).unwrap();

        let event: WebhookEvent = v.verify_event(&ts, &signature, BODY).unwrap();
        assert_eq!(event.event_type, "message.delivered");
        assert_eq!(event.message_id.as_deref(), Some("m1"));
    }

    #[test]
    fn test_debug_redacts_secret() {
        assert!(!format!("{:?}", verifier()).contains("whsec_test"));
    }
}
