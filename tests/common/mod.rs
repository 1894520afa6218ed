//! Shared helpers for the wiremock-backed tests.

#![allow(dead_code)]

use integrations_mail::config::{BackoffStrategy, RateLimitConfig, RetryPolicy};
use integrations_mail::{MailClient, MailConfig};
use std::time::Duration;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockBuilder, MockServer, ResponseTemplate};

pub const API_KEY: &str = "test-api-key";
pub const ACCOUNT: &str = "acct_1";

pub fn messages_path() -> String {
    format!("/v2/accounts/{}/messages", ACCOUNT)
}

/// Retries with a short constant backoff so tests stay fast.
pub fn fast_retry(max_attempts: u32) -> RetryPolicy {
    RetryPolicy::default()
        .with_max_attempts(max_attempts)
        .with_backoff(
            BackoffStrategy::Constant,
            Duration::from_millis(10),
            Duration::from_millis(50),
        )
}

pub fn config_for(server: &MockServer, retry: RetryPolicy, rate_limit: RateLimitConfig) -> MailConfig {
    MailConfig::builder()
        .api_key(API_KEY)
        .account_id(ACCOUNT)
        .base_url(server.uri())
        .retry(retry)
        .rate_limit(rate_limit)
        .build()
        .expect("valid test config")
}

pub fn client_for(server: &MockServer) -> MailClient {
    MailClient::new(config_for(server, fast_retry(2), RateLimitConfig::default()))
        .expect("client builds")
}

/// A mock that only matches authenticated requests.
pub fn mock_with_auth(method_matcher: &str, path_matcher: &str) -> MockBuilder {
    Mock::given(method(method_matcher))
        .and(path(path_matcher))
        .and(header("authorization", format!("Bearer {}", API_KEY).as_str()))
}

pub fn error_response(status: u16, code: &str, message: &str) -> ResponseTemplate {
    ResponseTemplate::new(status).set_body_json(serde_json::json!({
        "code": code,
        "message": message,
    }))
}
