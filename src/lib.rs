//! Transactional Email API Client
//!
//! Async client for a transactional email REST API, with a resilience layer
//! every call passes through.
//!
//! # Features
//!
//! - **Rate Limiting**: Per-category token buckets (general, statistics, sends),
//!   tunable at runtime
//! - **Retries**: Exponential, linear or constant backoff with jitter
//! - **Idempotency**: Automatic `Idempotency-Key` for message sends
//! - **Cancellation**: Every wait honors a [`CancellationToken`](tokio_util::sync::CancellationToken)
//! - **Error Handling**: Classified errors with retryability information
//! - **Webhooks**: HMAC-SHA256 signature verification
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use integrations_mail::types::SendMessageRequest;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = integrations_mail::create_client_from_env()?;
//!
//!     let message = SendMessageRequest::new("noreply@example.com", "Hello")
//!         .to("user@example.com")
//!         .text("This is a test email.");
//!
//!     let response = client.messages().send(&message, &CancellationToken::new()).await?;
//!     println!("Message sent! ID: {}", response.id);
//!     Ok(())
//! }
//! ```
//!
//! # Request Flow
//!
//! ```text
//! classify endpoint ─▶ acquire token ─▶ idempotency key ─▶ send with retries ─▶ classify errors
//! ```
//!
//! # Error Handling
//!
//! ```rust,no_run
//! use integrations_mail::{ErrorKind, MailError};
//! # use integrations_mail::MailClient;
//! # use tokio_util::sync::CancellationToken;
//!
//! # async fn example(client: &MailClient) {
//! match client.messages().get("m1", &CancellationToken::new()).await {
//!     Ok(message) => println!("{:?}", message.status),
//!     Err(e) if e.kind() == Some(ErrorKind::NotFound) => println!("no such message"),
//!     Err(MailError::Cancelled) => println!("cancelled"),
//!     Err(e) => eprintln!("error: {}", e),
//! }
//! # }
//! ```

#![warn(missing_docs)]

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod mocks;
pub mod resilience;
pub mod services;
pub mod types;
pub mod webhooks;

pub use client::MailClient;
pub use config::{
    BackoffStrategy, CategoryLimit, CustomerLimits, IdempotencyPolicy, MailConfig,
    MailConfigBuilder, RateLimitConfig, RetryPolicy,
};
pub use error::{ErrorKind, MailError, MailResult};
pub use resilience::{EndpointCategory, RateLimitStatus};
pub use webhooks::{WebhookError, WebhookVerifier};

/// Default user agent.
pub const USER_AGENT: &str = concat!("integrations-mail/", env!("CARGO_PKG_VERSION"));

/// Create a client from a configuration.
pub fn create_client(config: MailConfig) -> MailResult<MailClient> {
    MailClient::new(config)
}

/// Create a client from `MAIL_*` environment variables.
pub fn create_client_from_env() -> MailResult<MailClient> {
    MailClient::from_env()
}
