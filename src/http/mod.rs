//! HTTP layer for the mail API.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐
//! │  MailHttpClient  │  - Endpoint classification + rate limiting
//! │                  │  - Idempotency key injection
//! │                  │  - Error classification
//! └────────┬─────────┘
//!          │
//!          ▼
//! ┌──────────────────┐
//! │ RetryOrchestrator│  - Attempt loop, backoff, cancellation
//! └────────┬─────────┘
//!          │
//!          ▼
//! ┌──────────────────┐
//! │    Transport     │  - reqwest, or a mock in tests
//! └──────────────────┘
//! ```

mod client;
mod request;
mod response;
mod transport;

pub use client::MailHttpClient;
pub use request::{MailRequest, OutgoingRequest, IDEMPOTENCY_KEY_HEADER};
pub use response::MailResponse;
pub use transport::{ReqwestTransport, Transport};
