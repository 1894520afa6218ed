//! Service wrappers, one method per API endpoint.
//!
//! - **messages**: send, batch send, fetch and list messages
//! - **statistics**: bounce, delivery and open statistics
//!
//! Every method hands its request to [`MailHttpClient`](crate::http::MailHttpClient),
//! which applies rate limiting, idempotency and retries.

pub mod messages;
pub mod statistics;

pub use messages::MessagesService;
pub use statistics::StatisticsService;

use crate::error::{MailError, MailResult};

/// Reject ids that would change the shape of a request path.
pub(crate) fn path_segment<'a>(name: &str, value: &'a str) -> MailResult<&'a str> {
    if value.is_empty() || value.contains(['/', '?', '#']) {
        return Err(MailError::InvalidRequest {
            message: format!("invalid {}: {:?}", name, value),
        });
    }
    Ok(value)
}
