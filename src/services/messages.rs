//! Message operations.

use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::MailResult;
use crate::http::{MailHttpClient, MailRequest};
use crate::resilience::KeyBuilder;
use crate::types::{ListMessagesQuery, Message, MessageList, SendMessageRequest, SendMessageResponse};

use super::path_segment;

/// Service for sending and inspecting messages.
///
/// # Examples
///
/// ```rust,no_run
/// use integrations_mail::types::SendMessageRequest;
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = integrations_mail::create_client_from_env()?;
///
/// let message = SendMessageRequest::new("noreply@example.com", "Welcome")
///     .to("user@example.com")
///     .text("Hello!");
///
/// let sent = client.messages().send(&message, &CancellationToken::new()).await?;
/// println!("Message ID: {}", sent.id);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct MessagesService {
    http: Arc<MailHttpClient>,
}

impl MessagesService {
    /// Create a new message service.
    pub fn new(http: Arc<MailHttpClient>) -> Self {
        Self { http }
    }

    fn collection_path(&self) -> MailResult<String> {
        let account = path_segment("account id", &self.http.config().account_id)?;
        Ok(format!("/v2/accounts/{}/messages", account))
    }

    /// Send one message.
    ///
    /// The request's own idempotency key is used if set; otherwise one is
    /// generated according to the client's idempotency policy.
    ///
    /// # Errors
    ///
    /// Returns `MailError::InvalidRequest` without contacting the API if the
    /// sender or recipients are missing or malformed.
    pub async fn send(
        &self,
        message: &SendMessageRequest,
        cancel: &CancellationToken,
    ) -> MailResult<SendMessageResponse> {
        message.validate()?;

        let mut request = MailRequest::post(self.collection_path()?).json(message)?;
        if let Some(key) = message.idempotency_key.as_deref() {
            request = request.idempotency_key(key)?;
        }

        self.http.execute_json(request, cancel).await
    }

    /// Send related messages, each keyed from `batch_key`.
    ///
    /// The first message is sent with `batch_key` itself and the rest with
    /// `<batch_key>-<suffix>`. Messages carrying their own key keep it.
    /// Sends happen in order and stop at the first failure.
    pub async fn send_batch(
        &self,
        messages: &[SendMessageRequest],
        batch_key: &str,
        cancel: &CancellationToken,
    ) -> MailResult<Vec<SendMessageResponse>> {
        for message in messages {
            message.validate()?;
        }

        let mut keys = KeyBuilder::new(batch_key);
        let mut responses = Vec::with_capacity(messages.len());

        for message in messages {
            let key = keys.next().unwrap_or_else(|| batch_key.to_string());
            let key = message.idempotency_key.clone().unwrap_or(key);

            let request = MailRequest::post(self.collection_path()?)
                .json(message)?
                .idempotency_key(&key)?;
            responses.push(self.http.execute_json(request, cancel).await?);
        }

        debug!(batch_key, sent = responses.len(), "Batch sent");
        Ok(responses)
    }

    /// Fetch one message by id.
    pub async fn get(&self, message_id: &str, cancel: &CancellationToken) -> MailResult<Message> {
        let id = path_segment("message id", message_id)?;
        let request = MailRequest::get(format!("{}/{}", self.collection_path()?, id));
        self.http.execute_json(request, cancel).await
    }

    /// List messages.
    pub async fn list(
        &self,
        query: &ListMessagesQuery,
        cancel: &CancellationToken,
    ) -> MailResult<MessageList> {
        let request = MailRequest::get(self.collection_path()?)
            .query_opt("limit", query.limit)
            .query_opt("cursor", query.cursor.as_deref())
            .query_opt("status", query.status.map(|s| s.as_str()))
            .query_opt("since", query.since.map(|t| t.to_rfc3339()));

        self.http.execute_json(request, cancel).await
    }
}
