//! Message types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{MailError, MailResult};

/// An email address with optional display name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EmailAddress {
    /// Address (e.g., "user@example.com").
    pub email: String,
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl EmailAddress {
    /// Create an address without a display name.
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            name: None,
        }
    }

    /// Create an address with a display name.
    pub fn with_name(email: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            name: Some(name.into()),
        }
    }

    /// Loose syntactic check: something on both sides of one `@`.
    pub fn is_plausible(&self) -> bool {
        match self.email.split_once('@') {
            Some((local, domain)) => !local.is_empty() && !domain.is_empty() && !domain.contains('@'),
            None => false,
        }
    }
}

impl From<&str> for EmailAddress {
    fn from(email: &str) -> Self {
        Self::new(email)
    }
}

impl From<String> for EmailAddress {
    fn from(email: String) -> Self {
        Self::new(email)
    }
}

/// Body of a send request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SendMessageRequest {
    /// Sender.
    pub from: EmailAddress,
    /// Primary recipients.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub to: Vec<EmailAddress>,
    /// Carbon-copy recipients.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cc: Vec<EmailAddress>,
    /// Blind carbon-copy recipients.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bcc: Vec<EmailAddress>,
    /// Subject line.
    pub subject: String,
    /// Plain text body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// HTML body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
    /// Tags for reporting.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Explicit idempotency key; sent as a header, not in the body.
    #[serde(skip)]
    pub idempotency_key: Option<String>,
}

impl SendMessageRequest {
    /// Start a message from `from` with `subject`.
    pub fn new(from: impl Into<EmailAddress>, subject: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: Vec::new(),
            cc: Vec::new(),
            bcc: Vec::new(),
            subject: subject.into(),
            text: None,
            html: None,
            tags: Vec::new(),
            idempotency_key: None,
        }
    }

    /// Add a "To" recipient.
    pub fn to(mut self, address: impl Into<EmailAddress>) -> Self {
        self.to.push(address.into());
        self
    }

    /// Add a "CC" recipient.
    pub fn cc(mut self, address: impl Into<EmailAddress>) -> Self {
        self.cc.push(address.into());
        self
    }

    /// Add a "BCC" recipient.
    pub fn bcc(mut self, address: impl Into<EmailAddress>) -> Self {
        self.bcc.push(address.into());
        self
    }

    /// Set the plain text body.
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Set the HTML body.
    pub fn html(mut self, html: impl Into<String>) -> Self {
        self.html = Some(html.into());
        self
    }

    /// Add a tag.
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Use this idempotency key instead of a generated one.
    pub fn idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }

    /// Check the request before sending.
    ///
    /// Requires a plausible sender and at least one recipient, every
    /// recipient plausible.
    pub fn validate(&self) -> MailResult<()> {
        if !self.from.is_plausible() {
            return Err(MailError::InvalidRequest {
                message: format!("invalid sender address: {:?}", self.from.email),
            });
        }

        let recipients = self.to.iter().chain(&self.cc).chain(&self.bcc);
        let mut count = 0;
        for address in recipients {
            if !address.is_plausible() {
                return Err(MailError::InvalidRequest {
                    message: format!("invalid recipient address: {:?}", address.email),
                });
            }
            count += 1;
        }

        if count == 0 {
            return Err(MailError::InvalidRequest {
                message: "message has no recipients".to_string(),
            });
        }
        Ok(())
    }
}

/// Delivery state of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageStatus {
    /// Accepted, not yet handed off.
    Queued,
    /// Handed to the receiving server.
    Sent,
    /// Receiving server accepted it.
    Delivered,
    /// Bounced.
    Bounced,
    /// Permanently failed.
    Failed,
    /// A status this client does not know.
    #[serde(other)]
    Unknown,
}

impl MessageStatus {
    /// Wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            MessageStatus::Queued => "queued",
            MessageStatus::Sent => "sent",
            MessageStatus::Delivered => "delivered",
            MessageStatus::Bounced => "bounced",
            MessageStatus::Failed => "failed",
            MessageStatus::Unknown => "unknown",
        }
    }
}

/// Response to a send.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SendMessageResponse {
    /// Server-assigned message id.
    pub id: String,
    /// Initial status.
    pub status: MessageStatus,
    /// When the server accepted the message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accepted_at: Option<DateTime<Utc>>,
}

/// A stored message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Message id.
    pub id: String,
    /// Sender.
    pub from: EmailAddress,
    /// Primary recipients.
    #[serde(default)]
    pub to: Vec<EmailAddress>,
    /// Subject line.
    pub subject: String,
    /// Current status.
    pub status: MessageStatus,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Delivery time, once delivered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivered_at: Option<DateTime<Utc>>,
    /// Tags.
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Filters for listing messages.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListMessagesQuery {
    /// Page size.
    pub limit: Option<u32>,
    /// Cursor from a previous page.
    pub cursor: Option<String>,
    /// Only messages in this status.
    pub status: Option<MessageStatus>,
    /// Only messages created at or after this time.
    pub since: Option<DateTime<Utc>>,
}

impl ListMessagesQuery {
    /// Set the page size.
    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Continue from a cursor.
    pub fn cursor(mut self, cursor: impl Into<String>) -> Self {
        self.cursor = Some(cursor.into());
        self
    }

    /// Filter by status.
    pub fn status(mut self, status: MessageStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Filter by creation time.
    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }
}

/// One page of messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageList {
    /// Messages on this page.
    pub data: Vec<Message>,
    /// Cursor for the next page, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}
