//! Chat message data model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Server-assigned message identifier. Never regenerated locally.
pub type MessageId = u64;

/// Attachment metadata. Immutable once set on a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// Server-assigned attachment identifier, used to fetch the content.
    pub id: u64,
    pub file_name: String,
    pub mime_type: String,
    pub file_size: u64,
}

/// A chat message as the server assigned it.
///
/// `content` is mutable only through a confirmed edit; every other field is
/// fixed at first receipt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub content: String,
    pub author: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment: Option<Attachment>,
}

/// Unsent compose state.
///
/// Lives only until the send succeeds or the user cancels; on command failure
/// the caller keeps the draft so a retry is a plain repeat. Never persisted.
#[derive(Debug, Clone, Default)]
pub struct Draft {
    pub content: String,
    pub attachment: Option<DraftAttachment>,
}

/// File selected for an unsent draft, held in memory until upload.
#[derive(Debug, Clone)]
pub struct DraftAttachment {
    pub file_name: String,
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl Draft {
    /// Create a text-only draft.
    #[must_use]
    pub fn text<S: Into<String>>(content: S) -> Self {
        Self {
            content: content.into(),
            attachment: None,
        }
    }

    /// True when there is nothing to send: blank content and no attachment.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.content.trim().is_empty() && self.attachment.is_none()
    }
}
