//! Wire protocol for inbound push-channel frames.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;
use thiserror::Error;

use chatsync_core::{Attachment, Message};

/// Timestamp layout the server uses in broadcast frames.
const SERVER_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Frame decode error.
///
/// Diagnostic only: a bad frame is dropped and logged, never escalated to
/// connection teardown.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("empty required field: {0}")]
    EmptyField(&'static str),
}

/// Inbound broadcast frame as the server encodes it.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope {
    pub id: u64,
    pub content: String,
    pub username: String,
    #[serde(default)]
    pub timestamp: Option<String>,
    /// Redundant with `attachment` being present; the object is authoritative.
    #[serde(default)]
    pub has_attachment: Option<bool>,
    #[serde(default)]
    pub attachment: Option<AttachmentFrame>,
}

/// Attachment metadata as it appears on the wire.
#[derive(Debug, Clone, Deserialize)]
pub struct AttachmentFrame {
    pub id: u64,
    pub file_name: String,
    pub mime_type: String,
    pub file_size: u64,
}

/// Decode a single text frame.
///
/// # Errors
/// Returns an error when the frame is not valid JSON or when `id`, `content`
/// or `username` is missing or empty.
pub fn decode_frame(text: &str) -> Result<Envelope, ProtocolError> {
    let envelope: Envelope = serde_json::from_str(text)?;
    if envelope.content.is_empty() {
        return Err(ProtocolError::EmptyField("content"));
    }
    if envelope.username.is_empty() {
        return Err(ProtocolError::EmptyField("username"));
    }
    Ok(envelope)
}

impl Envelope {
    /// Convert to the core model: `username` maps to `author`; an absent or
    /// unparseable timestamp falls back to the time of receipt.
    #[must_use]
    pub fn into_message(self) -> Message {
        let created_at = self
            .timestamp
            .as_deref()
            .and_then(parse_server_timestamp)
            .unwrap_or_else(Utc::now);

        Message {
            id: self.id,
            content: self.content,
            author: self.username,
            created_at,
            attachment: self.attachment.map(|a| Attachment {
                id: a.id,
                file_name: a.file_name,
                mime_type: a.mime_type,
                file_size: a.file_size,
            }),
        }
    }
}

fn parse_server_timestamp(ts: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(ts, SERVER_TIME_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_username_to_author() {
        let envelope =
            decode_frame(r#"{"id":1,"content":"hi","username":"alice"}"#).unwrap();
        let message = envelope.into_message();
        assert_eq!(message.id, 1);
        assert_eq!(message.content, "hi");
        assert_eq!(message.author, "alice");
        assert!(message.attachment.is_none());
    }

    #[test]
    fn rejects_missing_and_empty_required_fields() {
        assert!(decode_frame(r#"{"id":1,"content":"hi"}"#).is_err());
        assert!(decode_frame(r#"{"id":1,"content":"","username":"alice"}"#).is_err());
        assert!(decode_frame("not json").is_err());
    }

    #[test]
    fn parses_server_timestamp() {
        let envelope = decode_frame(
            r#"{"id":1,"content":"hi","username":"alice","timestamp":"2024-05-01 09:30:00"}"#,
        )
        .unwrap();
        let message = envelope.into_message();
        assert_eq!(message.created_at.to_rfc3339(), "2024-05-01T09:30:00+00:00");
    }

    #[test]
    fn carries_attachment_metadata() {
        let envelope = decode_frame(
            r#"{"id":2,"content":"photo","username":"bob","has_attachment":true,
                "attachment":{"id":7,"file_name":"cat.png","mime_type":"image/png","file_size":1024}}"#,
        )
        .unwrap();
        let message = envelope.into_message();
        let attachment = message.attachment.unwrap();
        assert_eq!(attachment.id, 7);
        assert_eq!(attachment.file_name, "cat.png");
        assert_eq!(attachment.mime_type, "image/png");
        assert_eq!(attachment.file_size, 1024);
    }
}
