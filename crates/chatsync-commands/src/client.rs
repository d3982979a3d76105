//! Control-plane command client.
//!
//! Pessimistic by construction: the store is only touched after the server
//! confirms, so a failed command has nothing to roll back. Commands are never
//! retried automatically; retry is the user repeating the action.

use std::{future::Future, sync::Arc};

use bytes::Bytes;
use reqwest::multipart;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::watch;

use chatsync_core::{
    ChatConfig, ConfirmPrompt, Draft, Message, MessageId, MessageStore, Notice, Notifier,
};
use chatsync_transport::decode_frame;

use crate::validate::{AttachmentValidator, RejectReason, Verdict};

/// Draft problems detected before any network call is made.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Message cannot be empty")]
    EmptyDraft,
    #[error("Unsupported file type")]
    UnsupportedType,
    #[error("File too large")]
    TooLarge,
}

/// Command failure.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("server rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("no message with id {0}")]
    NotFound(u64),
    #[error("client closed before the result could be applied")]
    Cancelled,
}

/// What an edit command did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOutcome {
    /// Server confirmed and the store was updated.
    Applied,
    /// Empty or identical replacement: nothing sent, nothing changed.
    Unchanged,
}

/// What a delete command did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    /// The confirmation capability said no; no request was issued.
    Declined,
}

#[derive(Serialize)]
struct EditBody<'a> {
    new_content: &'a str,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// Issues create/edit/delete commands and reconciles confirmed results into
/// the [`MessageStore`]. Holds no per-command state between calls.
pub struct CommandClient {
    http: reqwest::Client,
    base_url: String,
    store: Arc<MessageStore>,
    validator: AttachmentValidator,
    confirm: Arc<dyn ConfirmPrompt>,
    notifier: Arc<dyn Notifier>,
    shutdown: watch::Sender<bool>,
}

impl CommandClient {
    /// Create a client bound to the configured control plane.
    #[must_use]
    pub fn new(
        config: &ChatConfig,
        store: Arc<MessageStore>,
        confirm: Arc<dyn ConfirmPrompt>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            http: reqwest::Client::new(),
            base_url: config.server_url.clone(),
            store,
            validator: AttachmentValidator::new(),
            confirm,
            notifier,
            shutdown,
        }
    }

    /// Tear the client down.
    ///
    /// Every in-flight request observes the flag: a response that arrives
    /// after this point is never committed to the store.
    pub fn close(&self) {
        let _ = self.shutdown.send(true);
    }

    fn is_closed(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Send a draft as a new message.
    ///
    /// The caller keeps the draft: on failure it stays intact for a
    /// user-initiated retry, on success it can be discarded. The created
    /// message normally reaches the store through the push path; a response
    /// body that already carries the full message is committed directly.
    ///
    /// # Errors
    /// `Validation` before any network call, `Network`/`Rejected` after.
    pub async fn send(&self, draft: &Draft) -> Result<(), CommandError> {
        if let Err(validation) = self.validate(draft) {
            self.notifier
                .notify(Notice::transient(validation.to_string()))
                .await;
            return Err(validation.into());
        }

        let mut form = multipart::Form::new().text("content", draft.content.clone());
        if let Some(attachment) = &draft.attachment {
            let part = multipart::Part::bytes(attachment.data.clone())
                .file_name(attachment.file_name.clone())
                .mime_str(&attachment.mime_type)?;
            form = form.part("attachment", part);
        }

        let request = self
            .http
            .post(format!("{}/api/messages", self.base_url))
            .multipart(form);

        match self.execute(request).await {
            Ok(response) => {
                let body = response.bytes().await.unwrap_or_default();
                // The server may answer with just an ack, in which case the
                // broadcast on the push channel delivers the message.
                if let Ok(text) = std::str::from_utf8(&body) {
                    if let Ok(envelope) = decode_frame(text) {
                        if self.is_closed() {
                            return Err(CommandError::Cancelled);
                        }
                        self.store.upsert(envelope.into_message());
                    }
                }
                Ok(())
            }
            Err(err) => Err(self.surface("Failed to send message", err).await),
        }
    }

    /// Replace the content of an existing message.
    ///
    /// Empty or identical replacements are a local no-op. Nothing is applied
    /// speculatively, so a failure leaves the displayed content untouched.
    ///
    /// # Errors
    /// `NotFound` when the id is not in the store (no request is issued),
    /// `Network`/`Rejected` on command failure.
    pub async fn edit(
        &self,
        id: MessageId,
        new_content: &str,
    ) -> Result<EditOutcome, CommandError> {
        let new_content = new_content.trim();
        if new_content.is_empty() {
            return Ok(EditOutcome::Unchanged);
        }
        let Some(current) = self.store.get(id) else {
            return Err(CommandError::NotFound(id));
        };
        if current.content == new_content {
            return Ok(EditOutcome::Unchanged);
        }

        let request = self
            .http
            .put(format!("{}/api/messages/{id}", self.base_url))
            .json(&EditBody { new_content });

        match self.execute(request).await {
            Ok(_response) => {
                if self.is_closed() {
                    return Err(CommandError::Cancelled);
                }
                let updated = Message {
                    content: new_content.to_string(),
                    ..current
                };
                self.store.upsert(updated);
                self.notifier
                    .notify(Notice::transient("Message updated"))
                    .await;
                Ok(EditOutcome::Applied)
            }
            Err(err) => Err(self.surface("Failed to update message", err).await),
        }
    }

    /// Delete a message, after the confirmation capability approves.
    ///
    /// # Errors
    /// `Network`/`Rejected` on command failure; the message stays put.
    pub async fn delete(&self, id: MessageId) -> Result<DeleteOutcome, CommandError> {
        if !self
            .confirm
            .confirm("Are you sure you want to delete this message?")
            .await
        {
            return Ok(DeleteOutcome::Declined);
        }

        let request = self
            .http
            .delete(format!("{}/api/messages/{id}", self.base_url));

        match self.execute(request).await {
            Ok(_response) => {
                if self.is_closed() {
                    return Err(CommandError::Cancelled);
                }
                self.store.remove(id);
                self.notifier
                    .notify(Notice::transient("Message deleted"))
                    .await;
                Ok(DeleteOutcome::Deleted)
            }
            Err(err) => Err(self.surface("Failed to delete message", err).await),
        }
    }

    /// Fetch attachment content.
    ///
    /// # Errors
    /// `NotFound` on 404, `Network`/`Rejected` otherwise.
    pub async fn fetch_attachment(&self, attachment_id: u64) -> Result<Bytes, CommandError> {
        let request = self
            .http
            .get(format!("{}/attachments/{attachment_id}", self.base_url));

        let response = self.guarded(request.send()).await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(CommandError::NotFound(attachment_id));
        }
        let response = ensure_success(response).await?;
        Ok(response.bytes().await?)
    }

    fn validate(&self, draft: &Draft) -> Result<(), ValidationError> {
        if draft.is_empty() {
            return Err(ValidationError::EmptyDraft);
        }
        if let Some(attachment) = &draft.attachment {
            match self
                .validator
                .check(&attachment.mime_type, attachment.data.len() as u64)
            {
                Verdict::Accepted => {}
                Verdict::Rejected(RejectReason::UnsupportedType) => {
                    return Err(ValidationError::UnsupportedType);
                }
                Verdict::Rejected(RejectReason::TooLarge) => {
                    return Err(ValidationError::TooLarge);
                }
            }
        }
        Ok(())
    }

    async fn execute(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, CommandError> {
        let response = self.guarded(request.send()).await?;
        ensure_success(response).await
    }

    /// Run a request under the teardown flag. A response racing with
    /// `close()` is discarded rather than committed.
    async fn guarded<F>(&self, request: F) -> Result<reqwest::Response, CommandError>
    where
        F: Future<Output = Result<reqwest::Response, reqwest::Error>>,
    {
        if self.is_closed() {
            return Err(CommandError::Cancelled);
        }
        let mut closed = self.shutdown.subscribe();
        tokio::select! {
            result = request => {
                if self.is_closed() {
                    return Err(CommandError::Cancelled);
                }
                Ok(result?)
            }
            _ = closed.wait_for(|closed| *closed) => Err(CommandError::Cancelled),
        }
    }

    /// Record a failure notice and hand the error back to the caller.
    async fn surface(&self, fallback: &str, err: CommandError) -> CommandError {
        if matches!(err, CommandError::Cancelled) {
            return err;
        }
        let text = match &err {
            CommandError::Rejected { message, .. } if !message.is_empty() => message.clone(),
            _ => fallback.to_string(),
        };
        tracing::warn!("command failed: {err}");
        self.notifier.notify(Notice::transient(text)).await;
        err
    }
}

async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, CommandError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.bytes().await.unwrap_or_default();
    let message = serde_json::from_slice::<ErrorBody>(&body)
        .ok()
        .and_then(|b| b.message)
        .unwrap_or_default();
    Err(CommandError::Rejected {
        status: status.as_u16(),
        message,
    })
}
