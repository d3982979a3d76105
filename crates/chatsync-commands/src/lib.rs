//! Control-plane command client for the chat synchronization core.
//!
//! Provides:
//! - `AttachmentValidator` - type/size policy gate, checked before any network
//! - `CommandClient` - create/edit/delete commands, reconciled pessimistically

pub mod client;
pub mod validate;

pub use client::{CommandClient, CommandError, DeleteOutcome, EditOutcome, ValidationError};
pub use validate::{AttachmentValidator, MAX_ATTACHMENT_BYTES, RejectReason, Verdict};
