//! Core state and contracts for the chat synchronization client.
//!
//! This crate provides the building blocks the transport and command layers
//! share:
//! - `Message`/`Draft` - the data model
//! - `MessageStore` - ordered, id-indexed authoritative local state
//! - `Renderer`/`Notifier`/`ConfirmPrompt` - contracts the hosting UI implements
//! - `ConnectionState` - push-channel lifecycle state
//! - `ChatConfig` - construction-time configuration

pub mod config;
pub mod message;
pub mod notify;
pub mod render;
pub mod state;
pub mod store;

pub use config::ChatConfig;
pub use message::{Attachment, Draft, DraftAttachment, Message, MessageId};
pub use notify::{AutoConfirm, ConfirmPrompt, Notice, NoticeKind, Notifier, NullNotifier};
pub use render::{Renderer, spawn_renderer};
pub use state::{ConnectionPhase, ConnectionState};
pub use store::{MessageStore, StoreEvent};
