//! User-notice and confirmation contracts.

use async_trait::async_trait;

/// How long a notice stays on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    /// Auto-dismissing: command failures, reconnect progress, confirmations.
    Transient,
    /// Stays until acted on. Reserved for terminal reconnect failure.
    Actionable,
}

/// A user-facing notice. The core records these; presentation is the host's.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub text: String,
}

impl Notice {
    #[must_use]
    pub fn transient<S: Into<String>>(text: S) -> Self {
        Self {
            kind: NoticeKind::Transient,
            text: text.into(),
        }
    }

    #[must_use]
    pub fn actionable<S: Into<String>>(text: S) -> Self {
        Self {
            kind: NoticeKind::Actionable,
            text: text.into(),
        }
    }
}

/// Notice sink implemented by the hosting UI (toast area, status line, ...).
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notice: Notice);
}

/// Notifier that discards everything.
#[derive(Debug, Default, Clone)]
pub struct NullNotifier;

#[async_trait]
impl Notifier for NullNotifier {
    async fn notify(&self, _notice: Notice) {}
}

/// Asynchronous yes/no capability the delete flow depends on.
///
/// Modeled as a future-returning query rather than a blocking prompt so
/// deletion stays testable and never stalls the event loop.
#[async_trait]
pub trait ConfirmPrompt: Send + Sync {
    async fn confirm(&self, prompt: &str) -> bool;
}

/// Confirmation capability that approves every request.
#[derive(Debug, Default, Clone)]
pub struct AutoConfirm;

#[async_trait]
impl ConfirmPrompt for AutoConfirm {
    async fn confirm(&self, _prompt: &str) -> bool {
        true
    }
}
