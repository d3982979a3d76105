//! Renderer contract and the driver that invokes it after commits.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::broadcast::error::RecvError;

use crate::message::Message;
use crate::store::MessageStore;

/// Painting contract implemented by the hosting UI.
///
/// Given the store snapshot, an implementation must be idempotent under
/// repeated calls with identical state: no duplicate visual nodes and no
/// duplicate per-message action bindings (dispatch edit/delete actions keyed
/// by role and message id rather than binding a listener per render). It is
/// expected to distinguish messages whose `author` matches the configured
/// current user, for alignment and action visibility.
#[async_trait]
pub trait Renderer: Send + Sync {
    async fn render(&self, messages: &[Message]);
}

/// Drive a renderer from store commits.
///
/// The renderer is invoked after every committed mutation and only after a
/// commit - never speculatively. A lagged subscriber just repaints from the
/// authoritative snapshot, which the idempotency contract makes safe.
pub fn spawn_renderer(
    store: Arc<MessageStore>,
    renderer: Arc<dyn Renderer>,
) -> tokio::task::JoinHandle<()> {
    let mut events = store.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(_) => renderer.render(&store.list()).await,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!("renderer lagged {skipped} commits, repainting");
                    renderer.render(&store.list()).await;
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}
