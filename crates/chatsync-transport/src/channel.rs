//! Push-channel ownership and bounded reconnect policy.

use std::{sync::Arc, time::Duration};

use futures::{FutureExt, StreamExt, future::Fuse};
use tokio::{
    net::TcpStream,
    sync::{oneshot, watch},
};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite};

use chatsync_core::{
    ChatConfig, ConnectionPhase, ConnectionState, MessageStore, Notice, Notifier,
};

use crate::protocol;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(PartialEq, Eq)]
enum ReadOutcome {
    Closed,
    Shutdown,
}

/// Owns the single push-channel connection and drives the connection state
/// machine. Valid envelopes are forwarded to the [`MessageStore`]; malformed
/// ones are dropped with a diagnostic.
///
/// The whole lifecycle runs in one driver task, which also owns the only
/// reconnect timer - at most one reconnect sleep is pending at any time, no
/// matter how many close notifications the socket produces.
pub struct ConnectionManager {
    url: String,
    max_reconnect_attempts: u32,
    reconnect_delay: Duration,
    store: Arc<MessageStore>,
    notifier: Arc<dyn Notifier>,
    state_tx: watch::Sender<ConnectionState>,
}

/// Handle to a spawned channel.
///
/// Dropping the handle (or calling [`shutdown`](Self::shutdown)) stops the
/// driver task at its next suspension point without entering the terminal
/// failed phase.
pub struct ChannelHandle {
    state_rx: watch::Receiver<ConnectionState>,
    shutdown_tx: oneshot::Sender<()>,
    task: tokio::task::JoinHandle<()>,
}

impl ChannelHandle {
    /// Observe connection state transitions.
    #[must_use]
    pub fn state(&self) -> watch::Receiver<ConnectionState> {
        self.state_rx.clone()
    }

    /// Stop the channel and wait for the driver task to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(());
        let _ = self.task.await;
    }
}

impl ConnectionManager {
    /// Spawn the channel driver.
    ///
    /// Automatic recovery ends once `max_reconnect_attempts` is exhausted;
    /// after the terminal failed phase a fresh spawn is the only way back,
    /// mirroring a full client restart.
    #[must_use]
    pub fn spawn(
        config: &ChatConfig,
        store: Arc<MessageStore>,
        notifier: Arc<dyn Notifier>,
    ) -> ChannelHandle {
        let (state_tx, state_rx) = watch::channel(ConnectionState::default());
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let manager = Self {
            url: config.push_url.clone(),
            max_reconnect_attempts: config.max_reconnect_attempts,
            reconnect_delay: config.reconnect_delay,
            store,
            notifier,
            state_tx,
        };

        let task = tokio::spawn(async move {
            manager.run(shutdown_rx).await;
        });

        ChannelHandle {
            state_rx,
            shutdown_tx,
            task,
        }
    }

    fn set_state(&self, phase: ConnectionPhase, reconnect_attempts: u32) {
        let _ = self.state_tx.send(ConnectionState {
            phase,
            reconnect_attempts,
        });
    }

    async fn run(self, shutdown_rx: oneshot::Receiver<()>) {
        let mut shutdown = shutdown_rx.fuse();
        let mut attempts: u32 = 0;

        loop {
            self.set_state(ConnectionPhase::Connecting, attempts);

            let connected = tokio::select! {
                result = connect_async(self.url.as_str()) => result,
                _ = &mut shutdown => break,
            };

            match connected {
                Ok((ws, _response)) => {
                    attempts = 0;
                    self.set_state(ConnectionPhase::Connected, 0);
                    tracing::info!(url = %self.url, "push channel connected");
                    self.notifier
                        .notify(Notice::transient("Connected to chat"))
                        .await;

                    let outcome = self.read_frames(ws, &mut shutdown).await;
                    self.set_state(ConnectionPhase::Disconnected, attempts);
                    if outcome == ReadOutcome::Shutdown {
                        break;
                    }
                }
                Err(e) => {
                    tracing::warn!("push channel connect failed: {e}");
                    self.set_state(ConnectionPhase::Disconnected, attempts);
                }
            }

            if attempts >= self.max_reconnect_attempts {
                self.set_state(ConnectionPhase::Failed, attempts);
                tracing::error!("push channel giving up after {attempts} reconnect attempts");
                self.notifier
                    .notify(Notice::actionable(
                        "Failed to reconnect. Please refresh the page.",
                    ))
                    .await;
                break;
            }

            attempts += 1;
            self.set_state(ConnectionPhase::Disconnected, attempts);
            self.notifier
                .notify(Notice::transient("Connection lost. Reconnecting..."))
                .await;

            tokio::select! {
                () = tokio::time::sleep(self.reconnect_delay) => {}
                _ = &mut shutdown => break,
            }
        }
    }

    async fn read_frames(
        &self,
        mut ws: WsStream,
        shutdown: &mut Fuse<oneshot::Receiver<()>>,
    ) -> ReadOutcome {
        loop {
            let frame = tokio::select! {
                frame = ws.next() => frame,
                _ = &mut *shutdown => return ReadOutcome::Shutdown,
            };

            match frame {
                Some(Ok(tungstenite::Message::Text(text))) => self.handle_frame(&text),
                Some(Ok(tungstenite::Message::Binary(data))) => {
                    match String::from_utf8(data) {
                        Ok(text) => self.handle_frame(&text),
                        Err(_) => continue,
                    }
                }
                Some(Ok(tungstenite::Message::Close(_))) | None => return ReadOutcome::Closed,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::error!("push channel error: {e}");
                    return ReadOutcome::Closed;
                }
            }
        }
    }

    fn handle_frame(&self, text: &str) {
        match protocol::decode_frame(text) {
            Ok(envelope) => self.store.upsert(envelope.into_message()),
            Err(e) => tracing::warn!("dropping malformed envelope: {e}"),
        }
    }
}
