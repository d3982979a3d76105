//! Connection lifecycle tests against an in-process stub server.

use std::{
    net::SocketAddr,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use axum::{
    Router,
    extract::{
        WebSocketUpgrade,
        ws::{Message as WsMessage, WebSocket},
    },
    routing::get,
};
use tokio::time::timeout;

use chatsync_core::{ChatConfig, ConnectionPhase, MessageStore, Notice, NoticeKind, Notifier};
use chatsync_transport::ConnectionManager;

#[derive(Default)]
struct CaptureNotifier(Mutex<Vec<Notice>>);

#[async_trait]
impl Notifier for CaptureNotifier {
    async fn notify(&self, notice: Notice) {
        self.0.lock().unwrap().push(notice);
    }
}

impl CaptureNotifier {
    fn notices(&self) -> Vec<Notice> {
        self.0.lock().unwrap().clone()
    }
}

async fn serve(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn config_for(addr: SocketAddr) -> ChatConfig {
    let mut config = ChatConfig::new(format!("http://{addr}"), "alice");
    config.reconnect_delay = Duration::from_millis(20);
    config
}

async fn wait_for_store_len(store: &MessageStore, len: usize) {
    timeout(Duration::from_secs(5), async {
        while store.len() != len {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("store never reached the expected length");
}

#[tokio::test]
async fn pushed_message_reaches_the_store() {
    let app = Router::new().route(
        "/ws",
        get(|ws: WebSocketUpgrade| async move {
            ws.on_upgrade(|mut socket: WebSocket| async move {
                socket
                    .send(WsMessage::Text(
                        r#"{"id":1,"content":"hi","username":"alice"}"#.into(),
                    ))
                    .await
                    .unwrap();
                std::future::pending::<()>().await;
            })
        }),
    );
    let addr = serve(app).await;

    let store = Arc::new(MessageStore::new());
    let handle = ConnectionManager::spawn(
        &config_for(addr),
        Arc::clone(&store),
        Arc::new(CaptureNotifier::default()),
    );

    wait_for_store_len(&store, 1).await;
    let list = store.list();
    assert_eq!(list[0].id, 1);
    assert_eq!(list[0].content, "hi");
    assert_eq!(list[0].author, "alice");

    handle.shutdown().await;
}

#[tokio::test]
async fn malformed_frame_is_dropped_without_losing_the_connection() {
    let app = Router::new().route(
        "/ws",
        get(|ws: WebSocketUpgrade| async move {
            ws.on_upgrade(|mut socket: WebSocket| async move {
                // Missing username and content: must be dropped.
                socket
                    .send(WsMessage::Text(r#"{"id":7}"#.into()))
                    .await
                    .unwrap();
                // Sent on the same connection, so receipt proves the bad
                // frame did not tear it down.
                socket
                    .send(WsMessage::Text(
                        r#"{"id":8,"content":"still here","username":"bob"}"#.into(),
                    ))
                    .await
                    .unwrap();
                std::future::pending::<()>().await;
            })
        }),
    );
    let addr = serve(app).await;

    let store = Arc::new(MessageStore::new());
    let handle = ConnectionManager::spawn(
        &config_for(addr),
        Arc::clone(&store),
        Arc::new(CaptureNotifier::default()),
    );

    wait_for_store_len(&store, 1).await;
    assert!(store.get(7).is_none());
    assert_eq!(store.get(8).unwrap().content, "still here");

    handle.shutdown().await;
}

#[tokio::test]
async fn reconnect_attempts_are_bounded_and_terminal() {
    // Grab a free port and release it so every connect attempt is refused.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let mut config = config_for(addr);
    config.max_reconnect_attempts = 2;

    let store = Arc::new(MessageStore::new());
    let notifier = Arc::new(CaptureNotifier::default());
    let notifier_dyn: Arc<dyn Notifier> = notifier.clone();
    let handle = ConnectionManager::spawn(&config, Arc::clone(&store), notifier_dyn);

    let mut state = handle.state();
    {
        let terminal = timeout(Duration::from_secs(5), state.wait_for(|s| s.is_terminal()))
            .await
            .expect("channel never reached the terminal phase")
            .unwrap();
        assert_eq!(terminal.phase, ConnectionPhase::Failed);
        assert_eq!(terminal.reconnect_attempts, 2);
    }

    let notices = notifier.notices();
    assert!(
        notices
            .iter()
            .any(|n| n.kind == NoticeKind::Actionable && n.text.contains("Failed to reconnect"))
    );

    // The driver task has already exited; shutdown just reaps it.
    handle.shutdown().await;
}

#[tokio::test]
async fn attempts_reset_after_a_successful_reopen() {
    let opens = Arc::new(AtomicUsize::new(0));
    let app = Router::new().route(
        "/ws",
        get({
            let opens = Arc::clone(&opens);
            move |ws: WebSocketUpgrade| {
                let opens = Arc::clone(&opens);
                async move {
                    let first = opens.fetch_add(1, Ordering::SeqCst) == 0;
                    ws.on_upgrade(move |mut socket: WebSocket| async move {
                        if first {
                            drop(socket);
                        } else {
                            socket
                                .send(WsMessage::Text(
                                    r#"{"id":3,"content":"back","username":"alice"}"#.into(),
                                ))
                                .await
                                .unwrap();
                            std::future::pending::<()>().await;
                        }
                    })
                }
            }
        }),
    );
    let addr = serve(app).await;

    let store = Arc::new(MessageStore::new());
    let handle = ConnectionManager::spawn(
        &config_for(addr),
        Arc::clone(&store),
        Arc::new(CaptureNotifier::default()),
    );

    wait_for_store_len(&store, 1).await;

    let state = *handle.state().borrow();
    assert_eq!(state.phase, ConnectionPhase::Connected);
    assert_eq!(state.reconnect_attempts, 0);
    assert_eq!(opens.load(Ordering::SeqCst), 2);

    handle.shutdown().await;
}
