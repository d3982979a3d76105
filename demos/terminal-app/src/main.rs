//! Line-oriented terminal chat client.
//!
//! Run with: cargo run -p terminal-app -- http://localhost:8989 alice
//!
//! Plain input sends a message; `/edit <id> <text>` edits, `/delete <id>`
//! deletes, `/quit` exits. This binary is the application entry point: it
//! constructs exactly one core instance and injects it where needed.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use chatsync_commands::{CommandClient, CommandError};
use chatsync_core::{
    AutoConfirm, ChatConfig, Draft, Message, MessageStore, Notice, NoticeKind, Notifier, Renderer,
    spawn_renderer,
};
use chatsync_transport::ConnectionManager;

/// Repaints the whole transcript after every commit. Repainting from the
/// authoritative snapshot keeps the output idempotent: the same state always
/// produces the same lines.
struct TerminalPainter {
    current_user: String,
}

#[async_trait]
impl Renderer for TerminalPainter {
    async fn render(&self, messages: &[Message]) {
        println!("-- {} message(s) --", messages.len());
        for message in messages {
            let marker = if message.author == self.current_user {
                '*'
            } else {
                ' '
            };
            let attachment = message
                .attachment
                .as_ref()
                .map(|a| format!(" [{} ({} bytes)]", a.file_name, a.file_size))
                .unwrap_or_default();
            println!(
                "{marker}[{}] {} {}: {}{attachment}",
                message.id,
                message.created_at.format("%H:%M"),
                message.author,
                message.content,
            );
        }
    }
}

struct TerminalNotices;

#[async_trait]
impl Notifier for TerminalNotices {
    async fn notify(&self, notice: Notice) {
        match notice.kind {
            NoticeKind::Transient => eprintln!("· {}", notice.text),
            NoticeKind::Actionable => eprintln!("!! {}", notice.text),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let server = args
        .next()
        .unwrap_or_else(|| "http://127.0.0.1:8989".to_string());
    let user = args.next().unwrap_or_else(|| "anonymous".to_string());

    let config = ChatConfig::new(server, user);
    tracing::info!(
        server = %config.server_url,
        user = %config.current_user,
        "starting terminal chat client"
    );

    let store = Arc::new(MessageStore::new());
    let notifier: Arc<dyn Notifier> = Arc::new(TerminalNotices);
    let renderer: Arc<dyn Renderer> = Arc::new(TerminalPainter {
        current_user: config.current_user.clone(),
    });

    let painter = spawn_renderer(Arc::clone(&store), renderer);
    let channel = ConnectionManager::spawn(&config, Arc::clone(&store), Arc::clone(&notifier));
    let commands = CommandClient::new(
        &config,
        Arc::clone(&store),
        Arc::new(AutoConfirm),
        Arc::clone(&notifier),
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "/quit" {
            break;
        }

        if let Some(rest) = line.strip_prefix("/edit ") {
            let Some((id, text)) = rest.split_once(' ') else {
                eprintln!("usage: /edit <id> <text>");
                continue;
            };
            match id.trim().parse() {
                Ok(id) => {
                    if let Err(CommandError::NotFound(id)) = commands.edit(id, text).await {
                        eprintln!("no message with id {id}");
                    }
                }
                Err(_) => eprintln!("usage: /edit <id> <text>"),
            }
        } else if let Some(rest) = line.strip_prefix("/delete ") {
            match rest.trim().parse() {
                Ok(id) => {
                    // Failures are already surfaced through the notifier.
                    let _ = commands.delete(id).await;
                }
                Err(_) => eprintln!("usage: /delete <id>"),
            }
        } else {
            let _ = commands.send(&Draft::text(line)).await;
        }
    }

    commands.close();
    channel.shutdown().await;
    painter.abort();
    Ok(())
}
