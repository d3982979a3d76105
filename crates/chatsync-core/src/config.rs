//! Construction-time configuration.
//!
//! The entry point builds one of these and injects it; nothing is read from
//! ambient state and the identity is never re-fetched.

use std::time::Duration;

/// Reconnect attempts before the channel enters its terminal failed phase.
pub const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 5;

/// Fixed delay between reconnect attempts.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_millis(3000);

/// Everything the client needs to construct its components.
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// Control-plane base URL, no trailing slash.
    pub server_url: String,
    /// Push-channel endpoint, derived from `server_url` unless overridden.
    pub push_url: String,
    /// Identity of the local user, supplied once by the hosting page.
    pub current_user: String,
    pub max_reconnect_attempts: u32,
    pub reconnect_delay: Duration,
}

impl ChatConfig {
    /// Build a config for a server base URL and a current-user identity.
    #[must_use]
    pub fn new<S: Into<String>, U: Into<String>>(server_url: S, current_user: U) -> Self {
        let server_url = server_url.into().trim_end_matches('/').to_string();
        let push_url = derive_push_url(&server_url);
        Self {
            server_url,
            push_url,
            current_user: current_user.into(),
            max_reconnect_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
        }
    }
}

/// Map an http(s) base URL to its `/ws` push endpoint.
fn derive_push_url(server_url: &str) -> String {
    let base = if let Some(rest) = server_url.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = server_url.strip_prefix("http://") {
        format!("ws://{rest}")
    } else if server_url.starts_with("ws://") || server_url.starts_with("wss://") {
        server_url.to_string()
    } else {
        format!("ws://{server_url}")
    };

    if base.ends_with("/ws") {
        base
    } else {
        format!("{}/ws", base.trim_end_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_push_url_from_http_base() {
        let cfg = ChatConfig::new("http://chat.example:8989", "alice");
        assert_eq!(cfg.push_url, "ws://chat.example:8989/ws");
        assert_eq!(cfg.server_url, "http://chat.example:8989");
    }

    #[test]
    fn derives_secure_push_url_and_strips_trailing_slash() {
        let cfg = ChatConfig::new("https://chat.example/", "alice");
        assert_eq!(cfg.push_url, "wss://chat.example/ws");
    }

    #[test]
    fn bare_host_defaults_to_plain_ws() {
        let cfg = ChatConfig::new("localhost:8989", "alice");
        assert_eq!(cfg.push_url, "ws://localhost:8989/ws");
    }

    #[test]
    fn defaults_match_the_reconnect_policy() {
        let cfg = ChatConfig::new("http://h", "u");
        assert_eq!(cfg.max_reconnect_attempts, 5);
        assert_eq!(cfg.reconnect_delay, Duration::from_millis(3000));
    }
}
