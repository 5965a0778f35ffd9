//! WebSocket-based live reload.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// WebSocket endpoint browsers connect to.
pub const LIVERELOAD_PATH: &str = "/__livereload";

/// Path the client script is served from.
pub const LIVERELOAD_SCRIPT_PATH: &str = "/__livereload.js";

/// Messages sent to connected browsers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReloadMessage {
    /// Full page reload
    Reload,

    /// Connection established
    Connected,
}

/// Hub for broadcasting reload messages to all connected clients.
#[derive(Debug, Clone)]
pub struct ReloadHub {
    sender: broadcast::Sender<ReloadMessage>,
}

impl ReloadHub {
    /// Create a new reload hub.
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(100);
        Self { sender }
    }

    /// Send a message to all connected clients.
    pub fn send(&self, msg: ReloadMessage) {
        // No receivers just means no browser is connected.
        let _ = self.sender.send(msg);
    }

    /// Tell every client to reload.
    pub fn reload(&self) {
        tracing::debug!("Reloading {} client(s)", self.subscriber_count());
        self.send(ReloadMessage::Reload);
    }

    /// Subscribe to reload messages.
    pub fn subscribe(&self) -> broadcast::Receiver<ReloadMessage> {
        self.sender.subscribe()
    }

    /// Get the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for ReloadHub {
    fn default() -> Self {
        Self::new()
    }
}

/// Client-side live reload script.
///
/// Connects back to the serving host, so the same script works for every
/// server and port.
pub fn client_script() -> &'static str {
    CLIENT_SCRIPT
}

/// Insert the client script tag before `</body>`, or append it.
pub fn inject_client(html: &str) -> String {
    let tag = format!(r#"<script src="{LIVERELOAD_SCRIPT_PATH}"></script>"#);

    match html.rfind("</body>") {
        Some(pos) => {
            let mut out = String::with_capacity(html.len() + tag.len());
            out.push_str(&html[..pos]);
            out.push_str(&tag);
            out.push_str(&html[pos..]);
            out
        }
        None => format!("{html}{tag}"),
    }
}

const CLIENT_SCRIPT: &str = r#"
(function() {
  'use strict';

  var protocol = location.protocol === 'https:' ? 'wss://' : 'ws://';
  var url = protocol + location.host + '/__livereload';
  var reconnectAttempts = 0;
  var maxReconnectAttempts = 10;

  function connect() {
    var ws = new WebSocket(url);

    ws.onopen = function() {
      console.log('[livereload] Connected');
      reconnectAttempts = 0;
    };

    ws.onmessage = function(event) {
      var msg = JSON.parse(event.data);
      if (msg.type === 'reload') {
        location.reload();
      }
    };

    ws.onclose = function() {
      if (reconnectAttempts < maxReconnectAttempts) {
        reconnectAttempts++;
        setTimeout(connect, 1000 * reconnectAttempts);
      }
    };
  }

  connect();
})();
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hub_broadcasts_messages() {
        let hub = ReloadHub::new();
        let mut rx = hub.subscribe();

        hub.reload();

        match rx.try_recv() {
            Ok(ReloadMessage::Reload) => {}
            other => panic!("Expected Reload message, got {other:?}"),
        }
    }

    #[test]
    fn send_without_subscribers_is_harmless() {
        let hub = ReloadHub::new();
        hub.reload();
        assert_eq!(hub.subscriber_count(), 0);
    }

    #[test]
    fn serializes_messages() {
        let json = serde_json::to_string(&ReloadMessage::Reload).unwrap();
        assert_eq!(json, r#"{"type":"reload"}"#);
    }

    #[test]
    fn injects_before_closing_body() {
        let html = "<html><body><p>hi</p></body></html>";
        let out = inject_client(html);

        assert_eq!(
            out,
            r#"<html><body><p>hi</p><script src="/__livereload.js"></script></body></html>"#
        );
    }

    #[test]
    fn appends_when_body_is_missing() {
        let out = inject_client("<p>fragment</p>");
        assert!(out.ends_with(r#"<script src="/__livereload.js"></script>"#));
    }
}
