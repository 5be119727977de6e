//! In-process debugging endpoint.
//!
//! Accepts one WebSocket client on `127.0.0.1` and answers every command
//! with the messages a handler returns for it, so the real [`Connection`]
//! and CDP browser can be driven without a browser.
//!
//! [`Connection`]: super::Connection

use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

// ============================================================================
// LoopbackServer
// ============================================================================

pub(crate) struct LoopbackServer {
    addr: SocketAddr,
    received: Arc<Mutex<Vec<Value>>>,
}

impl LoopbackServer {
    /// Binds an ephemeral port and serves the first client that connects.
    ///
    /// Every command is recorded before its replies are sent.
    pub(crate) async fn start<F>(mut handler: F) -> Self
    where
        F: FnMut(&Value) -> Vec<String> + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        let received = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&received);

        tokio::spawn(async move {
            let Ok((stream, _)) = listener.accept().await else {
                return;
            };
            let Ok(mut ws) = accept_async(stream).await else {
                return;
            };

            while let Some(Ok(message)) = ws.next().await {
                let Message::Text(text) = message else {
                    continue;
                };
                let Ok(request) = serde_json::from_str::<Value>(&text) else {
                    continue;
                };
                log.lock().push(request.clone());

                for out in handler(&request) {
                    if ws.send(Message::Text(out.into())).await.is_err() {
                        return;
                    }
                }
            }
        });

        Self { addr, received }
    }

    pub(crate) fn ws_url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    /// Methods of every command received so far, in order.
    pub(crate) fn methods(&self) -> Vec<String> {
        self.received
            .lock()
            .iter()
            .filter_map(|request| request["method"].as_str().map(str::to_string))
            .collect()
    }

    /// Every command received so far.
    pub(crate) fn received(&self) -> Vec<Value> {
        self.received.lock().clone()
    }
}

// ============================================================================
// Message Builders
// ============================================================================

/// Successful response to `request`.
pub(crate) fn reply(request: &Value, result: Value) -> String {
    json!({"id": request["id"], "result": result}).to_string()
}

/// Error response to `request`.
pub(crate) fn reply_error(request: &Value, code: i64, message: &str) -> String {
    json!({"id": request["id"], "error": {"code": code, "message": message}}).to_string()
}

/// Event addressed to a flattened session.
pub(crate) fn event(session_id: &str, method: &str, params: Value) -> String {
    json!({"method": method, "sessionId": session_id, "params": params}).to_string()
}
