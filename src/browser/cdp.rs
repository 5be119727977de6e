//! CDP-backed browser sessions.
//!
//! Each session lives in its own browser context so pages captured in
//! parallel share no cookies or cache.
//!
//! # Session Lifecycle
//!
//! 1. `Target.createBrowserContext`
//! 2. `Target.createTarget` (`about:blank`) in that context
//! 3. `Target.attachToTarget` with `flatten: true` → session id
//! 4. `Network.enable`, `Page.enable`, `Page.navigate`,
//!    `Network.getResponseBody`
//! 5. `Target.closeTarget` + `Target.disposeBrowserContext`

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as Base64Standard;
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

use crate::config::ArchiverConfig;
use crate::error::{Error, Result};
use crate::identifiers::{BrowserContextId, CdpSessionId, LoaderId, NetworkRequestId, TargetId};
use crate::protocol::{Command, NetworkCommand, PageCommand, TargetCommand};
use crate::transport::{Connection, discover_ws_url};

use super::{BrowserSession, CaptureBrowser, Navigation, OpenedSession};

// ============================================================================
// Constants
// ============================================================================

/// Total body buffer retained by the browser per page.
const MAX_TOTAL_BUFFER_SIZE: u64 = 256 * 1024 * 1024;

/// Body buffer retained by the browser per resource.
pub(crate) const MAX_RESOURCE_BUFFER_SIZE: u64 = 64 * 1024 * 1024;

// ============================================================================
// Command Results
// ============================================================================

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateBrowserContextResult {
    browser_context_id: BrowserContextId,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateTargetResult {
    target_id: TargetId,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AttachToTargetResult {
    session_id: CdpSessionId,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct NavigateResult {
    #[serde(default)]
    loader_id: Option<LoaderId>,
    #[serde(default)]
    error_text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponseBodyResult {
    body: String,
    #[serde(default)]
    base64_encoded: bool,
}

// ============================================================================
// CdpBrowser
// ============================================================================

/// A remote browser reached over its debugging WebSocket.
#[derive(Clone)]
pub struct CdpBrowser {
    connection: Connection,
}

impl CdpBrowser {
    /// Discovers the configured endpoint and connects to it.
    ///
    /// # Errors
    ///
    /// - [`Error::Discovery`] if the endpoint cannot be discovered
    /// - [`Error::Connection`] if the WebSocket handshake fails
    pub async fn connect(config: &ArchiverConfig) -> Result<Self> {
        let ws_url = discover_ws_url(&config.browser_host, config.browser_port).await?;
        let connection = Connection::connect(&ws_url)
            .await?
            .with_command_timeout(config.command_timeout);

        Ok(Self::from_connection(connection))
    }

    /// Wraps an existing connection.
    #[must_use]
    pub fn from_connection(connection: Connection) -> Self {
        Self { connection }
    }

    /// Closes the WebSocket.
    pub fn shutdown(&self) {
        self.connection.shutdown();
    }

    async fn create_context(&self) -> Result<BrowserContextId> {
        let result: CreateBrowserContextResult = self
            .connection
            .send(
                None,
                Command::Target(TargetCommand::CreateBrowserContext {
                    dispose_on_detach: true,
                }),
            )
            .await?
            .into_typed()?;
        Ok(result.browser_context_id)
    }

    async fn create_and_attach(
        &self,
        browser_context_id: &BrowserContextId,
    ) -> Result<(TargetId, CdpSessionId)> {
        let target: CreateTargetResult = self
            .connection
            .send(
                None,
                Command::Target(TargetCommand::CreateTarget {
                    url: "about:blank".to_string(),
                    browser_context_id: browser_context_id.clone(),
                }),
            )
            .await?
            .into_typed()?;

        let attached: AttachToTargetResult = self
            .connection
            .send(
                None,
                Command::Target(TargetCommand::AttachToTarget {
                    target_id: target.target_id.clone(),
                    flatten: true,
                }),
            )
            .await?
            .into_typed()?;

        Ok((target.target_id, attached.session_id))
    }

    async fn dispose_context(&self, browser_context_id: &BrowserContextId) {
        let command = Command::Target(TargetCommand::DisposeBrowserContext {
            browser_context_id: browser_context_id.clone(),
        });
        if let Err(e) = self.connection.send(None, command).await.and_then(|r| r.into_result()) {
            warn!(%browser_context_id, error = %e, "Failed to dispose browser context");
        }
    }
}

#[async_trait]
impl CaptureBrowser for CdpBrowser {
    async fn open_session(&self) -> Result<OpenedSession> {
        let browser_context_id = self.create_context().await?;

        let (target_id, session_id) = match self.create_and_attach(&browser_context_id).await {
            Ok(ids) => ids,
            Err(e) => {
                self.dispose_context(&browser_context_id).await;
                return Err(e);
            }
        };

        let mut raw_events = self.connection.subscribe(session_id.clone());
        let (events_tx, events) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            while let Some(event) = raw_events.recv().await {
                if let Some(session_event) = event.parse_session()
                    && events_tx.send(session_event).is_err()
                {
                    break;
                }
            }
            trace!("Session event forwarder finished");
        });

        info!(%target_id, %session_id, "Browser session opened");

        let session = CdpSession {
            browser: self.clone(),
            browser_context_id,
            target_id,
            session_id,
            closed: AtomicBool::new(false),
        };

        Ok(OpenedSession {
            session: Arc::new(session),
            events,
        })
    }
}

// ============================================================================
// CdpSession
// ============================================================================

/// One isolated page attached through a flattened CDP session.
pub struct CdpSession {
    browser: CdpBrowser,
    browser_context_id: BrowserContextId,
    target_id: TargetId,
    session_id: CdpSessionId,
    closed: AtomicBool,
}

impl CdpSession {
    async fn send(&self, command: Command) -> Result<crate::protocol::Response> {
        self.browser
            .connection
            .send(Some(&self.session_id), command)
            .await
    }
}

#[async_trait]
impl BrowserSession for CdpSession {
    async fn enable_events(&self) -> Result<()> {
        self.send(Command::Network(NetworkCommand::Enable {
            max_total_buffer_size: MAX_TOTAL_BUFFER_SIZE,
            max_resource_buffer_size: MAX_RESOURCE_BUFFER_SIZE,
        }))
        .await?
        .into_result()?;
        self.send(Command::Page(PageCommand::Enable {}))
            .await?
            .into_result()?;
        Ok(())
    }

    async fn navigate(&self, url: &str) -> Result<Navigation> {
        debug!(url = %url, session_id = %self.session_id, "Navigating");

        let result: NavigateResult = self
            .send(Command::Page(PageCommand::Navigate {
                url: url.to_string(),
            }))
            .await?
            .into_typed()?;

        if let Some(error_text) = result.error_text.filter(|t| !t.is_empty()) {
            return Err(Error::navigation(url, error_text));
        }

        Ok(Navigation {
            loader_id: result.loader_id,
        })
    }

    async fn response_body(&self, request_id: &NetworkRequestId) -> Result<Vec<u8>> {
        let result: ResponseBodyResult = self
            .send(Command::Network(NetworkCommand::GetResponseBody {
                request_id: request_id.clone(),
            }))
            .await?
            .into_typed()?;

        if result.base64_encoded {
            Base64Standard
                .decode(result.body.as_bytes())
                .map_err(|e| Error::protocol(format!("invalid base64 body for {request_id}: {e}")))
        } else {
            Ok(result.body.into_bytes())
        }
    }

    async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        self.browser.connection.unsubscribe(&self.session_id);

        let close_target = Command::Target(TargetCommand::CloseTarget {
            target_id: self.target_id.clone(),
        });
        if let Err(e) = self
            .browser
            .connection
            .send(None, close_target)
            .await
            .and_then(|r| r.into_result())
        {
            warn!(target_id = %self.target_id, error = %e, "Failed to close target");
        }

        self.browser.dispose_context(&self.browser_context_id).await;

        debug!(target_id = %self.target_id, "Browser session closed");
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use serde_json::{Value, json};
    use tokio::time::timeout;

    use crate::protocol::{NetworkEvent, SessionEvent};
    use crate::transport::loopback::{LoopbackServer, event, reply, reply_error};

    const BINARY_BODY: &[u8] = &[0x89, b'P', b'N', b'G', 0x00, 0xff];

    /// Answers like a browser with one page in session `S-1`.
    fn browser_script(request: &Value) -> Vec<String> {
        let params = &request["params"];
        match request["method"].as_str().unwrap_or_default() {
            "Target.createBrowserContext" => {
                vec![reply(request, json!({"browserContextId": "CTX-1"}))]
            }
            "Target.createTarget" => vec![reply(request, json!({"targetId": "T-1"}))],
            "Target.attachToTarget" => vec![reply(request, json!({"sessionId": "S-1"}))],
            "Network.enable" => vec![
                reply(request, json!({})),
                event(
                    "S-1",
                    "Network.loadingFinished",
                    json!({"requestId": "R1", "timestamp": 1.0}),
                ),
                event("OTHER", "Network.loadingFinished", json!({"requestId": "R2"})),
            ],
            "Page.enable" => vec![
                reply(request, json!({})),
                event("S-1", "Page.loadEventFired", json!({"timestamp": 2.0})),
            ],
            "Page.navigate" if params["url"] == "https://unreachable.invalid/" => vec![reply(
                request,
                json!({"frameId": "F", "loaderId": "L-1", "errorText": "net::ERR_NAME_NOT_RESOLVED"}),
            )],
            "Page.navigate" => vec![reply(request, json!({"frameId": "F", "loaderId": "L-1"}))],
            "Network.getResponseBody" if params["requestId"] == "binary" => vec![reply(
                request,
                json!({"body": Base64Standard.encode(BINARY_BODY), "base64Encoded": true}),
            )],
            "Network.getResponseBody" if params["requestId"] == "text" => vec![reply(
                request,
                json!({"body": "<p>hi</p>", "base64Encoded": false}),
            )],
            "Network.getResponseBody" => vec![reply_error(
                request,
                -32000,
                "No resource with given identifier found",
            )],
            "Target.closeTarget" => vec![reply(request, json!({"success": true}))],
            "Target.disposeBrowserContext" => vec![reply(request, json!({}))],
            _ => vec![reply_error(request, -32601, "method not found")],
        }
    }

    async fn connect(server: &LoopbackServer) -> CdpBrowser {
        let connection = Connection::connect(&server.ws_url())
            .await
            .expect("connect");
        CdpBrowser::from_connection(connection)
    }

    fn count(server: &LoopbackServer, method: &str) -> usize {
        server.methods().iter().filter(|m| *m == method).count()
    }

    #[tokio::test]
    async fn test_open_session_creates_isolated_target() {
        let server = LoopbackServer::start(browser_script).await;
        let browser = connect(&server).await;

        let opened = browser.open_session().await.expect("open session");

        assert_eq!(
            server.methods(),
            [
                "Target.createBrowserContext",
                "Target.createTarget",
                "Target.attachToTarget"
            ]
        );
        let received = server.received();
        assert_eq!(received[1]["params"]["browserContextId"], "CTX-1");
        assert_eq!(received[1]["params"]["url"], "about:blank");
        assert_eq!(received[2]["params"]["targetId"], "T-1");
        assert_eq!(received[2]["params"]["flatten"], true);

        opened.session.close().await;
        browser.shutdown();
    }

    #[tokio::test]
    async fn test_session_events_forwarded() {
        let server = LoopbackServer::start(browser_script).await;
        let browser = connect(&server).await;
        let mut opened = browser.open_session().await.expect("open session");

        opened.session.enable_events().await.expect("enable events");

        let first = timeout(Duration::from_secs(5), opened.events.recv())
            .await
            .expect("network event in time");
        match first {
            Some(SessionEvent::Network(NetworkEvent::LoadingFinished { request_id })) => {
                assert_eq!(request_id.as_str(), "R1");
            }
            other => panic!("unexpected event: {other:?}"),
        }

        // The event of session OTHER is never delivered here
        let second = timeout(Duration::from_secs(5), opened.events.recv())
            .await
            .expect("load event in time");
        assert!(matches!(second, Some(SessionEvent::Loaded)));

        let received = server.received();
        let enable = &received[3];
        assert_eq!(enable["method"], "Network.enable");
        assert_eq!(enable["sessionId"], "S-1");
        assert_eq!(
            enable["params"]["maxResourceBufferSize"],
            MAX_RESOURCE_BUFFER_SIZE
        );
        assert_eq!(received[4]["method"], "Page.enable");

        opened.session.close().await;
        browser.shutdown();
    }

    #[tokio::test]
    async fn test_navigate_reports_loader() {
        let server = LoopbackServer::start(browser_script).await;
        let browser = connect(&server).await;
        let opened = browser.open_session().await.expect("open session");

        let navigation = opened
            .session
            .navigate("https://example.com/")
            .await
            .expect("navigate");
        assert_eq!(navigation.loader_id, Some(LoaderId::new("L-1")));

        opened.session.close().await;
        browser.shutdown();
    }

    #[tokio::test]
    async fn test_navigate_error_text_is_navigation_error() {
        let server = LoopbackServer::start(browser_script).await;
        let browser = connect(&server).await;
        let opened = browser.open_session().await.expect("open session");

        let err = opened
            .session
            .navigate("https://unreachable.invalid/")
            .await
            .unwrap_err();

        match err {
            Error::Navigation { url, message } => {
                assert_eq!(url, "https://unreachable.invalid/");
                assert_eq!(message, "net::ERR_NAME_NOT_RESOLVED");
            }
            other => panic!("unexpected error: {other:?}"),
        }

        opened.session.close().await;
        browser.shutdown();
    }

    #[tokio::test]
    async fn test_response_body_decoding() {
        let server = LoopbackServer::start(browser_script).await;
        let browser = connect(&server).await;
        let opened = browser.open_session().await.expect("open session");

        let binary = opened
            .session
            .response_body(&NetworkRequestId::new("binary"))
            .await
            .expect("binary body");
        assert_eq!(binary, BINARY_BODY);

        let text = opened
            .session
            .response_body(&NetworkRequestId::new("text"))
            .await
            .expect("text body");
        assert_eq!(text, b"<p>hi</p>");

        let missing = opened
            .session
            .response_body(&NetworkRequestId::new("gone"))
            .await
            .unwrap_err();
        assert!(matches!(missing, Error::Cdp { code: -32000, .. }));

        let body_request = server
            .received()
            .into_iter()
            .find(|r| r["method"] == "Network.getResponseBody")
            .expect("body request");
        assert_eq!(body_request["sessionId"], "S-1");

        opened.session.close().await;
        browser.shutdown();
    }

    #[tokio::test]
    async fn test_attach_failure_disposes_context() {
        let server = LoopbackServer::start(|request: &Value| {
            if request["method"] == "Target.attachToTarget" {
                vec![reply_error(request, -32000, "No target with given id found")]
            } else {
                browser_script(request)
            }
        })
        .await;
        let browser = connect(&server).await;

        let Err(err) = browser.open_session().await else {
            panic!("expected open failure");
        };
        assert!(matches!(err, Error::Cdp { code: -32000, .. }));

        assert_eq!(count(&server, "Target.disposeBrowserContext"), 1);
        let dispose = server
            .received()
            .into_iter()
            .find(|r| r["method"] == "Target.disposeBrowserContext")
            .expect("dispose request");
        assert_eq!(dispose["params"]["browserContextId"], "CTX-1");

        browser.shutdown();
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let server = LoopbackServer::start(browser_script).await;
        let browser = connect(&server).await;
        let opened = browser.open_session().await.expect("open session");

        tokio::join!(opened.session.close(), opened.session.close());
        opened.session.close().await;

        assert_eq!(count(&server, "Target.closeTarget"), 1);
        assert_eq!(count(&server, "Target.disposeBrowserContext"), 1);

        browser.shutdown();
    }
}
