//! Scripted in-memory browser.
//!
//! Each URL maps to a [`ScriptedPage`]: the network events a navigation to
//! it emits, the bodies `response_body` returns, and optional failures.
//! Navigation answers at commit; the load event follows the page's events,
//! or after a delay when the page loads slowly.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tokio::sync::mpsc;

use crate::error::{Error, Result};
use crate::identifiers::{LoaderId, NetworkRequestId};
use crate::protocol::{NetworkEvent, SessionEvent};

use super::network::{NetworkRequest, NetworkResponse, ResourceType};
use super::{BrowserSession, CaptureBrowser, Navigation, OpenedSession};

/// Loader id of every scripted main-frame navigation.
const MAIN_LOADER: &str = "MAIN";

// ============================================================================
// ScriptedPage
// ============================================================================

#[derive(Debug, Clone, Default)]
pub(crate) struct ScriptedPage {
    events: Vec<NetworkEvent>,
    late_events: Vec<NetworkEvent>,
    load_delay: Option<Duration>,
    bodies: FxHashMap<String, Vec<u8>>,
    navigation_error: Option<String>,
    without_loader: bool,
    hang: bool,
}

impl ScriptedPage {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// A resource that loads fully and has a body.
    pub(crate) fn resource(
        mut self,
        id: &str,
        url: &str,
        resource_type: ResourceType,
        content_type: &str,
        body: &[u8],
    ) -> Self {
        self.events
            .extend(load_events(id, url, resource_type, content_type));
        self.bodies.insert(id.to_string(), body.to_vec());
        self
    }

    /// A resource that finishes only after navigation has committed,
    /// shortly before the load event.
    pub(crate) fn late_resource(
        mut self,
        id: &str,
        url: &str,
        resource_type: ResourceType,
        content_type: &str,
        body: &[u8],
    ) -> Self {
        self.late_events
            .extend(load_events(id, url, resource_type, content_type));
        self.bodies.insert(id.to_string(), body.to_vec());
        self
    }

    /// A resource that loads but whose body cannot be retrieved.
    pub(crate) fn unfetchable(mut self, id: &str, url: &str, resource_type: ResourceType) -> Self {
        self.events
            .extend(load_events(id, url, resource_type, "text/html"));
        self
    }

    /// A redirect hop of request `id`.
    pub(crate) fn redirect(mut self, id: &str, from: &str, to: &str, status: u16) -> Self {
        self.events.push(request_sent(id, from, None));
        self.events.push(request_sent(
            id,
            to,
            Some(NetworkResponse {
                url: from.to_string(),
                status,
                headers: [("Location", to)].into_iter().collect(),
                ..NetworkResponse::default()
            }),
        ));
        self
    }

    pub(crate) fn navigation_error(mut self, error_text: &str) -> Self {
        self.navigation_error = Some(error_text.to_string());
        self
    }

    /// The load event fires `delay` after navigation commits.
    pub(crate) fn loads_after(mut self, delay: Duration) -> Self {
        self.load_delay = Some(delay);
        self
    }

    /// Navigation does not report a loader id.
    pub(crate) fn without_loader(mut self) -> Self {
        self.without_loader = true;
        self
    }

    /// Navigation never completes.
    pub(crate) fn hang(mut self) -> Self {
        self.hang = true;
        self
    }
}

fn load_events(
    id: &str,
    url: &str,
    resource_type: ResourceType,
    content_type: &str,
) -> [NetworkEvent; 3] {
    [
        request_sent(id, url, None),
        NetworkEvent::ResponseReceived {
            request_id: NetworkRequestId::new(id),
            loader_id: LoaderId::new(MAIN_LOADER),
            resource_type,
            response: NetworkResponse {
                url: url.to_string(),
                status: 200,
                status_text: "OK".to_string(),
                headers: [("Content-Type", content_type)].into_iter().collect(),
                request_headers: Some(
                    [(":method", "GET"), ("accept", "*/*")].into_iter().collect(),
                ),
            },
        },
        NetworkEvent::LoadingFinished {
            request_id: NetworkRequestId::new(id),
        },
    ]
}

fn request_sent(id: &str, url: &str, redirect_response: Option<NetworkResponse>) -> NetworkEvent {
    NetworkEvent::RequestWillBeSent {
        request_id: NetworkRequestId::new(id),
        loader_id: LoaderId::new(MAIN_LOADER),
        request: NetworkRequest {
            url: url.to_string(),
            method: "GET".to_string(),
            headers: [("Accept", "*/*")].into_iter().collect(),
        },
        redirect_response,
        resource_type: ResourceType::Other,
    }
}

// ============================================================================
// ScriptedBrowser
// ============================================================================

#[derive(Debug, Default)]
pub(crate) struct ScriptedBrowser {
    pages: Arc<Mutex<FxHashMap<String, ScriptedPage>>>,
    fail_open: AtomicBool,
    open_delay: Mutex<Duration>,
    pub opened: AtomicUsize,
    pub closed: Arc<AtomicUsize>,
}

impl ScriptedBrowser {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn script(&self, url: &str, page: ScriptedPage) {
        self.pages.lock().insert(url.to_string(), page);
    }

    /// Makes every later `open_session` fail.
    pub(crate) fn fail_open(&self) {
        self.fail_open.store(true, Ordering::SeqCst);
    }

    /// Makes every later `open_session` take `delay` before it succeeds.
    pub(crate) fn slow_open(&self, delay: Duration) {
        *self.open_delay.lock() = delay;
    }
}

#[async_trait]
impl CaptureBrowser for ScriptedBrowser {
    async fn open_session(&self) -> Result<OpenedSession> {
        if self.fail_open.load(Ordering::SeqCst) {
            return Err(Error::connection("scripted browser refused session"));
        }
        let delay = *self.open_delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.opened.fetch_add(1, Ordering::SeqCst);

        let (events_tx, events) = mpsc::unbounded_channel();
        let session = ScriptedSession {
            pages: Arc::clone(&self.pages),
            closed: Arc::clone(&self.closed),
            events_tx: Mutex::new(Some(events_tx)),
            bodies: Mutex::new(FxHashMap::default()),
        };

        Ok(OpenedSession {
            session: Arc::new(session),
            events,
        })
    }
}

// ============================================================================
// ScriptedSession
// ============================================================================

struct ScriptedSession {
    pages: Arc<Mutex<FxHashMap<String, ScriptedPage>>>,
    closed: Arc<AtomicUsize>,
    events_tx: Mutex<Option<mpsc::UnboundedSender<SessionEvent>>>,
    bodies: Mutex<FxHashMap<String, Vec<u8>>>,
}

#[async_trait]
impl BrowserSession for ScriptedSession {
    async fn enable_events(&self) -> Result<()> {
        Ok(())
    }

    async fn navigate(&self, url: &str) -> Result<Navigation> {
        let page = self.pages.lock().get(url).cloned().unwrap_or_default();

        if page.hang {
            std::future::pending::<()>().await;
        }
        if let Some(error_text) = page.navigation_error {
            return Err(Error::navigation(url, error_text));
        }

        *self.bodies.lock() = page.bodies;
        let Some(tx) = self.events_tx.lock().clone() else {
            return Err(Error::ConnectionClosed);
        };
        for event in page.events {
            let _ = tx.send(SessionEvent::Network(event));
        }

        let late_events = page.late_events;
        match page.load_delay {
            Some(delay) => {
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    for event in late_events {
                        let _ = tx.send(SessionEvent::Network(event));
                    }
                    let _ = tx.send(SessionEvent::Loaded);
                });
            }
            None => {
                for event in late_events {
                    let _ = tx.send(SessionEvent::Network(event));
                }
                let _ = tx.send(SessionEvent::Loaded);
            }
        }

        Ok(Navigation {
            loader_id: (!page.without_loader).then(|| LoaderId::new(MAIN_LOADER)),
        })
    }

    async fn response_body(&self, request_id: &NetworkRequestId) -> Result<Vec<u8>> {
        self.bodies
            .lock()
            .get(request_id.as_str())
            .cloned()
            .ok_or_else(|| Error::cdp(-32000, "No resource with given identifier found"))
    }

    async fn close(&self) {
        self.events_tx.lock().take();
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}
