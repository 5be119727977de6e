//! Remote browser capabilities used by page capture.
//!
//! The capture engine talks to the browser only through the
//! [`CaptureBrowser`] and [`BrowserSession`] traits:
//!
//! - [`CaptureBrowser::open_session`] - isolated browsing session plus its
//!   event stream (network lifecycle and the main frame's load event)
//! - [`BrowserSession::enable_events`] - start event delivery
//! - [`BrowserSession::navigate`] - navigate the session's page
//! - [`BrowserSession::response_body`] - body retrieval by request id
//! - [`BrowserSession::close`] - tear the session down
//!
//! [`CdpBrowser`] implements them over the Chrome DevTools Protocol.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `cdp` | CDP-backed browser and session |
//! | `network` | Headers, requests and responses |

// ============================================================================
// Submodules
// ============================================================================

/// CDP-backed browser and session.
pub mod cdp;

/// Network data types.
pub mod network;

/// Scripted in-memory browser for tests.
#[cfg(test)]
pub(crate) mod scripted;

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::Result;
use crate::identifiers::{LoaderId, NetworkRequestId};
use crate::protocol::SessionEvent;

// ============================================================================
// Re-exports
// ============================================================================

pub use cdp::{CdpBrowser, CdpSession};
pub use network::{HeaderValue, Headers, NetworkRequest, NetworkResponse, ResourceType};

// ============================================================================
// Types
// ============================================================================

/// A freshly opened session and the receiver of its events.
pub struct OpenedSession {
    /// Session handle, shared with body-fetch tasks.
    pub session: Arc<dyn BrowserSession>,
    /// Events of this session only.
    pub events: mpsc::UnboundedReceiver<SessionEvent>,
}

/// Outcome of a successful navigation.
#[derive(Debug, Clone, Default)]
pub struct Navigation {
    /// Loader id of the main-frame navigation, when reported.
    pub loader_id: Option<LoaderId>,
}

// ============================================================================
// Traits
// ============================================================================

/// A browser able to open isolated sessions.
#[async_trait]
pub trait CaptureBrowser: Send + Sync {
    /// Opens an isolated browsing session with its own page.
    async fn open_session(&self) -> Result<OpenedSession>;
}

/// One isolated browsing session.
#[async_trait]
pub trait BrowserSession: Send + Sync {
    /// Enables delivery of network events and the page load event.
    async fn enable_events(&self) -> Result<()>;

    /// Navigates the page and waits for the navigation to commit.
    ///
    /// The load event arrives later on the session's event stream.
    async fn navigate(&self, url: &str) -> Result<Navigation>;

    /// Retrieves a decoded response body.
    async fn response_body(&self, request_id: &NetworkRequestId) -> Result<Vec<u8>>;

    /// Tears the session down. Errors are logged, never returned.
    async fn close(&self);
}
