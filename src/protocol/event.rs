//! Event message types.
//!
//! Events are notifications pushed by the browser. With flattened sessions
//! every page event carries the `sessionId` it belongs to.
//!
//! # Network Events
//!
//! | Method | Parsed as |
//! |--------|-----------|
//! | `Network.requestWillBeSent` | [`NetworkEvent::RequestWillBeSent`] |
//! | `Network.responseReceived` | [`NetworkEvent::ResponseReceived`] |
//! | `Network.loadingFinished` | [`NetworkEvent::LoadingFinished`] |
//! | `Network.loadingFailed` | [`NetworkEvent::LoadingFailed`] |
//!
//! # Page Events
//!
//! | Method | Parsed as |
//! |--------|-----------|
//! | `Page.loadEventFired` | [`SessionEvent::Loaded`] |

// ============================================================================
// Imports
// ============================================================================

use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use crate::browser::network::{NetworkRequest, NetworkResponse, ResourceType};
use crate::identifiers::{CdpSessionId, LoaderId, NetworkRequestId};

// ============================================================================
// Event
// ============================================================================

/// An event notification from the browser.
///
/// # Format
///
/// ```json
/// {
///   "method": "Domain.eventName",
///   "params": { ... },
///   "sessionId": "8A1F..."
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct Event {
    /// Event name in `Domain.eventName` format.
    pub method: String,

    /// Event-specific data.
    #[serde(default)]
    pub params: Value,

    /// Session the event belongs to (absent for browser-level events).
    #[serde(rename = "sessionId", default)]
    pub session_id: Option<CdpSessionId>,
}

impl Event {
    /// Parses an event that page capture consumes.
    ///
    /// `Page.loadEventFired` of a flattened session always refers to the
    /// page's main frame.
    #[must_use]
    pub fn parse_session(&self) -> Option<SessionEvent> {
        match self.method.as_str() {
            "Page.loadEventFired" => Some(SessionEvent::Loaded),
            _ => self.parse_network().map(SessionEvent::Network),
        }
    }

    /// Parses a network lifecycle event.
    ///
    /// Returns `None` for other events and for network events whose params
    /// do not match the expected shape.
    #[must_use]
    pub fn parse_network(&self) -> Option<NetworkEvent> {
        let params = self.params.clone();
        let parsed = match self.method.as_str() {
            "Network.requestWillBeSent" => serde_json::from_value::<RequestWillBeSent>(params)
                .map(|p| NetworkEvent::RequestWillBeSent {
                    request_id: p.request_id,
                    loader_id: p.loader_id,
                    request: p.request,
                    redirect_response: p.redirect_response,
                    resource_type: p.resource_type,
                }),

            "Network.responseReceived" => serde_json::from_value::<ResponseReceived>(params)
                .map(|p| NetworkEvent::ResponseReceived {
                    request_id: p.request_id,
                    loader_id: p.loader_id,
                    resource_type: p.resource_type,
                    response: p.response,
                }),

            "Network.loadingFinished" => serde_json::from_value::<LoadingFinished>(params)
                .map(|p| NetworkEvent::LoadingFinished {
                    request_id: p.request_id,
                }),

            "Network.loadingFailed" => serde_json::from_value::<LoadingFailed>(params).map(|p| {
                NetworkEvent::LoadingFailed {
                    request_id: p.request_id,
                    error_text: p.error_text,
                }
            }),

            _ => return None,
        };

        match parsed {
            Ok(event) => Some(event),
            Err(e) => {
                warn!(method = %self.method, error = %e, "Malformed network event");
                None
            }
        }
    }
}

// ============================================================================
// SessionEvent
// ============================================================================

/// Events delivered to page capture for one session.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// Network lifecycle event.
    Network(NetworkEvent),
    /// The main frame fired its load event.
    Loaded,
}

// ============================================================================
// NetworkEvent
// ============================================================================

/// Parsed network lifecycle events for one page.
#[derive(Debug, Clone)]
pub enum NetworkEvent {
    /// A request (or a redirect hop of it) is about to be sent.
    RequestWillBeSent {
        /// Request ID.
        request_id: NetworkRequestId,
        /// Loader ID of the navigation that issued it.
        loader_id: LoaderId,
        /// Request data.
        request: NetworkRequest,
        /// Response that caused this hop, if it is a redirect.
        redirect_response: Option<NetworkResponse>,
        /// Resource type.
        resource_type: ResourceType,
    },

    /// Response headers are available.
    ResponseReceived {
        /// Request ID.
        request_id: NetworkRequestId,
        /// Loader ID.
        loader_id: LoaderId,
        /// Resource type.
        resource_type: ResourceType,
        /// Response metadata.
        response: NetworkResponse,
    },

    /// The body has been fully received.
    LoadingFinished {
        /// Request ID.
        request_id: NetworkRequestId,
    },

    /// The load failed or was cancelled.
    LoadingFailed {
        /// Request ID.
        request_id: NetworkRequestId,
        /// Browser error text.
        error_text: String,
    },
}

// ============================================================================
// Event Params
// ============================================================================

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RequestWillBeSent {
    request_id: NetworkRequestId,
    #[serde(default = "empty_loader")]
    loader_id: LoaderId,
    request: NetworkRequest,
    #[serde(default)]
    redirect_response: Option<NetworkResponse>,
    #[serde(rename = "type", default)]
    resource_type: ResourceType,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponseReceived {
    request_id: NetworkRequestId,
    #[serde(default = "empty_loader")]
    loader_id: LoaderId,
    #[serde(rename = "type", default)]
    resource_type: ResourceType,
    response: NetworkResponse,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoadingFinished {
    request_id: NetworkRequestId,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoadingFailed {
    request_id: NetworkRequestId,
    #[serde(default)]
    error_text: String,
}

fn empty_loader() -> LoaderId {
    LoaderId::new("")
}

// ============================================================================
// Tests
// ============================================================================
