//! Command definitions organized by CDP domain.
//!
//! Commands follow the `Domain.methodName` format.
//!
//! # Command Domains
//!
//! | Domain | Commands |
//! |--------|----------|
//! | `Target` | Browser contexts, targets, session attachment |
//! | `Network` | Event delivery, body retrieval |
//! | `Page` | Lifecycle events, navigation |

// ============================================================================
// Imports
// ============================================================================

use serde::Serialize;

use crate::identifiers::{BrowserContextId, NetworkRequestId, TargetId};

// ============================================================================
// Command Wrapper
// ============================================================================

/// All protocol commands organized by domain.
///
/// This enum wraps domain-specific command enums for unified serialization.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Command {
    /// Target domain commands.
    Target(TargetCommand),
    /// Network domain commands.
    Network(NetworkCommand),
    /// Page domain commands.
    Page(PageCommand),
}

impl Command {
    /// Returns the CDP method name, for logging.
    #[must_use]
    pub fn method(&self) -> &'static str {
        match self {
            Self::Target(TargetCommand::CreateBrowserContext { .. }) => {
                "Target.createBrowserContext"
            }
            Self::Target(TargetCommand::DisposeBrowserContext { .. }) => {
                "Target.disposeBrowserContext"
            }
            Self::Target(TargetCommand::CreateTarget { .. }) => "Target.createTarget",
            Self::Target(TargetCommand::AttachToTarget { .. }) => "Target.attachToTarget",
            Self::Target(TargetCommand::CloseTarget { .. }) => "Target.closeTarget",
            Self::Network(NetworkCommand::Enable { .. }) => "Network.enable",
            Self::Network(NetworkCommand::GetResponseBody { .. }) => "Network.getResponseBody",
            Self::Page(PageCommand::Enable {}) => "Page.enable",
            Self::Page(PageCommand::Navigate { .. }) => "Page.navigate",
        }
    }
}

// ============================================================================
// Target Commands
// ============================================================================

/// Target domain commands for isolated browsing sessions.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "method", content = "params")]
pub enum TargetCommand {
    /// Create an isolated (incognito-like) browser context.
    #[serde(rename = "Target.createBrowserContext")]
    CreateBrowserContext {
        /// Dispose the context when the debugging client detaches.
        #[serde(rename = "disposeOnDetach")]
        dispose_on_detach: bool,
    },

    /// Dispose a browser context and every target in it.
    #[serde(rename = "Target.disposeBrowserContext")]
    DisposeBrowserContext {
        /// Context to dispose.
        #[serde(rename = "browserContextId")]
        browser_context_id: BrowserContextId,
    },

    /// Open a page target.
    #[serde(rename = "Target.createTarget")]
    CreateTarget {
        /// Initial URL.
        url: String,
        /// Context the page belongs to.
        #[serde(rename = "browserContextId")]
        browser_context_id: BrowserContextId,
    },

    /// Attach to a target and obtain a session id.
    #[serde(rename = "Target.attachToTarget")]
    AttachToTarget {
        /// Target to attach to.
        #[serde(rename = "targetId")]
        target_id: TargetId,
        /// Use flat session mode (`sessionId` on every message).
        flatten: bool,
    },

    /// Close a page target.
    #[serde(rename = "Target.closeTarget")]
    CloseTarget {
        /// Target to close.
        #[serde(rename = "targetId")]
        target_id: TargetId,
    },
}

// ============================================================================
// Network Commands
// ============================================================================

/// Network domain commands.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "method", content = "params")]
pub enum NetworkCommand {
    /// Enable network event delivery.
    #[serde(rename = "Network.enable")]
    Enable {
        /// Total buffer size for retained response bodies.
        #[serde(rename = "maxTotalBufferSize")]
        max_total_buffer_size: u64,
        /// Per-resource buffer size for retained response bodies.
        #[serde(rename = "maxResourceBufferSize")]
        max_resource_buffer_size: u64,
    },

    /// Retrieve a response body by request id.
    #[serde(rename = "Network.getResponseBody")]
    GetResponseBody {
        /// Request whose body to fetch.
        #[serde(rename = "requestId")]
        request_id: NetworkRequestId,
    },
}

// ============================================================================
// Page Commands
// ============================================================================

/// Page domain commands.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "method", content = "params")]
pub enum PageCommand {
    /// Enable page lifecycle events such as `Page.loadEventFired`.
    #[serde(rename = "Page.enable")]
    Enable {},

    /// Navigate the page to a URL.
    #[serde(rename = "Page.navigate")]
    Navigate {
        /// URL to navigate to.
        url: String,
    },
}

// ============================================================================
// Tests
// ============================================================================
