//! Chrome DevTools Protocol message types.
//!
//! This module defines the message format exchanged with the remote
//! browser over its debugging WebSocket.
//!
//! # Protocol Overview
//!
//! | Message Type | Direction | Purpose |
//! |--------------|-----------|---------|
//! | `Request` | Local → Browser | Command with integer id |
//! | `Response` | Browser → Local | Result or error for an id |
//! | `Event` | Browser → Local | Notification, tagged with `sessionId` |
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `command` | Command definitions by domain |
//! | `event` | Event and parsed session event types |
//! | `request` | Request and Response types |

// ============================================================================
// Submodules
// ============================================================================

/// Command definitions organized by domain.
pub mod command;

/// Event message types.
pub mod event;

/// Request and Response message types.
pub mod request;

// ============================================================================
// Re-exports
// ============================================================================

pub use command::{Command, NetworkCommand, PageCommand, TargetCommand};
pub use event::{Event, NetworkEvent, SessionEvent};
pub use request::{Request, Response, ResponseError};
