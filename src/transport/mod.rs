//! WebSocket transport layer.
//!
//! This module handles communication with the remote browser's debugging
//! endpoint.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐                              ┌─────────────────┐
//! │  Rust            │    GET /json/version         │  Chrome         │
//! │                  │─────────────────────────────►│  :9222          │
//! │  Connection      │                              │                 │
//! │  (event loop)    │◄────────────────────────────►│  DevTools       │
//! │                  │   ws://.../devtools/browser  │  WebSocket      │
//! └──────────────────┘                              └─────────────────┘
//! ```
//!
//! # Connection Lifecycle
//!
//! 1. `discover_ws_url` - Resolve host, read `webSocketDebuggerUrl`
//! 2. `Connection::connect` - Open the WebSocket, spawn the event loop
//! 3. `Connection::subscribe` - Route one session's events to a channel
//! 4. `Connection::shutdown` - Close the socket, fail pending commands
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `connection` | WebSocket connection and event loop |
//! | `discovery` | Debugging endpoint discovery |

// ============================================================================
// Submodules
// ============================================================================

/// WebSocket connection and event loop.
pub mod connection;

/// Debugging endpoint discovery.
pub mod discovery;

/// In-process debugging endpoint for tests.
#[cfg(test)]
pub(crate) mod loopback;

// ============================================================================
// Re-exports
// ============================================================================

pub use connection::Connection;
pub use discovery::discover_ws_url;
