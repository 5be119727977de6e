//! WARC Capture - Archive live pages as a real browser loads them.
//!
//! This library drives a remote Chromium-family browser over the Chrome
//! DevTools Protocol, records every network exchange of each page, and writes
//! them as request/response record pairs into one WARC/1.1 file per session.
//!
//! # Architecture
//!
//! ```text
//! SessionCoordinator ──► N × PageCapture (parallel)
//!                              │
//!                              ├─► NetworkEventCorrelator ──► body fetch tasks
//!                              │                                   │
//!                              └─► RedirectArchiver                │
//!                                        │                         ▼
//!                                        └──────────────► RecordWriter ──► .warc.gz
//! ```
//!
//! Key design principles:
//!
//! - One WebSocket per archive call, one isolated browser context per URL
//! - One archive stream per session, written only under a single lock
//! - A request record and its response record are never separated
//! - Failures are contained at the narrowest scope (resource, then page)
//!
//! # Quick Start
//!
//! ```no_run
//! use warc_capture::{ArchiverConfig, Result, SessionCoordinator};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     // CHROME_HOST, CHROME_PORT and DATA_DIR override the defaults
//!     let coordinator = SessionCoordinator::new(ArchiverConfig::from_env()?);
//!
//!     let urls = vec!["https://example.com/".to_string()];
//!     let path = coordinator.archive(&urls, "session-42").await?;
//!     println!("Archive written to {}", path.display());
//!
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`capture`] | Session coordination, page capture, correlation, redirects |
//! | [`browser`] | Browser traits and the CDP implementation |
//! | [`warc`] | Record model and WARC/1.1 writing |
//! | [`config`] | [`ArchiverConfig`] and environment loading |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`protocol`] | CDP message types (internal) |
//! | [`transport`] | WebSocket transport and endpoint discovery (internal) |

// ============================================================================
// Modules
// ============================================================================

/// Remote browser capabilities.
///
/// - [`CaptureBrowser`] - opens isolated sessions
/// - [`BrowserSession`] - navigation and body retrieval
/// - [`CdpBrowser`] - Chrome DevTools Protocol implementation
pub mod browser;

/// Page capture engine.
///
/// Start with [`SessionCoordinator`].
pub mod capture;

/// Archiver configuration.
pub mod config;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers.
///
/// Newtype wrappers prevent mixing incompatible IDs at compile time.
pub mod identifiers;

/// CDP message types.
///
/// Internal module defining command/response/event structures.
pub mod protocol;

/// WebSocket transport layer.
///
/// Internal module handling endpoint discovery and the CDP connection.
pub mod transport;

/// WARC records and writers.
pub mod warc;

// ============================================================================
// Re-exports
// ============================================================================

// Browser types
pub use browser::{
    BrowserSession, CaptureBrowser, CdpBrowser, HeaderValue, Headers, NetworkRequest,
    NetworkResponse, ResourceType,
};

// Capture types
pub use capture::{
    ArchiveReport, CapturedExchange, NetworkEventCorrelator, PageCapture, PageOutcome,
    PageSummary, RedirectArchiver, RedirectObservation, SessionCoordinator,
};

// Configuration
pub use config::{ArchiverConfig, ArchiverConfigBuilder, Compression};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::{
    BrowserContextId, CdpSessionId, CommandId, LoaderId, NetworkRequestId, RecordId, TargetId,
};

// Archive types
pub use warc::{ArchiveRecordPair, RecordType, RecordWriter, WarcRecord};
