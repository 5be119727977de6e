//! Page capture engine.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `coordinator` | [`SessionCoordinator`], one archive per batch of URLs |
//! | `page` | [`PageCapture`], one browser session per URL |
//! | `correlator` | [`NetworkEventCorrelator`], network events to completed loads |
//! | `exchange` | [`CompletedLoad`] and [`CapturedExchange`] |
//! | `http` | Raw HTTP/1.1 message rendering |
//! | `redirect` | [`RedirectArchiver`], compensation records for moved documents |

// ============================================================================
// Submodules
// ============================================================================

/// Archive sessions.
pub mod coordinator;

/// Network event correlation.
pub mod correlator;

/// Captured exchanges.
pub mod exchange;

/// HTTP message rendering.
pub mod http;

/// Single page capture.
pub mod page;

/// Redirect compensation.
pub mod redirect;

// ============================================================================
// Re-exports
// ============================================================================

pub use coordinator::{ArchiveReport, SessionCoordinator};
pub use correlator::{NetworkEventCorrelator, RedirectHop, RedirectObservation};
pub use exchange::{CapturedExchange, CompletedLoad};
pub use http::{request_message, response_message};
pub use page::{PageCapture, PageOutcome, PageSummary};
pub use redirect::{CompensationRecords, RedirectArchiver};
