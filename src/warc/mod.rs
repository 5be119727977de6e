//! WARC archive records and writing.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `record` | [`WarcRecord`], [`ArchiveRecordPair`], [`RecordType`] |
//! | `writer` | [`WarcWriter`] trait and WARC/1.1 [`FileWarcWriter`] |
//! | `recorder` | [`RecordWriter`], the shared lock-serialized handle |

// ============================================================================
// Submodules
// ============================================================================

/// Record model.
pub mod record;

/// Lock-serialized record writing.
pub mod recorder;

/// Container encoding.
pub mod writer;

// ============================================================================
// Re-exports
// ============================================================================

pub use record::{ArchiveRecordPair, RecordType, WarcRecord};
pub use recorder::RecordWriter;
pub use writer::{FileWarcWriter, WarcWriter};
