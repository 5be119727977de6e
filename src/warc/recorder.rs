//! Lock-serialized record writing.
//!
//! [`RecordWriter`] is the single point of serialization for an archive
//! session. Every page capture and body-fetch task holds a clone; each
//! write call takes the lock for exactly that call and nothing else.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use tracing::debug;

use crate::error::Result;
use crate::identifiers::RecordId;

use super::record::{ArchiveRecordPair, WarcRecord};
use super::writer::WarcWriter;

// ============================================================================
// Constants
// ============================================================================

/// `software` field of warcinfo records.
const SOFTWARE: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// `format` field of warcinfo records.
const FORMAT: &str = "WARC File Format 1.1";

// ============================================================================
// RecordWriter
// ============================================================================

/// Shared, lock-serialized handle to one archive stream.
#[derive(Clone)]
pub struct RecordWriter {
    inner: Arc<Mutex<Box<dyn WarcWriter>>>,
    filename: Option<Arc<str>>,
    is_part_of: Option<Arc<str>>,
}

impl fmt::Debug for RecordWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordWriter")
            .field("filename", &self.filename)
            .field("is_part_of", &self.is_part_of)
            .finish_non_exhaustive()
    }
}

impl RecordWriter {
    /// Wraps a container writer.
    #[must_use]
    pub fn new(writer: impl WarcWriter + 'static) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Box::new(writer))),
            filename: None,
            is_part_of: None,
        }
    }

    /// Sets the `WARC-Filename` announced by warcinfo records.
    #[must_use]
    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(Arc::from(filename.into()));
        self
    }

    /// Sets the `isPartOf` field of warcinfo records.
    #[must_use]
    pub fn with_is_part_of(mut self, is_part_of: impl Into<String>) -> Self {
        self.is_part_of = Some(Arc::from(is_part_of.into()));
        self
    }

    /// Writes a warcinfo record describing the producing software.
    ///
    /// # Errors
    ///
    /// Returns the underlying writer error.
    pub fn write_info(&self) -> Result<RecordId> {
        let mut info: Vec<(&str, &str)> = vec![("software", SOFTWARE), ("format", FORMAT)];
        if let Some(ref part) = self.is_part_of {
            info.push(("isPartOf", part.as_ref()));
        }

        let record = WarcRecord::warcinfo(Utc::now(), self.filename.as_deref(), &info);
        self.write_record(&record)?;
        Ok(record.record_id)
    }

    /// Writes one record.
    ///
    /// # Errors
    ///
    /// Returns the underlying writer error.
    pub fn write_record(&self, record: &WarcRecord) -> Result<()> {
        self.inner.lock().write_record(record)
    }

    /// Writes a request and its response back to back under one lock.
    ///
    /// The pair is handed to the container writer as one unit, so a failure
    /// never leaves the request without its response.
    ///
    /// # Errors
    ///
    /// Returns the underlying writer error.
    pub fn write_pair(&self, pair: &ArchiveRecordPair) -> Result<()> {
        self.inner
            .lock()
            .write_records(&[&pair.request, &pair.response])
    }

    /// Flushes the archive stream.
    ///
    /// # Errors
    ///
    /// Returns the underlying writer error.
    pub fn finish(&self) -> Result<()> {
        self.inner.lock().flush()?;
        debug!(filename = ?self.filename, "Archive stream flushed");
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
