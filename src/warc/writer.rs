//! WARC/1.1 container encoding.
//!
//! [`FileWarcWriter`] frames each record as a header block, its payload and
//! the `\r\n\r\n` record terminator. With gzip compression every record is
//! its own gzip member, so the file stays seekable per record.
//!
//! Records are encoded in memory first and reach the sink in one write, so
//! a failed call never leaves half a record or a request without its
//! response behind in the stream.

// ============================================================================
// Imports
// ============================================================================

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use flate2::write::GzEncoder;
use tracing::trace;

use crate::config::Compression;
use crate::error::Result;

use super::record::WarcRecord;

// ============================================================================
// Constants
// ============================================================================

/// Version line of every record.
const WARC_VERSION: &str = "WARC/1.1";

/// Terminator after each record payload.
const RECORD_END: &[u8] = b"\r\n\r\n";

// ============================================================================
// WarcWriter
// ============================================================================

/// Sink that persists records in container format.
pub trait WarcWriter: Send {
    /// Appends records back to back as one unit.
    fn write_records(&mut self, records: &[&WarcRecord]) -> Result<()>;

    /// Appends one record.
    fn write_record(&mut self, record: &WarcRecord) -> Result<()> {
        self.write_records(&[record])
    }

    /// Flushes buffered output.
    fn flush(&mut self) -> Result<()>;
}

// ============================================================================
// FileWarcWriter
// ============================================================================

/// WARC/1.1 encoder over any byte sink.
#[derive(Debug)]
pub struct FileWarcWriter<W: Write + Send> {
    inner: W,
    compression: Compression,
}

impl FileWarcWriter<BufWriter<File>> {
    /// Creates (or truncates) an archive file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`](crate::Error::Io) if the file cannot be created.
    pub fn create(path: impl AsRef<Path>, compression: Compression) -> Result<Self> {
        let file = File::create(path)?;
        Ok(Self::new(BufWriter::new(file), compression))
    }
}

impl<W: Write + Send> FileWarcWriter<W> {
    /// Wraps a byte sink.
    #[inline]
    #[must_use]
    pub fn new(inner: W, compression: Compression) -> Self {
        Self { inner, compression }
    }

    /// Returns the underlying sink.
    #[inline]
    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write + Send> WarcWriter for FileWarcWriter<W> {
    fn write_records(&mut self, records: &[&WarcRecord]) -> Result<()> {
        let mut encoded = Vec::new();
        for record in records {
            encode_record(record, self.compression, &mut encoded)?;
        }

        self.inner.write_all(&encoded)?;

        for record in records {
            trace!(
                record_type = %record.record_type,
                record_id = %record.record_id,
                len = record.payload.len(),
                "Record written"
            );
        }

        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.inner.flush()?;
        Ok(())
    }
}

/// Appends one framed (and optionally compressed) record to `out`.
fn encode_record(record: &WarcRecord, compression: Compression, out: &mut Vec<u8>) -> Result<()> {
    let header = encode_header(record);

    match compression {
        Compression::None => {
            out.extend_from_slice(&header);
            out.extend_from_slice(&record.payload);
            out.extend_from_slice(RECORD_END);
        }
        Compression::Gzip => {
            let mut gz = GzEncoder::new(out, flate2::Compression::default());
            gz.write_all(&header)?;
            gz.write_all(&record.payload)?;
            gz.write_all(RECORD_END)?;
            gz.finish()?;
        }
    }

    Ok(())
}

/// Renders the version line and header fields, including the blank line.
fn encode_header(record: &WarcRecord) -> Vec<u8> {
    let mut lines = vec![
        WARC_VERSION.to_string(),
        format!("WARC-Type: {}", record.record_type),
        format!("WARC-Record-ID: {}", record.record_id),
        format!("WARC-Date: {}", record.date_string()),
    ];

    if let Some(ref uri) = record.target_uri {
        lines.push(format!("WARC-Target-URI: {uri}"));
    }
    if let Some(ref concurrent_to) = record.concurrent_to {
        lines.push(format!("WARC-Concurrent-To: {concurrent_to}"));
    }
    for (name, value) in &record.fields {
        lines.push(format!("{name}: {value}"));
    }
    lines.push(format!("Content-Type: {}", record.content_type));
    lines.push(format!("Content-Length: {}", record.payload.len()));

    let mut out = lines.join("\r\n").into_bytes();
    out.extend_from_slice(b"\r\n\r\n");
    out
}

// ============================================================================
// CollectingWriter
// ============================================================================

/// Test sink keeping records in memory, in write order.
#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub(crate) struct CollectingWriter {
    pub records: std::sync::Arc<parking_lot::Mutex<Vec<WarcRecord>>>,
}

#[cfg(test)]
impl WarcWriter for CollectingWriter {
    fn write_records(&mut self, records: &[&WarcRecord]) -> Result<()> {
        self.records
            .lock()
            .extend(records.iter().map(|&record| record.clone()));
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
