//! Redirect compensation records.
//!
//! When the top-level document resolved to a different URL than the one
//! requested, the archive gets three extra records addressed to the
//! requested URL:
//!
//! | Record | Content |
//! |--------|---------|
//! | request | document request headers, replayed against the requested URL |
//! | response | `301 Moved Permanently`, `Location: <final>`, the document body |
//! | metadata | `original-url`, `final-url` and an explanatory note |
//!
//! Replay viewers looking up the requested URL then find content instead of
//! a dangling redirect.

// ============================================================================
// Imports
// ============================================================================

use chrono::Utc;
use tracing::info;

use crate::error::Result;
use crate::warc::{ArchiveRecordPair, RecordWriter, WarcRecord};

use super::correlator::RedirectObservation;
use super::exchange::CapturedExchange;
use super::http::{request_message, response_message};

// ============================================================================
// Constants
// ============================================================================

/// Status of the synthesized response.
pub const COMPENSATION_STATUS: u16 = 301;

/// Reason phrase of the synthesized response.
pub const COMPENSATION_REASON: &str = "Moved Permanently";

/// `note` field of the metadata record.
pub const COMPENSATION_NOTE: &str =
    "This URL redirects, but a copy of the content has been duplicated here for WARC viewer compatibility";

// ============================================================================
// Types
// ============================================================================

/// The records written for one redirected page.
#[derive(Debug, Clone)]
pub struct CompensationRecords {
    /// Synthetic request and `301` response for the requested URL.
    pub pair: ArchiveRecordPair,
    /// Metadata record explaining the duplication.
    pub metadata: WarcRecord,
}

// ============================================================================
// RedirectArchiver
// ============================================================================

/// Writes redirect compensation records.
#[derive(Debug, Clone)]
pub struct RedirectArchiver {
    writer: RecordWriter,
}

impl RedirectArchiver {
    /// Creates an archiver writing through `writer`.
    #[must_use]
    pub fn new(writer: RecordWriter) -> Self {
        Self { writer }
    }

    /// Writes the compensation records for a redirected page.
    ///
    /// The request/response pair goes out under one lock, followed by the
    /// metadata record.
    ///
    /// # Errors
    ///
    /// Returns the underlying writer error.
    pub fn archive(&self, observation: &RedirectObservation, document: &CapturedExchange) -> Result<()> {
        let records = Self::build(observation, document);

        self.writer.write_pair(&records.pair)?;
        self.writer.write_record(&records.metadata)?;

        info!(
            original = %observation.original_url,
            final_url = %observation.final_url,
            "Redirect compensation archived"
        );
        Ok(())
    }

    /// Builds the compensation records without writing them.
    #[must_use]
    pub fn build(observation: &RedirectObservation, document: &CapturedExchange) -> CompensationRecords {
        let original = observation.original_url.as_str();

        let request = request_message(&document.method, original, &document.request_headers);

        let mut headers = document.response_headers.clone();
        headers.insert("Location", observation.final_url.as_str());
        let response = response_message(COMPENSATION_STATUS, COMPENSATION_REASON, &headers, &document.body);

        let pair = ArchiveRecordPair::new(
            original,
            request,
            response,
            document.response_headers.get_str("content-type"),
        );

        let mut metadata = WarcRecord::metadata(
            original,
            Utc::now(),
            &[
                ("original-url", original),
                ("final-url", observation.final_url.as_str()),
                ("note", COMPENSATION_NOTE),
            ],
        );
        metadata.concurrent_to = Some(pair.response.record_id.clone());

        CompensationRecords { pair, metadata }
    }
}

// ============================================================================
// Tests
// ============================================================================
