//! WARC record model.
//!
//! Records are built here and encoded by a [`WarcWriter`]. A request and
//! its response always travel together as an [`ArchiveRecordPair`], which
//! guarantees the `WARC-Concurrent-To` linkage and a shared date.
//!
//! [`WarcWriter`]: super::WarcWriter

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};

use crate::identifiers::RecordId;

// ============================================================================
// Constants
// ============================================================================

/// Content type of request record blocks.
pub const HTTP_REQUEST_CONTENT_TYPE: &str = "application/http; msgtype=request";

/// Content type of response record blocks when none was observed.
pub const HTTP_RESPONSE_CONTENT_TYPE: &str = "application/http; msgtype=response";

/// Content type of `warcinfo` and `metadata` blocks.
pub const WARC_FIELDS_CONTENT_TYPE: &str = "application/warc-fields";

// ============================================================================
// RecordType
// ============================================================================

/// WARC record types produced by this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordType {
    /// File-level description.
    WarcInfo,
    /// HTTP request.
    Request,
    /// HTTP response.
    Response,
    /// Free-form annotation of another record or URI.
    Metadata,
}

impl RecordType {
    /// Returns the `WARC-Type` value.
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::WarcInfo => "warcinfo",
            Self::Request => "request",
            Self::Response => "response",
            Self::Metadata => "metadata",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// WarcRecord
// ============================================================================

/// One archive record.
#[derive(Debug, Clone)]
pub struct WarcRecord {
    /// `WARC-Type`.
    pub record_type: RecordType,
    /// `WARC-Record-ID`.
    pub record_id: RecordId,
    /// `WARC-Concurrent-To`.
    pub concurrent_to: Option<RecordId>,
    /// `WARC-Target-URI` (absent on `warcinfo`).
    pub target_uri: Option<String>,
    /// `WARC-Date`.
    pub date: DateTime<Utc>,
    /// `Content-Type` of the block.
    pub content_type: String,
    /// Additional named header fields, written in order.
    pub fields: Vec<(String, String)>,
    /// Record block.
    pub payload: Vec<u8>,
}

impl WarcRecord {
    /// Creates a `warcinfo` record from `key: value` fields.
    #[must_use]
    pub fn warcinfo(date: DateTime<Utc>, filename: Option<&str>, info: &[(&str, &str)]) -> Self {
        Self {
            record_type: RecordType::WarcInfo,
            record_id: RecordId::generate(),
            concurrent_to: None,
            target_uri: None,
            date,
            content_type: WARC_FIELDS_CONTENT_TYPE.to_string(),
            fields: filename
                .map(|name| vec![("WARC-Filename".to_string(), name.to_string())])
                .unwrap_or_default(),
            payload: warc_fields(info),
        }
    }

    /// Creates a `metadata` record about a URI from `key: value` fields.
    #[must_use]
    pub fn metadata(target_uri: impl Into<String>, date: DateTime<Utc>, info: &[(&str, &str)]) -> Self {
        Self {
            record_type: RecordType::Metadata,
            record_id: RecordId::generate(),
            concurrent_to: None,
            target_uri: Some(target_uri.into()),
            date,
            content_type: WARC_FIELDS_CONTENT_TYPE.to_string(),
            fields: Vec::new(),
            payload: warc_fields(info),
        }
    }

    /// Returns the `WARC-Date` value (RFC 3339, UTC, whole seconds).
    #[must_use]
    pub fn date_string(&self) -> String {
        self.date.to_rfc3339_opts(SecondsFormat::Secs, true)
    }
}

/// Renders `key: value\r\n` lines.
fn warc_fields(info: &[(&str, &str)]) -> Vec<u8> {
    let mut out = Vec::new();
    for (key, value) in info {
        out.extend_from_slice(key.as_bytes());
        out.extend_from_slice(b": ");
        out.extend_from_slice(value.as_bytes());
        out.extend_from_slice(b"\r\n");
    }
    out
}

// ============================================================================
// ArchiveRecordPair
// ============================================================================

/// A request record and the response record that references it.
#[derive(Debug, Clone)]
pub struct ArchiveRecordPair {
    /// The request record.
    pub request: WarcRecord,
    /// The response record; its `concurrent_to` is the request's id.
    pub response: WarcRecord,
}

impl ArchiveRecordPair {
    /// Builds a linked pair sharing one target URI and one date.
    ///
    /// The request id is generated first and referenced by the response.
    #[must_use]
    pub fn new(
        target_uri: impl Into<String>,
        request_payload: Vec<u8>,
        response_payload: Vec<u8>,
        response_content_type: Option<&str>,
    ) -> Self {
        let target_uri = target_uri.into();
        let date = Utc::now();

        let request = WarcRecord {
            record_type: RecordType::Request,
            record_id: RecordId::generate(),
            concurrent_to: None,
            target_uri: Some(target_uri.clone()),
            date,
            content_type: HTTP_REQUEST_CONTENT_TYPE.to_string(),
            fields: Vec::new(),
            payload: request_payload,
        };

        let response = WarcRecord {
            record_type: RecordType::Response,
            record_id: RecordId::generate(),
            concurrent_to: Some(request.record_id.clone()),
            target_uri: Some(target_uri),
            date,
            content_type: response_content_type
                .filter(|ct| !ct.is_empty())
                .unwrap_or(HTTP_RESPONSE_CONTENT_TYPE)
                .to_string(),
            fields: Vec::new(),
            payload: response_payload,
        };

        Self { request, response }
    }
}

// ============================================================================
// Tests
// ============================================================================
