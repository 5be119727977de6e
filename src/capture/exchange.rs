//! Captured request/response exchanges.

// ============================================================================
// Imports
// ============================================================================

use reqwest::StatusCode;

use crate::browser::network::Headers;
use crate::identifiers::NetworkRequestId;
use crate::warc::ArchiveRecordPair;

use super::http::{request_message, response_message};

// ============================================================================
// CompletedLoad
// ============================================================================

/// A resource whose response and finished-loading signal have both arrived.
///
/// Only the body is missing; [`CompletedLoad::into_exchange`] adds it.
#[derive(Debug, Clone)]
pub struct CompletedLoad {
    /// Request ID, used to fetch the body.
    pub request_id: NetworkRequestId,
    /// Resolved response URL.
    pub url: String,
    /// Request method.
    pub method: String,
    /// Request headers (wire headers when reported).
    pub request_headers: Headers,
    /// Response status code.
    pub status: u16,
    /// Response status text, possibly empty.
    pub status_text: String,
    /// Response headers.
    pub response_headers: Headers,
    /// Whether this is the page's top-level document.
    pub is_top_level_document: bool,
}

impl CompletedLoad {
    /// Attaches the fetched body.
    ///
    /// An empty status text (HTTP/2 and later) becomes the canonical reason
    /// phrase of the status code.
    #[must_use]
    pub fn into_exchange(self, body: Vec<u8>) -> CapturedExchange {
        let status_text = if self.status_text.is_empty() {
            StatusCode::from_u16(self.status)
                .ok()
                .and_then(|s| s.canonical_reason())
                .unwrap_or_default()
                .to_string()
        } else {
            self.status_text
        };

        CapturedExchange {
            request_id: self.request_id,
            url: self.url,
            method: self.method,
            request_headers: self.request_headers,
            response_status: self.status,
            response_status_text: status_text,
            response_headers: self.response_headers,
            body,
            is_top_level_document: self.is_top_level_document,
        }
    }
}

// ============================================================================
// CapturedExchange
// ============================================================================

/// One complete request/response exchange, body included.
#[derive(Debug, Clone)]
pub struct CapturedExchange {
    /// Request ID.
    pub request_id: NetworkRequestId,
    /// Resolved response URL.
    pub url: String,
    /// Request method.
    pub method: String,
    /// Request headers.
    pub request_headers: Headers,
    /// Response status code.
    pub response_status: u16,
    /// Response status text.
    pub response_status_text: String,
    /// Response headers.
    pub response_headers: Headers,
    /// Decoded response body.
    pub body: Vec<u8>,
    /// Whether this is the page's top-level document.
    pub is_top_level_document: bool,
}

impl CapturedExchange {
    /// Builds the request/response record pair for this exchange.
    ///
    /// The response record's content type is the captured `Content-Type`
    /// header when present.
    #[must_use]
    pub fn to_record_pair(&self) -> ArchiveRecordPair {
        ArchiveRecordPair::new(
            self.url.clone(),
            request_message(&self.method, &self.url, &self.request_headers),
            response_message(
                self.response_status,
                &self.response_status_text,
                &self.response_headers,
                &self.body,
            ),
            self.response_headers.get_str("content-type"),
        )
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn load(status: u16, status_text: &str) -> CompletedLoad {
        CompletedLoad {
            request_id: NetworkRequestId::new("R1"),
            url: "https://example.com/app.js".to_string(),
            method: "GET".to_string(),
            request_headers: [("Accept", "*/*")].into_iter().collect(),
            status,
            status_text: status_text.to_string(),
            response_headers: [("Content-Type", "application/javascript")]
                .into_iter()
                .collect(),
            is_top_level_document: false,
        }
    }

    #[test]
    fn test_canonical_reason_fallback() {
        let exchange = load(404, "").into_exchange(Vec::new());
        assert_eq!(exchange.response_status_text, "Not Found");

        let kept = load(200, "Fine").into_exchange(Vec::new());
        assert_eq!(kept.response_status_text, "Fine");
    }

    #[test]
    fn test_record_pair() {
        let exchange = load(200, "OK").into_exchange(b"let x = 1;".to_vec());
        let pair = exchange.to_record_pair();

        assert_eq!(pair.request.target_uri.as_deref(), Some("https://example.com/app.js"));
        assert_eq!(pair.response.content_type, "application/javascript");
        assert_eq!(
            pair.request.payload,
            b"GET https://example.com/app.js HTTP/1.1\r\nAccept: */*\r\n\r\n".to_vec()
        );
        assert!(pair.response.payload.starts_with(b"HTTP/1.1 200 OK\r\n"));
        assert!(pair.response.payload.ends_with(b"\r\n\r\nlet x = 1;"));
    }
}
