//! Raw HTTP/1.1 message rendering.
//!
//! Turns browser-reported headers back into wire-form messages for request
//! and response record blocks. Rendering is pure: the same input always
//! yields the same bytes, in the header set's iteration order.
//!
//! # Format
//!
//! ```text
//! GET https://example.com/ HTTP/1.1\r\n
//! accept: text/html\r\n
//! \r\n
//! ```
//!
//! Pseudo-headers (`:method`, `:authority`, ...) are dropped. Bodies are
//! appended as-is; no transfer re-framing.

// ============================================================================
// Imports
// ============================================================================

use crate::browser::network::{HeaderValue, Headers};

// ============================================================================
// Constants
// ============================================================================

/// Prefix of HTTP/2 and HTTP/3 pseudo-headers.
pub const PSEUDO_HEADER_PREFIX: char = ':';

// ============================================================================
// Rendering
// ============================================================================

/// Renders a request line and header block.
#[must_use]
pub fn request_message(method: &str, url: &str, headers: &Headers) -> Vec<u8> {
    let mut out = format!("{method} {url} HTTP/1.1\r\n").into_bytes();
    write_headers(&mut out, headers);
    out
}

/// Renders a status line, header block and body.
#[must_use]
pub fn response_message(status: u16, reason: &str, headers: &Headers, body: &[u8]) -> Vec<u8> {
    let mut out = format!("HTTP/1.1 {status} {reason}\r\n").into_bytes();
    write_headers(&mut out, headers);
    out.extend_from_slice(body);
    out
}

/// Appends header lines and the terminating blank line.
fn write_headers(out: &mut Vec<u8>, headers: &Headers) {
    for (name, value) in headers.iter() {
        if name.starts_with(PSEUDO_HEADER_PREFIX) {
            continue;
        }

        match value {
            HeaderValue::Single(v) => push_line(out, name, v),
            HeaderValue::Multi(values) => {
                for v in values {
                    push_line(out, name, v);
                }
            }
            HeaderValue::Other(v) => push_line(out, name, &v.to_string()),
        }
    }
    out.extend_from_slice(b"\r\n");
}

fn push_line(out: &mut Vec<u8>, name: &str, value: &str) {
    out.extend_from_slice(name.as_bytes());
    out.extend_from_slice(b": ");
    out.extend_from_slice(value.as_bytes());
    out.extend_from_slice(b"\r\n");
}

// ============================================================================
// Tests
// ============================================================================
