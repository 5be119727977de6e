//! Request and Response message types.
//!
//! Defines the CDP message format for command requests and responses
//! between this crate and the remote browser.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::identifiers::{CdpSessionId, CommandId};

use super::Command;

// ============================================================================
// Request
// ============================================================================

/// A command request to the browser.
///
/// # Format
///
/// ```json
/// {
///   "id": 7,
///   "sessionId": "8A1F...",
///   "method": "Domain.methodName",
///   "params": { ... }
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct Request {
    /// Identifier for request/response correlation.
    pub id: CommandId,

    /// Target session; browser-level commands omit it.
    #[serde(rename = "sessionId", skip_serializing_if = "Option::is_none")]
    pub session_id: Option<CdpSessionId>,

    /// Command with method and params.
    #[serde(flatten)]
    pub command: Command,
}

impl Request {
    /// Creates a new request.
    #[inline]
    #[must_use]
    pub fn new(id: CommandId, session_id: Option<CdpSessionId>, command: Command) -> Self {
        Self {
            id,
            session_id,
            command,
        }
    }
}

// ============================================================================
// Response
// ============================================================================

/// Error object of a failed command.
#[derive(Debug, Clone, Deserialize)]
pub struct ResponseError {
    /// CDP error code.
    pub code: i64,
    /// Human-readable message.
    pub message: String,
}

/// A response from the browser.
///
/// # Format
///
/// Success:
/// ```json
/// { "id": 7, "result": { ... } }
/// ```
///
/// Error:
/// ```json
/// { "id": 7, "error": { "code": -32000, "message": "..." } }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct Response {
    /// Matches the command `id`.
    pub id: CommandId,

    /// Result data (if success).
    #[serde(default)]
    pub result: Option<Value>,

    /// Error object (if error).
    #[serde(default)]
    pub error: Option<ResponseError>,
}

impl Response {
    /// Returns `true` if this is an error response.
    #[inline]
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Extracts the result value, returning error if response was error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Cdp`] if the browser rejected the command.
    pub fn into_result(self) -> Result<Value> {
        match self.error {
            Some(err) => Err(Error::cdp(err.code, err.message)),
            None => Ok(self.result.unwrap_or(Value::Null)),
        }
    }

    /// Deserializes the result into a typed value.
    ///
    /// # Errors
    ///
    /// - [`Error::Cdp`] if the browser rejected the command
    /// - [`Error::Json`] if the result has an unexpected shape
    pub fn into_typed<T: for<'de> Deserialize<'de>>(self) -> Result<T> {
        Ok(serde_json::from_value(self.into_result()?)?)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::PageCommand;

    #[test]
    fn test_request_serialization() {
        let command = Command::Page(PageCommand::Navigate {
            url: "https://example.com".to_string(),
        });
        let request = Request::new(CommandId::new(3), Some(CdpSessionId::new("S1")), command);
        let json = serde_json::to_string(&request).expect("serialize");

        assert!(json.contains("\"id\":3"));
        assert!(json.contains("\"sessionId\":\"S1\""));
        assert!(json.contains("Page.navigate"));
    }

    #[test]
    fn test_browser_level_request_omits_session() {
        let command = Command::Page(PageCommand::Navigate {
            url: "https://example.com".to_string(),
        });
        let request = Request::new(CommandId::new(1), None, command);
        let json = serde_json::to_string(&request).expect("serialize");

        assert!(!json.contains("sessionId"));
    }

    #[test]
    fn test_success_response() {
        let response: Response =
            serde_json::from_str(r#"{"id": 5, "result": {"targetId": "T1"}}"#).expect("parse");
        assert!(!response.is_error());

        let value = response.into_result().expect("success");
        assert_eq!(value["targetId"], "T1");
    }

    #[test]
    fn test_error_response() {
        let response: Response = serde_json::from_str(
            r#"{"id": 5, "error": {"code": -32000, "message": "No resource"}}"#,
        )
        .expect("parse");
        assert!(response.is_error());

        let err = response.into_result().unwrap_err();
        assert!(matches!(err, Error::Cdp { code: -32000, .. }));
    }

    #[test]
    fn test_event_is_not_a_response() {
        let parsed = serde_json::from_str::<Response>(
            r#"{"method": "Network.loadingFinished", "params": {}}"#,
        );
        assert!(parsed.is_err());
    }
}
