//! Network data types shared by the CDP layer and the capture engine.
//!
//! CDP delivers headers as a JSON object whose values are usually strings,
//! with repeated headers joined by `\n`. [`HeaderValue`] makes the
//! single/multi distinction explicit instead of inspecting JSON at render
//! time.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

// ============================================================================
// HeaderValue
// ============================================================================

/// A header value as observed by the browser.
#[derive(Debug, Clone, PartialEq)]
pub enum HeaderValue {
    /// One header line.
    Single(String),
    /// One header line per entry (e.g. repeated `Set-Cookie`).
    Multi(Vec<String>),
    /// Anything else; rendered through its JSON text form.
    Other(Value),
}

impl HeaderValue {
    /// Returns the first textual value, if any.
    #[must_use]
    pub fn first(&self) -> Option<&str> {
        match self {
            Self::Single(s) => Some(s.as_str()),
            Self::Multi(values) => values.first().map(String::as_str),
            Self::Other(_) => None,
        }
    }
}

impl From<&str> for HeaderValue {
    fn from(value: &str) -> Self {
        Self::Single(value.to_string())
    }
}

impl From<String> for HeaderValue {
    fn from(value: String) -> Self {
        Self::Single(value)
    }
}

impl From<Vec<String>> for HeaderValue {
    fn from(values: Vec<String>) -> Self {
        Self::Multi(values)
    }
}

impl From<Value> for HeaderValue {
    fn from(value: Value) -> Self {
        match value {
            Value::String(s) if s.contains('\n') => {
                Self::Multi(s.split('\n').map(str::to_string).collect())
            }
            Value::String(s) => Self::Single(s),
            Value::Array(items) if items.iter().all(Value::is_string) => Self::Multi(
                items
                    .into_iter()
                    .filter_map(|v| match v {
                        Value::String(s) => Some(s),
                        _ => None,
                    })
                    .collect(),
            ),
            other => Self::Other(other),
        }
    }
}

impl<'de> Deserialize<'de> for HeaderValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(Self::from)
    }
}

// ============================================================================
// Headers
// ============================================================================

/// Ordered header set. Lookups are case-insensitive.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Headers {
    entries: Vec<(String, HeaderValue)>,
}

impl Headers {
    /// Creates an empty header set.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of header names.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if there are no headers.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over `(name, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &HeaderValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Looks up a header by name, ignoring case.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&HeaderValue> {
        self.entries
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v)
    }

    /// Returns the first textual value of a header, ignoring case.
    #[must_use]
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(HeaderValue::first)
    }

    /// Sets a header, replacing any existing header with the same name.
    ///
    /// A replaced header keeps its position and original spelling.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<HeaderValue>) {
        let name = name.into();
        let value = value.into();
        match self
            .entries
            .iter_mut()
            .find(|(k, _)| k.eq_ignore_ascii_case(&name))
        {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }
}

impl<K: Into<String>, V: Into<HeaderValue>> FromIterator<(K, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Self::new();
        for (k, v) in iter {
            headers.insert(k, v);
        }
        headers
    }
}

impl<'de> Deserialize<'de> for Headers {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct HeadersVisitor;

        impl<'de> Visitor<'de> for HeadersVisitor {
            type Value = Headers;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a header object")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Headers, A::Error> {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or_default());
                while let Some((name, value)) = map.next_entry::<String, HeaderValue>()? {
                    entries.push((name, value));
                }
                Ok(Headers { entries })
            }
        }

        deserializer.deserialize_map(HeadersVisitor)
    }
}

// ============================================================================
// NetworkRequest
// ============================================================================

/// Request data from `Network.requestWillBeSent`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkRequest {
    /// Request URL (without fragment).
    pub url: String,

    /// HTTP method.
    #[serde(default)]
    pub method: String,

    /// Request headers as the page issued them.
    #[serde(default)]
    pub headers: Headers,
}

// ============================================================================
// NetworkResponse
// ============================================================================

/// Response metadata from `Network.responseReceived`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkResponse {
    /// Resolved response URL.
    pub url: String,

    /// HTTP status code.
    #[serde(default)]
    pub status: u16,

    /// HTTP status text (empty for HTTP/2).
    #[serde(default)]
    pub status_text: String,

    /// Response headers.
    #[serde(default)]
    pub headers: Headers,

    /// Wire request headers, when the browser reports them.
    #[serde(default)]
    pub request_headers: Option<Headers>,
}

// ============================================================================
// ResourceType
// ============================================================================

/// Resource type of a network load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResourceType {
    /// Top-level or frame document.
    Document,
    /// Any other resource (script, image, stylesheet, fetch, ...).
    #[default]
    Other,
}

impl<'de> Deserialize<'de> for ResourceType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(if raw == "Document" {
            Self::Document
        } else {
            Self::Other
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[test]
    fn test_newline_joined_value_is_multi() {
        let value = HeaderValue::from(json!("a=1\nb=2"));
        assert_eq!(
            value,
            HeaderValue::Multi(vec!["a=1".to_string(), "b=2".to_string()])
        );
    }

    #[test]
    fn test_string_array_is_multi() {
        let value = HeaderValue::from(json!(["x", "y"]));
        assert_eq!(value.first(), Some("x"));
        assert!(matches!(value, HeaderValue::Multi(ref v) if v.len() == 2));
    }

    #[test]
    fn test_number_is_other() {
        assert_eq!(HeaderValue::from(json!(42)), HeaderValue::Other(json!(42)));
    }

    #[test]
    fn test_headers_preserve_wire_order() {
        let headers: Headers =
            serde_json::from_str(r#"{"b": "2", "a": "1", "c": "3"}"#).expect("parse");
        let names: Vec<&str> = headers.iter().map(|(k, _)| k).collect();
        assert_eq!(names, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_headers_case_insensitive() {
        let mut headers: Headers = [("Content-Type", "text/html")].into_iter().collect();
        assert_eq!(headers.get_str("content-type"), Some("text/html"));

        headers.insert("content-TYPE", "text/plain");
        assert_eq!(headers.len(), 1);
        assert_eq!(headers.get_str("Content-Type"), Some("text/plain"));
    }

    #[test]
    fn test_response_parsing() {
        let response: NetworkResponse = serde_json::from_value(json!({
            "url": "https://example.com/",
            "status": 200,
            "statusText": "OK",
            "headers": {"content-type": "text/html"},
            "mimeType": "text/html",
            "protocol": "http/1.1"
        }))
        .expect("parse");

        assert_eq!(response.status, 200);
        assert_eq!(response.headers.get_str("Content-Type"), Some("text/html"));
        assert!(response.request_headers.is_none());
    }

    #[test]
    fn test_resource_type() {
        let doc: ResourceType = serde_json::from_value(json!("Document")).expect("parse");
        let img: ResourceType = serde_json::from_value(json!("Image")).expect("parse");
        assert_eq!(doc, ResourceType::Document);
        assert_eq!(img, ResourceType::Other);
    }
}
