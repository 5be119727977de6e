//! Type-safe identifiers.
//!
//! Newtype wrappers keep CDP identifiers and archive record identifiers from
//! being mixed up at compile time.
//!
//! | Type | Source |
//! |------|--------|
//! | [`CommandId`] | Local counter correlating CDP commands to responses |
//! | [`CdpSessionId`] | `Target.attachToTarget` (flattened session) |
//! | [`TargetId`] | `Target.createTarget` |
//! | [`BrowserContextId`] | `Target.createBrowserContext` |
//! | [`NetworkRequestId`] | `Network.*` events |
//! | [`LoaderId`] | `Network.*` events, `Page.navigate` |
//! | [`RecordId`] | Generated `<urn:uuid:...>` WARC record id |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// CommandId
// ============================================================================

/// Identifier of a CDP command on one connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommandId(u64);

impl CommandId {
    /// Wraps a raw command id.
    #[inline]
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw id.
    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Monotonic source of [`CommandId`]s, starting at 1.
#[derive(Debug)]
pub struct CommandIdSequence(AtomicU64);

impl CommandIdSequence {
    /// Creates a sequence whose first id is 1.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self(AtomicU64::new(1))
    }

    /// Returns the next id.
    #[inline]
    pub fn next_id(&self) -> CommandId {
        CommandId(self.0.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for CommandIdSequence {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// String Identifiers
// ============================================================================

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wraps a raw identifier.
            #[inline]
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Returns the identifier as a string slice.
            #[inline]
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }
    };
}

string_id!(
    /// Flattened CDP session attached to one target.
    CdpSessionId
);

string_id!(
    /// CDP target (page) identifier.
    TargetId
);

string_id!(
    /// Isolated browser context identifier.
    BrowserContextId
);

string_id!(
    /// Network request identifier. Stable across redirect hops of one request.
    NetworkRequestId
);

string_id!(
    /// Loader identifier shared by every request of one navigation.
    LoaderId
);

// ============================================================================
// RecordId
// ============================================================================

/// WARC record identifier in `<urn:uuid:...>` form.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordId(Uuid);

impl RecordId {
    /// Generates a new random record id.
    #[inline]
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<urn:uuid:{}>", self.0)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_id_sequence() {
        let seq = CommandIdSequence::new();
        assert_eq!(seq.next_id(), CommandId::new(1));
        assert_eq!(seq.next_id(), CommandId::new(2));
    }

    #[test]
    fn test_record_id_format() {
        let id = RecordId::generate().to_string();
        assert!(id.starts_with("<urn:uuid:"));
        assert!(id.ends_with('>'));
        assert_eq!(id.len(), "<urn:uuid:>".len() + 36);
    }

    #[test]
    fn test_record_ids_unique() {
        assert_ne!(RecordId::generate(), RecordId::generate());
    }

    #[test]
    fn test_string_id_serde() {
        let id: NetworkRequestId = serde_json::from_str("\"1000.12\"").expect("parse");
        assert_eq!(id.as_str(), "1000.12");
        assert_eq!(serde_json::to_string(&id).expect("serialize"), "\"1000.12\"");
    }
}
