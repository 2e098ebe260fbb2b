//! Document identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a stored document.
///
/// Identifiers are allocated by the store, are unique across all tables and
/// never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct DocId(u64);

impl DocId {
    /// The sentinel for "no document".
    pub const INVALID: Self = Self(u64::MAX);

    /// Creates a new document ID.
    #[inline]
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw u64 value.
    #[inline]
    #[must_use]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }

    /// Returns true unless this is [`DocId::INVALID`].
    #[inline]
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.0 != u64::MAX
    }
}

impl fmt::Display for DocId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "doc:{}", self.0)
    }
}

impl From<u64> for DocId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_doc_id_basic() {
        let id = DocId::new(42);
        assert_eq!(id.as_u64(), 42);
        assert!(id.is_valid());
        assert!(!DocId::INVALID.is_valid());
        assert_eq!(id.to_string(), "doc:42");
    }

    #[test]
    fn test_doc_id_ordering() {
        assert!(DocId::new(1) < DocId::new(2));
    }
}
