//! Stored documents.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{DocId, Timestamp, Value};

/// Field map of a document, ordered by field name.
pub type Fields = BTreeMap<String, Value>;

/// System field holding the document ID (addressable in filters).
pub const ID_FIELD: &str = "_id";

/// System field holding the creation time (addressable in filters).
pub const CREATION_TIME_FIELD: &str = "_creationTime";

/// Field marking a soft-deleted entity. Absent means live.
pub const DELETION_TIME_FIELD: &str = "deletionTime";

/// Builds a [`Fields`] map from `name => value` pairs.
///
/// ```
/// use entgraph_common::fields;
/// use entgraph_common::types::Value;
///
/// let f = fields! { "name" => "Alice", "age" => 30 };
/// assert_eq!(f["age"], Value::Int64(30));
/// ```
#[macro_export]
macro_rules! fields {
    () => {
        $crate::types::Fields::new()
    };
    ($($name:expr => $value:expr),+ $(,)?) => {{
        let mut fields = $crate::types::Fields::new();
        $(
            fields.insert(::std::string::String::from($name), $crate::types::Value::from($value));
        )+
        fields
    }};
}

/// A document as persisted by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Immutable identifier.
    pub id: DocId,
    /// Time the document was inserted; strictly increasing per store.
    pub creation_time: Timestamp,
    /// User and system fields.
    pub fields: Fields,
}

impl Document {
    /// Creates a document.
    #[must_use]
    pub fn new(id: DocId, creation_time: Timestamp, fields: Fields) -> Self {
        Self {
            id,
            creation_time,
            fields,
        }
    }

    /// Returns a field value. System fields `_id` and `_creationTime`
    /// resolve to the identifier and the creation time.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<Value> {
        match field {
            ID_FIELD => Some(Value::Id(self.id)),
            CREATION_TIME_FIELD => Some(Value::from(self.creation_time)),
            _ => self.fields.get(field).cloned(),
        }
    }

    /// Returns a reference to a stored (non-system) field.
    #[must_use]
    pub fn field(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Returns the ID stored in `field`, if any.
    #[must_use]
    pub fn id_field(&self, field: &str) -> Option<DocId> {
        self.fields.get(field).and_then(Value::as_id)
    }

    /// Returns the soft-deletion time, if the document is soft-deleted.
    #[must_use]
    pub fn deletion_time(&self) -> Option<Timestamp> {
        self.fields
            .get(DELETION_TIME_FIELD)
            .and_then(Value::as_timestamp)
    }

    /// Returns true if the document carries a deletion marker.
    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.deletion_time().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_fields() {
        let mut fields = Fields::new();
        fields.insert("name".to_string(), Value::from("Alice"));
        let doc = Document::new(DocId::new(3), Timestamp::from_micros(9), fields);

        assert_eq!(doc.get(ID_FIELD), Some(Value::Id(DocId::new(3))));
        assert_eq!(doc.get(CREATION_TIME_FIELD), Some(Value::Int64(9)));
        assert_eq!(doc.get("name"), Some(Value::from("Alice")));
        assert!(doc.get("missing").is_none());
        assert!(!doc.is_deleted());
    }

    #[test]
    fn test_fields_macro() {
        let f = fields! { "name" => "Bob", "active" => true };
        assert_eq!(f.len(), 2);
        assert_eq!(f["active"], Value::Bool(true));
        assert!(fields! {}.is_empty());
    }

    #[test]
    fn test_deletion_marker() {
        let mut fields = Fields::new();
        fields.insert(DELETION_TIME_FIELD.to_string(), Value::Int64(100));
        let doc = Document::new(DocId::new(1), Timestamp::ZERO, fields);
        assert!(doc.is_deleted());
        assert_eq!(doc.deletion_time(), Some(Timestamp::from_micros(100)));
    }
}
