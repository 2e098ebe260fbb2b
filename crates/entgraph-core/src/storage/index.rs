//! Index layouts, keys and range scans.
//!
//! Every index orders documents by its field values, then by creation time,
//! then by ID. The implicit [`CREATION_INDEX`] has no fields and therefore
//! orders by creation time alone.

use entgraph_common::types::{DocId, Document, Timestamp, Value};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::ops::Bound;

/// Name of the implicit creation-order index present on every table.
pub const CREATION_INDEX: &str = "by_creation_time";

/// A named, ordered index over document fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexDef {
    /// Index name, unique per table.
    pub name: String,
    /// Indexed fields in order.
    pub fields: Vec<String>,
}

impl IndexDef {
    /// Creates an index definition.
    #[must_use]
    pub fn new<I, S>(name: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }
}

/// Physical layout of a table: its name and indexes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableLayout {
    /// Table name.
    pub name: String,
    /// Indexes, always including [`CREATION_INDEX`] first.
    pub indexes: Vec<IndexDef>,
}

impl TableLayout {
    /// Creates a layout with only the creation-order index.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            indexes: vec![IndexDef::new(CREATION_INDEX, Vec::<String>::new())],
        }
    }

    /// Adds an index unless one with the same name exists.
    pub fn add_index(&mut self, index: IndexDef) {
        if self.index(&index.name).is_none() {
            self.indexes.push(index);
        }
    }

    /// Looks up an index by name.
    #[must_use]
    pub fn index(&self, name: &str) -> Option<&IndexDef> {
        self.indexes.iter().find(|i| i.name == name)
    }
}

/// Position of a document within an index.
///
/// Keys are also the pagination cursor: a page ends at a key, the next page
/// starts strictly after it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct IndexKey {
    /// Indexed field values; absent fields index as [`Value::Null`].
    pub values: SmallVec<[Value; 2]>,
    /// Creation time of the document.
    pub creation_time: Timestamp,
    /// The document.
    pub id: DocId,
}

impl IndexKey {
    /// Computes the key of `doc` in an index over `fields`.
    #[must_use]
    pub fn for_document(fields: &[String], doc: &Document) -> Self {
        Self {
            values: fields
                .iter()
                .map(|f| doc.get(f).unwrap_or(Value::Null))
                .collect(),
            creation_time: doc.creation_time,
            id: doc.id,
        }
    }

    /// The smallest key whose values start with `prefix`.
    #[must_use]
    pub fn lower_bound(prefix: &[Value]) -> Self {
        Self {
            values: prefix.iter().cloned().collect(),
            creation_time: Timestamp::ZERO,
            id: DocId::new(0),
        }
    }
}

/// A contiguous range of an index: equality on a prefix of the indexed
/// fields, optionally bounded on the next field.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexRange {
    eq: SmallVec<[Value; 2]>,
    lower: Bound<Value>,
    upper: Bound<Value>,
}

impl Default for IndexRange {
    fn default() -> Self {
        Self::all()
    }
}

impl IndexRange {
    /// The whole index.
    #[must_use]
    pub fn all() -> Self {
        Self {
            eq: SmallVec::new(),
            lower: Bound::Unbounded,
            upper: Bound::Unbounded,
        }
    }

    /// Adds an equality on the next indexed field.
    #[must_use]
    pub fn eq(mut self, value: impl Into<Value>) -> Self {
        self.eq.push(value.into());
        self
    }

    /// Lower bound (inclusive) on the field after the equality prefix.
    #[must_use]
    pub fn gte(mut self, value: impl Into<Value>) -> Self {
        self.lower = Bound::Included(value.into());
        self
    }

    /// Lower bound (exclusive) on the field after the equality prefix.
    #[must_use]
    pub fn gt(mut self, value: impl Into<Value>) -> Self {
        self.lower = Bound::Excluded(value.into());
        self
    }

    /// Upper bound (inclusive) on the field after the equality prefix.
    #[must_use]
    pub fn lte(mut self, value: impl Into<Value>) -> Self {
        self.upper = Bound::Included(value.into());
        self
    }

    /// Upper bound (exclusive) on the field after the equality prefix.
    #[must_use]
    pub fn lt(mut self, value: impl Into<Value>) -> Self {
        self.upper = Bound::Excluded(value.into());
        self
    }

    /// The equality prefix.
    #[must_use]
    pub fn prefix(&self) -> &[Value] {
        &self.eq
    }

    /// Number of index fields this range constrains.
    #[must_use]
    pub fn constrained_fields(&self) -> usize {
        let bounded = !matches!(
            (&self.lower, &self.upper),
            (Bound::Unbounded, Bound::Unbounded)
        );
        self.eq.len() + usize::from(bounded)
    }

    /// Returns true if indexed `values` fall inside the range.
    #[must_use]
    pub fn contains(&self, values: &[Value]) -> bool {
        if values.len() < self.eq.len() || values[..self.eq.len()] != self.eq[..] {
            return false;
        }
        if matches!(
            (&self.lower, &self.upper),
            (Bound::Unbounded, Bound::Unbounded)
        ) {
            return true;
        }
        let Some(next) = values.get(self.eq.len()) else {
            return false;
        };
        let above = match &self.lower {
            Bound::Included(v) => next >= v,
            Bound::Excluded(v) => next > v,
            Bound::Unbounded => true,
        };
        let below = match &self.upper {
            Bound::Included(v) => next <= v,
            Bound::Excluded(v) => next < v,
            Bound::Unbounded => true,
        };
        above && below
    }
}

/// Iteration direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Order {
    /// Smallest key first.
    #[default]
    Asc,
    /// Largest key first.
    Desc,
}

/// A complete scan request.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexScan {
    /// Index to read.
    pub index: String,
    /// Range within the index.
    pub range: IndexRange,
    /// Direction.
    pub order: Order,
    /// Resume strictly after this key (in scan order).
    pub after: Option<IndexKey>,
}

impl IndexScan {
    /// Scans a whole index in ascending order.
    #[must_use]
    pub fn new(index: impl Into<String>) -> Self {
        Self {
            index: index.into(),
            range: IndexRange::all(),
            order: Order::Asc,
            after: None,
        }
    }

    /// Restricts the scan to a range.
    #[must_use]
    pub fn range(mut self, range: IndexRange) -> Self {
        self.range = range;
        self
    }

    /// Sets the direction.
    #[must_use]
    pub fn order(mut self, order: Order) -> Self {
        self.order = order;
        self
    }

    /// Resumes after a key.
    #[must_use]
    pub fn after(mut self, key: Option<IndexKey>) -> Self {
        self.after = key;
        self
    }

    /// Returns true if `key` belongs to this scan's output.
    #[must_use]
    pub fn accepts(&self, key: &IndexKey) -> bool {
        if !self.range.contains(&key.values) {
            return false;
        }
        match (&self.after, self.order) {
            (None, _) => true,
            (Some(after), Order::Asc) => key > after,
            (Some(after), Order::Desc) => key < after,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(values: &[Value], ts: u64) -> IndexKey {
        IndexKey {
            values: values.iter().cloned().collect(),
            creation_time: Timestamp::from_micros(ts),
            id: DocId::new(ts),
        }
    }

    #[test]
    fn test_range_prefix_and_bounds() {
        let range = IndexRange::all().eq("a").gte(10i64).lt(20i64);
        assert!(range.contains(&[Value::from("a"), Value::Int64(10)]));
        assert!(range.contains(&[Value::from("a"), Value::Int64(19)]));
        assert!(!range.contains(&[Value::from("a"), Value::Int64(20)]));
        assert!(!range.contains(&[Value::from("b"), Value::Int64(15)]));
        assert!(!range.contains(&[Value::from("a")]));
        assert_eq!(range.constrained_fields(), 2);
    }

    #[test]
    fn test_lower_bound_sorts_before_prefix() {
        let lower = IndexKey::lower_bound(&[Value::from("a")]);
        assert!(lower <= key(&[Value::from("a")], 0));
        assert!(lower < key(&[Value::from("a"), Value::Null], 0));
        assert!(lower > key(&[Value::Null], 100));
    }

    #[test]
    fn test_scan_after() {
        let scan = IndexScan::new("idx").after(Some(key(&[Value::Int64(1)], 5)));
        assert!(!scan.accepts(&key(&[Value::Int64(1)], 5)));
        assert!(scan.accepts(&key(&[Value::Int64(1)], 6)));

        let scan = scan.order(Order::Desc);
        assert!(scan.accepts(&key(&[Value::Int64(1)], 4)));
        assert!(!scan.accepts(&key(&[Value::Int64(1)], 6)));
    }

    #[test]
    fn test_layout_always_has_creation_index() {
        let mut layout = TableLayout::new("users");
        layout.add_index(IndexDef::new("email", ["email"]));
        layout.add_index(IndexDef::new("email", ["other"]));
        assert!(layout.index(CREATION_INDEX).is_some());
        assert_eq!(layout.indexes.len(), 2);
        assert_eq!(layout.index("email").map(|i| i.fields.clone()), Some(vec!["email".to_string()]));
    }
}
