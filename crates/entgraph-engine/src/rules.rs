//! Authorization hooks.
//!
//! Rules run on user-originated operations only. Reads are filtered: an
//! unreadable entity is invisible to queries, and `get_x` reports it as
//! [`Error::Unauthorized`](entgraph_common::Error::Unauthorized). Writes
//! are checked once per root operation; cascades and scheduled passes are
//! system work and bypass rules.

use std::sync::Arc;

use entgraph_common::types::{Document, Fields};
use entgraph_common::utils::hash::FastHashMap;

/// Read and write predicates.
pub trait Rules: Send + Sync {
    /// Returns true if `doc` of `table` may be read.
    fn read(&self, table: &str, doc: &Document) -> bool {
        let _ = (table, doc);
        true
    }

    /// Returns true if the write may proceed.
    ///
    /// `prior` is absent for inserts; `changes` is absent for deletes.
    fn write(&self, table: &str, prior: Option<&Document>, changes: Option<&Fields>) -> bool {
        let _ = (table, prior, changes);
        true
    }
}

/// Rules that allow everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl Rules for AllowAll {}

type ReadRule = Arc<dyn Fn(&Document) -> bool + Send + Sync>;
type WriteRule = Arc<dyn Fn(Option<&Document>, Option<&Fields>) -> bool + Send + Sync>;

/// Per-table rules built from closures. Tables without a rule are open.
///
/// ```
/// use entgraph_common::{fields, Document, DocId, Timestamp};
/// use entgraph_engine::rules::{RuleSet, Rules};
///
/// let rules = RuleSet::new()
///     .with_read("secrets", |_| false)
///     .with_write("users", |prior, _| prior.is_none());
///
/// let doc = Document::new(DocId::new(1), Timestamp::ZERO, fields! {});
/// assert!(!rules.read("secrets", &doc));
/// assert!(rules.write("users", None, Some(&doc.fields)));
/// assert!(!rules.write("users", Some(&doc), None));
/// ```
#[derive(Clone, Default)]
pub struct RuleSet {
    read: FastHashMap<String, ReadRule>,
    write: FastHashMap<String, WriteRule>,
}

impl RuleSet {
    /// Creates an empty rule set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the read rule of a table.
    #[must_use]
    pub fn with_read<F>(mut self, table: impl Into<String>, rule: F) -> Self
    where
        F: Fn(&Document) -> bool + Send + Sync + 'static,
    {
        self.read.insert(table.into(), Arc::new(rule));
        self
    }

    /// Sets the write rule of a table.
    #[must_use]
    pub fn with_write<F>(mut self, table: impl Into<String>, rule: F) -> Self
    where
        F: Fn(Option<&Document>, Option<&Fields>) -> bool + Send + Sync + 'static,
    {
        self.write.insert(table.into(), Arc::new(rule));
        self
    }
}

impl std::fmt::Debug for RuleSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleSet")
            .field("read", &self.read.keys().collect::<Vec<_>>())
            .field("write", &self.write.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Rules for RuleSet {
    fn read(&self, table: &str, doc: &Document) -> bool {
        self.read.get(table).is_none_or(|rule| rule(doc))
    }

    fn write(&self, table: &str, prior: Option<&Document>, changes: Option<&Fields>) -> bool {
        self.write
            .get(table)
            .is_none_or(|rule| rule(prior, changes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use entgraph_common::fields;
    use entgraph_common::types::{DocId, Timestamp, Value};

    fn doc(owner: &str) -> Document {
        Document::new(DocId::new(1), Timestamp::ZERO, fields! { "owner" => owner })
    }

    #[test]
    fn test_rule_set() {
        let rules = RuleSet::new()
            .with_read("notes", |d| d.field("owner") == Some(&Value::from("me")))
            .with_write("notes", |prior, changes| prior.is_some() || changes.is_some());

        assert!(rules.read("notes", &doc("me")));
        assert!(!rules.read("notes", &doc("you")));
        assert!(rules.read("other", &doc("you")));
        assert!(!rules.write("notes", None, None));
        assert!(rules.write("notes", None, Some(&Fields::new())));
    }

    #[test]
    fn test_allow_all() {
        assert!(AllowAll.read("any", &doc("x")));
        assert!(AllowAll.write("any", None, None));
    }
}
