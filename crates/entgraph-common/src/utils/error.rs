//! Error taxonomy.
//!
//! | Kind | Raised by | Retry? |
//! |------|-----------|--------|
//! | [`ConfigError`] | schema build, unknown edge/index lookups | never |
//! | [`Error::Integrity`] | reads that find data inconsistent with the schema | never |
//! | [`ValidationError`] | writes, before anything commits | with corrected input |
//! | [`CardinalityError`] | `unique`/`first_x`/`get_x`/`edge_x` | caller decides |
//! | [`Error::Unauthorized`] | read/write rules | never |
//! | [`Error::CascadeTooDeep`] | deletion, when a depth limit is configured | never |
//! | [`StorageError`] | the document store | host's retry policy |

use std::fmt;

use thiserror::Error;

use crate::types::{DocId, Value};

/// Result type alias for Entgraph operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// The schema or a lookup against it is invalid.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Stored data contradicts the schema (e.g. a required edge is dangling).
    #[error("integrity violation: {0}")]
    Integrity(String),

    /// A write was rejected before commit.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// A query produced the wrong number of results.
    #[error(transparent)]
    Cardinality(#[from] CardinalityError),

    /// A read or write rule denied the operation.
    #[error("{operation} on `{table}` denied by rules")]
    Unauthorized {
        /// Table the operation targeted.
        table: String,
        /// The denied operation.
        operation: Operation,
    },

    /// A cascade went deeper than the configured limit.
    #[error("cascade from `{table}` exceeded the depth limit of {limit}")]
    CascadeTooDeep {
        /// Table where the limit was hit.
        table: String,
        /// Configured limit.
        limit: usize,
    },

    /// The underlying store failed.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

impl Error {
    /// Returns true for [`CardinalityError::NotFound`].
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Cardinality(CardinalityError::NotFound { .. }))
    }
}

/// Operations that rules can deny.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Reading an entity.
    Read,
    /// Inserting an entity.
    Insert,
    /// Partially updating an entity.
    Patch,
    /// Overwriting an entity.
    Replace,
    /// Deleting an entity.
    Delete,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Read => "read",
            Self::Insert => "insert",
            Self::Patch => "patch",
            Self::Replace => "replace",
            Self::Delete => "delete",
        };
        f.write_str(name)
    }
}

/// Schema and metadata errors. Detected eagerly where possible.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A table is declared twice.
    #[error("table `{0}` is declared more than once")]
    DuplicateTable(String),

    /// A referenced table is not declared.
    #[error("table `{0}` is not declared")]
    UnknownTable(String),

    /// An edge name is declared twice on one table.
    #[error("edge `{edge}` is declared more than once on `{table}`")]
    DuplicateEdge {
        /// Declaring table.
        table: String,
        /// Edge name.
        edge: String,
    },

    /// An edge name is not declared on the table.
    #[error("table `{table}` has no edge `{edge}`")]
    UnknownEdge {
        /// Table looked up.
        table: String,
        /// Edge name looked up.
        edge: String,
    },

    /// An index name is not declared on the table.
    #[error("table `{table}` has no index `{index}`")]
    UnknownIndex {
        /// Table looked up.
        table: String,
        /// Index name looked up.
        index: String,
    },

    /// An index or unique constraint names an undeclared field.
    #[error("table `{table}` has no field `{field}`")]
    UnknownField {
        /// Table looked up.
        table: String,
        /// Field name looked up.
        field: String,
    },

    /// A ref-side edge has no matching field edge on the far table.
    #[error("edge `{edge}` on `{table}` has no matching edge on `{far_table}`")]
    MissingInverse {
        /// Declaring table.
        table: String,
        /// Edge name.
        edge: String,
        /// Far table.
        far_table: String,
    },

    /// Several edges connect the same tables and this one does not name its
    /// field or join table.
    #[error(
        "edge `{edge}` on `{table}` is ambiguous: `{far_table}` has several matching edges, name the field or join table explicitly"
    )]
    AmbiguousEdge {
        /// Declaring table.
        table: String,
        /// Edge name.
        edge: String,
        /// Far table.
        far_table: String,
    },

    /// A 1:1 edge declared optional on its field end, leaving neither end required.
    #[error("1:1 edge `{edge}` on `{table}` would be optional on both ends")]
    BothEndsOptional {
        /// Declaring table.
        table: String,
        /// Edge name.
        edge: String,
    },

    /// Soft-cascade into a table that cannot hold a deletion marker.
    #[error(
        "edge `{edge}` on `{table}` soft-cascades into `{far_table}`, which does not use soft or scheduled deletion"
    )]
    SoftCascadeIntoHardTable {
        /// Declaring table.
        table: String,
        /// Edge name.
        edge: String,
        /// Far table.
        far_table: String,
    },

    /// The edge was traversed with the wrong cardinality accessor.
    #[error("edge `{edge}` on `{table}` is not a {expected} edge")]
    EdgeCardinality {
        /// Table.
        table: String,
        /// Edge name.
        edge: String,
        /// Expected cardinality ("single" or "multiple").
        expected: &'static str,
    },

    /// The index exists but cannot serve the requested traversal.
    #[error("index `{index}` on `{table}` cannot be used here: {reason}")]
    IndexNotApplicable {
        /// Table.
        table: String,
        /// Index name.
        index: String,
        /// Why it does not apply.
        reason: String,
    },

    /// A page request asked for zero items.
    #[error("page size must be at least 1")]
    ZeroPageSize,

    /// Any other malformed declaration.
    #[error("invalid declaration: {0}")]
    InvalidDeclaration(String),
}

/// Write-time validation failures.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// A required field is absent.
    #[error("`{table}.{field}` is required")]
    MissingField {
        /// Table.
        table: String,
        /// Field.
        field: String,
    },

    /// The write sets a field the table does not declare.
    #[error("`{table}` does not declare field `{field}`")]
    UnknownField {
        /// Table.
        table: String,
        /// Field.
        field: String,
    },

    /// The value has the wrong type.
    #[error("`{table}.{field}` expects {expected}, got {found}")]
    TypeMismatch {
        /// Table.
        table: String,
        /// Field.
        field: String,
        /// Expected validator description.
        expected: String,
        /// Kind of the supplied value.
        found: &'static str,
    },

    /// Another entity already holds this unique value.
    #[error("`{table}.{field}` = {value} is already taken by {existing}")]
    UniqueViolation {
        /// Table.
        table: String,
        /// Field.
        field: String,
        /// The conflicting value.
        value: Value,
        /// The entity holding it.
        existing: DocId,
    },

    /// A reference points at no entity of the target table.
    #[error("`{table}.{field}` references {id}, which does not exist in `{target_table}`")]
    DanglingReference {
        /// Table.
        table: String,
        /// Field (or edge name for many:many).
        field: String,
        /// Table the reference must point into.
        target_table: String,
        /// The missing ID.
        id: DocId,
    },

    /// The write tries to modify a field the layer maintains itself.
    #[error("`{table}.{field}` cannot be written directly")]
    ReadOnlyField {
        /// Table.
        table: String,
        /// Field.
        field: String,
    },
}

/// Wrong number of results.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CardinalityError {
    /// Expected exactly one result, got none.
    #[error("no matching entity in `{table}`{detail}")]
    NotFound {
        /// Table queried.
        table: String,
        /// Extra context (prefixed with a separator).
        detail: String,
    },

    /// Expected at most one result, got more.
    #[error("expected at most one entity in `{table}`, found more")]
    TooMany {
        /// Table queried.
        table: String,
    },
}

impl CardinalityError {
    /// Builds a [`CardinalityError::NotFound`] with optional context.
    #[must_use]
    pub fn not_found(table: impl Into<String>, detail: impl fmt::Display) -> Self {
        let detail = detail.to_string();
        Self::NotFound {
            table: table.into(),
            detail: if detail.is_empty() {
                detail
            } else {
                format!(": {detail}")
            },
        }
    }
}

/// Errors reported by a document store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// The table was never defined on the store.
    #[error("table not found: {0}")]
    TableNotFound(String),

    /// The index was never defined on the table.
    #[error("index `{index}` not found on `{table}`")]
    IndexNotFound {
        /// Table.
        table: String,
        /// Index.
        index: String,
    },

    /// Patch/replace/delete of a missing document.
    #[error("document {id} not found in `{table}`")]
    DocumentNotFound {
        /// Table.
        table: String,
        /// Document.
        id: DocId,
    },

    /// A write was attempted inside a read-only transaction.
    #[error("write to `{0}` in a read-only transaction")]
    ReadOnly(String),

    /// Transaction-level failure (contention, timeout, aborted).
    #[error("transaction error: {0}")]
    Transaction(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::from(ValidationError::UniqueViolation {
            table: "users".to_string(),
            field: "email".to_string(),
            value: Value::from("a@b.c"),
            existing: DocId::new(4),
        });
        assert_eq!(
            err.to_string(),
            "validation failed: `users.email` = \"a@b.c\" is already taken by doc:4"
        );

        let err = Error::Unauthorized {
            table: "posts".to_string(),
            operation: Operation::Delete,
        };
        assert_eq!(err.to_string(), "delete on `posts` denied by rules");
    }

    #[test]
    fn test_not_found_detail() {
        let err = Error::from(CardinalityError::not_found("users", ""));
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "no matching entity in `users`");

        let err = CardinalityError::not_found("users", "email = \"x\"");
        assert_eq!(err.to_string(), "no matching entity in `users`: email = \"x\"");
    }
}
