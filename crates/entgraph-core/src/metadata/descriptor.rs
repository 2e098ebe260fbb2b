//! Resolved edge descriptors.

use crate::schema::{Cardinality, EdgeDeletion};

/// How an edge is stored, dispatched once when the schema is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EdgeKind {
    /// The declaring table stores the far entity's ID in `field`.
    Field {
        /// Foreign-key field on the declaring table.
        field: String,
        /// Whether the key may be absent.
        optional: bool,
        /// Whether the key is unique (the field end of a 1:1 edge).
        unique: bool,
    },
    /// The far table stores the declaring entity's ID; at most one far
    /// entity (the ref end of a 1:1 edge).
    RefOne {
        /// Foreign-key field on the far table.
        ref_field: String,
        /// Soft-deletion propagation.
        cascade: EdgeDeletion,
    },
    /// The far table stores the declaring entity's ID; any number of far
    /// entities (the "one" end of a 1:many edge).
    RefMany {
        /// Foreign-key field on the far table.
        ref_field: String,
        /// Soft-deletion propagation.
        cascade: EdgeDeletion,
    },
    /// Rows of a join table connect the two ends.
    Join {
        /// Join table.
        table: String,
        /// Join-table field holding the declaring entity's ID.
        field: String,
        /// Join-table field holding the far entity's ID.
        ref_field: String,
        /// Self edge written in both directions.
        symmetric: bool,
    },
}

/// A fully resolved edge, as seen from the table that declares it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeDescriptor {
    /// Edge name.
    pub name: String,
    /// Declaring table.
    pub table: String,
    /// Far table.
    pub far_table: String,
    /// Storage.
    pub kind: EdgeKind,
}

impl EdgeDescriptor {
    /// Far-end cardinality.
    #[must_use]
    pub fn cardinality(&self) -> Cardinality {
        match self.kind {
            EdgeKind::Field { .. } | EdgeKind::RefOne { .. } => Cardinality::Single,
            EdgeKind::RefMany { .. } | EdgeKind::Join { .. } => Cardinality::Multiple,
        }
    }

    /// Returns the join table, for many:many edges.
    #[must_use]
    pub fn join_table(&self) -> Option<&str> {
        match &self.kind {
            EdgeKind::Join { table, .. } => Some(table),
            _ => None,
        }
    }
}

/// An entity elsewhere whose field edge points at this table. Deleting an
/// entity of this table must deal with every dependent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependent {
    /// Table holding the key.
    pub table: String,
    /// Key field.
    pub field: String,
    /// Whether the key may be absent. Optional keys are cleared on hard
    /// deletion; required keys take their entity down with them.
    pub optional: bool,
    /// Soft-deletion propagation declared on this table's ref edge.
    pub cascade: EdgeDeletion,
}

/// A join table in which this table's entities appear under `field`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JoinMembership {
    /// Join table.
    pub join_table: String,
    /// Field holding this table's IDs.
    pub field: String,
}

/// A foreign key stored on this table, validated on every write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKey {
    /// Field edge name.
    pub edge: String,
    /// Key field.
    pub field: String,
    /// Table the key points into.
    pub far_table: String,
    /// Whether the key may be absent.
    pub optional: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cardinality_by_kind() {
        let edge = EdgeDescriptor {
            name: "tags".into(),
            table: "messages".into(),
            far_table: "tags".into(),
            kind: EdgeKind::Join {
                table: "messages_to_tags".into(),
                field: "messagesId".into(),
                ref_field: "tagsId".into(),
                symmetric: false,
            },
        };
        assert_eq!(edge.cardinality(), Cardinality::Multiple);
        assert_eq!(edge.join_table(), Some("messages_to_tags"));

        let edge = EdgeDescriptor {
            kind: EdgeKind::RefOne {
                ref_field: "userId".into(),
                cascade: EdgeDeletion::None,
            },
            ..edge
        };
        assert_eq!(edge.cardinality(), Cardinality::Single);
        assert_eq!(edge.join_table(), None);
    }
}
