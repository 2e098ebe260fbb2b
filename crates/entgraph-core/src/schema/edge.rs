//! Edge declarations.
//!
//! An edge is declared from each table that wants to traverse it:
//!
//! | Declared on A | Declared on B | Result |
//! |---------------|---------------|--------|
//! | `single("b")` | `single("a").ref_side()` | 1:1, A stores `bId` |
//! | `single("b")` | `many("as")` | 1:many, A stores `bId` |
//! | `many("bs")` | `many("as")` | many:many through a join table |
//! | `many("friends").to("a")` | (self) | symmetric self edge |
//! | `many("followees").to("a").inverse("followers")` | (self) | asymmetric self edge |
//!
//! A `single` edge without `ref_side` is a *field edge*: the declaring table
//! stores the foreign key. Field edges may be declared from one side only.

/// Cardinality of the far end as seen from the declaring table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cardinality {
    /// At most one far entity.
    Single,
    /// Any number of far entities.
    Multiple,
}

/// What deleting the declaring entity does to the far entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EdgeDeletion {
    /// No soft-deletion propagation. Hard deletion still removes entities
    /// that require the deleted one.
    #[default]
    None,
    /// Soft-deleting the declaring entity soft-deletes the far entities.
    Soft,
}

/// A declared edge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeDecl {
    /// Edge name, unique per table.
    pub name: String,
    /// Far-end cardinality.
    pub cardinality: Cardinality,
    /// Far table. Defaults to `{name}s` for single edges and `name` for
    /// multiple edges.
    pub to: Option<String>,
    /// Foreign-key field on the declaring table (field edges only).
    pub field: Option<String>,
    /// Whether the far table stores the key.
    pub is_ref: bool,
    /// Foreign-key field on the far table, when it must be named.
    pub ref_field: Option<String>,
    /// Whether the foreign key may be absent (field edges only).
    pub optional: bool,
    /// Soft-deletion propagation (ref edges only).
    pub deletion: EdgeDeletion,
    /// Join table name for many:many edges.
    pub join_table: Option<String>,
    /// Inverse edge name for asymmetric self edges.
    pub inverse: Option<String>,
}

impl EdgeDecl {
    fn new(name: impl Into<String>, cardinality: Cardinality) -> Self {
        Self {
            name: name.into(),
            cardinality,
            to: None,
            field: None,
            is_ref: false,
            ref_field: None,
            optional: false,
            deletion: EdgeDeletion::None,
            join_table: None,
            inverse: None,
        }
    }

    /// Declares an edge to a single far entity.
    #[must_use]
    pub fn single(name: impl Into<String>) -> Self {
        Self::new(name, Cardinality::Single)
    }

    /// Declares an edge to many far entities.
    #[must_use]
    pub fn many(name: impl Into<String>) -> Self {
        Self::new(name, Cardinality::Multiple)
    }

    /// Sets the far table.
    #[must_use]
    pub fn to(mut self, table: impl Into<String>) -> Self {
        self.to = Some(table.into());
        self
    }

    /// Names the foreign-key field stored on the declaring table.
    #[must_use]
    pub fn field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    /// Marks the edge as stored on the far table.
    #[must_use]
    pub fn ref_side(mut self) -> Self {
        self.is_ref = true;
        self
    }

    /// Marks the edge as stored on the far table in the named field.
    #[must_use]
    pub fn ref_field(mut self, field: impl Into<String>) -> Self {
        self.is_ref = true;
        self.ref_field = Some(field.into());
        self
    }

    /// Allows the foreign key to be absent.
    #[must_use]
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Soft-deletes far entities when the declaring entity is soft-deleted.
    #[must_use]
    pub fn soft_cascade(mut self) -> Self {
        self.deletion = EdgeDeletion::Soft;
        self
    }

    /// Names the join table of a many:many edge.
    #[must_use]
    pub fn join_table(mut self, table: impl Into<String>) -> Self {
        self.join_table = Some(table.into());
        self
    }

    /// Names the inverse of an asymmetric self edge.
    #[must_use]
    pub fn inverse(mut self, name: impl Into<String>) -> Self {
        self.inverse = Some(name.into());
        self
    }

    /// Returns the far table, applying the naming default.
    #[must_use]
    pub fn far_table(&self) -> String {
        match (&self.to, self.cardinality) {
            (Some(to), _) => to.clone(),
            (None, Cardinality::Single) => format!("{}s", self.name),
            (None, Cardinality::Multiple) => self.name.clone(),
        }
    }

    /// Returns true for a `single` edge whose key lives on the declaring table.
    #[must_use]
    pub fn is_field_edge(&self) -> bool {
        self.cardinality == Cardinality::Single && !self.is_ref
    }

    /// Returns the foreign-key field of a field edge, applying the naming default.
    #[must_use]
    pub fn field_name(&self) -> String {
        self.field
            .clone()
            .unwrap_or_else(|| format!("{}Id", self.name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_naming_defaults() {
        let user = EdgeDecl::single("user");
        assert_eq!(user.far_table(), "users");
        assert_eq!(user.field_name(), "userId");
        assert!(user.is_field_edge());

        let tags = EdgeDecl::many("tags");
        assert_eq!(tags.far_table(), "tags");
        assert!(!tags.is_field_edge());

        let owner = EdgeDecl::single("owner").to("users").field("ownerId");
        assert_eq!(owner.far_table(), "users");
        assert_eq!(owner.field_name(), "ownerId");
    }

    #[test]
    fn test_ref_field_implies_ref() {
        let edge = EdgeDecl::many("posts").ref_field("authorId").soft_cascade();
        assert!(edge.is_ref);
        assert_eq!(edge.ref_field.as_deref(), Some("authorId"));
        assert_eq!(edge.deletion, EdgeDeletion::Soft);
    }
}
