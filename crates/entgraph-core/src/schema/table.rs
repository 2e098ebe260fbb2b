//! Table ("ent") declarations.

use entgraph_common::types::Value;
use std::time::Duration;

use super::{EdgeDecl, FieldDef, FieldType};

/// How deleting an entity of a table behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeletionPolicy {
    /// Remove immediately, cascading to dependents.
    #[default]
    Hard,
    /// Set `deletionTime`; cascade across soft-cascade edges.
    Soft,
    /// Soft now, hard after `delay`.
    Scheduled {
        /// Delay before the hard-deletion pass.
        delay: Duration,
    },
}

impl DeletionPolicy {
    /// Returns true if entities of the table can carry a deletion marker.
    #[must_use]
    pub fn is_soft(&self) -> bool {
        !matches!(self, Self::Hard)
    }
}

/// A declared secondary index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexDecl {
    /// Index name, unique per table.
    pub name: String,
    /// Indexed fields, in order.
    pub fields: Vec<String>,
}

/// A table declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct EntDef {
    /// Table name.
    pub name: String,
    /// Declared fields, in declaration order.
    pub fields: Vec<FieldDef>,
    /// Declared secondary indexes.
    pub indexes: Vec<IndexDecl>,
    /// Declared edges.
    pub edges: Vec<EdgeDecl>,
    /// Deletion policy.
    pub deletion: DeletionPolicy,
}

impl EntDef {
    /// Starts a table declaration.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            indexes: Vec::new(),
            edges: Vec::new(),
            deletion: DeletionPolicy::Hard,
        }
    }

    /// Declares a field.
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, ty: FieldType) -> Self {
        self.fields.push(FieldDef::new(name, ty));
        self
    }

    /// Declares a field with a default applied on insert.
    #[must_use]
    pub fn field_with_default(
        mut self,
        name: impl Into<String>,
        ty: FieldType,
        default: impl Into<Value>,
    ) -> Self {
        let mut def = FieldDef::new(name, ty);
        def.default = Some(default.into());
        self.fields.push(def);
        self
    }

    /// Declares a unique field. An index named after the field is created.
    #[must_use]
    pub fn unique_field(mut self, name: impl Into<String>, ty: FieldType) -> Self {
        let mut def = FieldDef::new(name, ty);
        def.unique = true;
        self.fields.push(def);
        self
    }

    /// Declares a secondary index.
    #[must_use]
    pub fn index<I, S>(mut self, name: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.indexes.push(IndexDecl {
            name: name.into(),
            fields: fields.into_iter().map(Into::into).collect(),
        });
        self
    }

    /// Declares an edge.
    #[must_use]
    pub fn edge(mut self, edge: EdgeDecl) -> Self {
        self.edges.push(edge);
        self
    }

    /// Sets the deletion policy.
    #[must_use]
    pub fn deletion(mut self, policy: DeletionPolicy) -> Self {
        self.deletion = policy;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let def = EntDef::new("users")
            .field("name", FieldType::String)
            .field_with_default("role", FieldType::String, "member")
            .unique_field("email", FieldType::String)
            .index("by_name", ["name"])
            .edge(EdgeDecl::many("posts"))
            .deletion(DeletionPolicy::Soft);

        assert_eq!(def.fields.len(), 3);
        assert_eq!(def.fields[1].default, Some(Value::from("member")));
        assert!(def.fields[2].unique);
        assert_eq!(def.indexes[0].fields, vec!["name".to_string()]);
        assert!(def.deletion.is_soft());
        assert!(!DeletionPolicy::Hard.is_soft());
    }
}
