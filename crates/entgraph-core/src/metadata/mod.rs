//! The edge metadata model.
//!
//! [`EntSchema::build`] resolves declarations into one [`TableMeta`] per
//! table: its fields, its edges as [`EdgeDescriptor`]s, the foreign keys it
//! stores, the dependents that point at it and the join tables it appears
//! in. The result is immutable and shared read-only by the engine.
//!
//! All configuration errors are raised by `build`; lookups afterwards only
//! fail for names that were never declared.

mod descriptor;
mod resolve;

use std::sync::Arc;

use entgraph_common::utils::error::ConfigError;
use indexmap::IndexMap;

use crate::schema::{DeletionPolicy, EntDef, FieldDef};
use crate::storage::{IndexDef, TableLayout};

pub use descriptor::{Dependent, EdgeDescriptor, EdgeKind, ForeignKey, JoinMembership};

/// Resolved metadata of one table.
#[derive(Debug, Clone)]
pub struct TableMeta {
    /// Table name.
    pub name: String,
    /// Declared fields plus the key fields of field edges.
    pub fields: IndexMap<String, FieldDef>,
    /// Deletion policy.
    pub deletion: DeletionPolicy,
    /// Edges by name, including the inverse names of asymmetric self edges.
    pub edges: IndexMap<String, Arc<EdgeDescriptor>>,
    /// Keys this table stores.
    pub foreign_keys: Vec<ForeignKey>,
    /// Keys elsewhere that point at this table.
    pub dependents: Vec<Dependent>,
    /// Join tables holding this table's IDs.
    pub joins: Vec<JoinMembership>,
    /// Fields whose values must be unique (declared unique fields and the
    /// field end of 1:1 edges). Each has an index named after the field.
    pub unique_fields: Vec<String>,
    /// Physical layout.
    pub layout: TableLayout,
}

impl TableMeta {
    /// Looks up an edge.
    pub fn edge(&self, name: &str) -> Result<&Arc<EdgeDescriptor>, ConfigError> {
        self.edges.get(name).ok_or_else(|| ConfigError::UnknownEdge {
            table: self.name.clone(),
            edge: name.to_string(),
        })
    }

    /// Looks up an index.
    pub fn index(&self, name: &str) -> Result<&IndexDef, ConfigError> {
        self.layout
            .index(name)
            .ok_or_else(|| ConfigError::UnknownIndex {
                table: self.name.clone(),
                index: name.to_string(),
            })
    }

    /// Returns the foreign key stored in `field`, if it is one.
    #[must_use]
    pub fn foreign_key(&self, field: &str) -> Option<&ForeignKey> {
        self.foreign_keys.iter().find(|fk| fk.field == field)
    }

    /// Returns true if `field` must be unique.
    #[must_use]
    pub fn is_unique(&self, field: &str) -> bool {
        self.unique_fields.iter().any(|f| f == field)
    }
}

/// Resolved metadata of a whole schema.
#[derive(Debug, Clone)]
pub struct EntSchema {
    tables: IndexMap<String, TableMeta>,
    join_tables: IndexMap<String, TableLayout>,
}

impl EntSchema {
    /// Resolves declarations. Every configuration error is reported here.
    pub fn build(defs: impl IntoIterator<Item = EntDef>) -> Result<Self, ConfigError> {
        let schema = resolve::resolve(defs)?;
        tracing::info!(
            tables = schema.tables.len(),
            join_tables = schema.join_tables.len(),
            "entity schema resolved"
        );
        Ok(schema)
    }

    /// Looks up a table.
    pub fn table(&self, name: &str) -> Result<&TableMeta, ConfigError> {
        self.tables
            .get(name)
            .ok_or_else(|| ConfigError::UnknownTable(name.to_string()))
    }

    /// Looks up an edge of a table.
    pub fn edge(&self, table: &str, edge: &str) -> Result<&Arc<EdgeDescriptor>, ConfigError> {
        self.table(table)?.edge(edge)
    }

    /// Iterates over entity tables in declaration order.
    pub fn tables(&self) -> impl Iterator<Item = &TableMeta> {
        self.tables.values()
    }

    /// Returns true if `name` is a generated join table.
    #[must_use]
    pub fn is_join_table(&self, name: &str) -> bool {
        self.join_tables.contains_key(name)
    }

    /// Iterates over every physical layout: entity tables, then join tables.
    pub fn layouts(&self) -> impl Iterator<Item = &TableLayout> {
        self.tables
            .values()
            .map(|t| &t.layout)
            .chain(self.join_tables.values())
    }
}
