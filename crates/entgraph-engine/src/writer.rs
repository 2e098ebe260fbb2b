//! The invariant enforcement layer.
//!
//! Every user write runs through here, inside the caller's transaction:
//!
//! 1. defaults, required fields, value types and undeclared fields
//! 2. unique fields (including the field end of 1:1 edges)
//! 3. ID-valued fields must point at an existing entity of their table
//! 4. the table's write rule
//! 5. the store write, then many:many edge changes
//!
//! Any error leaves the transaction to be rolled back by the caller.

use entgraph_common::types::{DocId, Document, Fields, Value, DELETION_TIME_FIELD};
use entgraph_common::utils::error::{
    ConfigError, Error, Operation, Result, ValidationError,
};
use entgraph_core::metadata::{EdgeKind, TableMeta};
use entgraph_core::schema::FieldType;
use entgraph_core::storage::{IndexRange, IndexScan};

use crate::ctx::Ctx;
use crate::deletion;

/// A change to a many:many edge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EdgeChange {
    /// Connect to these entities. Existing connections are kept as is.
    Add(Vec<DocId>),
    /// Disconnect from these entities.
    Remove(Vec<DocId>),
    /// Connect to exactly these entities.
    Replace(Vec<DocId>),
}

/// Field and edge changes for one write.
///
/// Setting a field to [`Value::Null`] removes it. Plain [`Fields`] convert
/// into `Changes` directly.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Changes {
    set: Fields,
    unset: Vec<String>,
    edges: Vec<(String, EdgeChange)>,
}

impl Changes {
    /// Creates an empty change set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a field.
    #[must_use]
    pub fn set(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set.insert(field.into(), value.into());
        self
    }

    /// Removes a field (patch only).
    #[must_use]
    pub fn unset(mut self, field: impl Into<String>) -> Self {
        self.unset.push(field.into());
        self
    }

    /// Connects a many:many edge to `ids`.
    #[must_use]
    pub fn add_edges(mut self, edge: impl Into<String>, ids: impl IntoIterator<Item = DocId>) -> Self {
        self.edges
            .push((edge.into(), EdgeChange::Add(ids.into_iter().collect())));
        self
    }

    /// Disconnects a many:many edge from `ids`.
    #[must_use]
    pub fn remove_edges(
        mut self,
        edge: impl Into<String>,
        ids: impl IntoIterator<Item = DocId>,
    ) -> Self {
        self.edges
            .push((edge.into(), EdgeChange::Remove(ids.into_iter().collect())));
        self
    }

    /// Sets the far ends of a many:many edge to exactly `ids`.
    #[must_use]
    pub fn replace_edges(
        mut self,
        edge: impl Into<String>,
        ids: impl IntoIterator<Item = DocId>,
    ) -> Self {
        self.edges
            .push((edge.into(), EdgeChange::Replace(ids.into_iter().collect())));
        self
    }

    /// Fields to set.
    #[must_use]
    pub fn fields(&self) -> &Fields {
        &self.set
    }
}

impl From<Fields> for Changes {
    fn from(set: Fields) -> Self {
        Self {
            set,
            ..Self::default()
        }
    }
}

/// One side of a join, as seen from the entity being written.
struct Link<'m> {
    table: &'m str,
    edge: &'m str,
    far_table: &'m str,
    join: &'m str,
    field: &'m str,
    ref_field: &'m str,
    symmetric: bool,
}

impl Ctx<'_> {
    /// Inserts an entity and returns its ID.
    pub fn insert(&mut self, table: &str, changes: impl Into<Changes>) -> Result<DocId> {
        self.ensure_writable(table)?;
        let changes = changes.into();
        let meta = self.schema().table(table)?;

        let fields = complete_fields(meta, changes.set)?;
        self.check_unique(meta, &fields, None)?;
        self.check_references(meta, &fields)?;
        self.check_write(table, None, Some(&fields), Operation::Insert)?;

        let id = self.tx_mut().insert(table, fields)?;
        self.apply_edge_changes(meta, id, &changes.edges)?;
        Ok(id)
    }

    /// Inserts several entities atomically.
    pub fn insert_many<I, C>(&mut self, table: &str, items: I) -> Result<Vec<DocId>>
    where
        I: IntoIterator<Item = C>,
        C: Into<Changes>,
    {
        items
            .into_iter()
            .map(|changes| self.insert(table, changes))
            .collect()
    }

    /// Merges `changes` into an entity. Fields not mentioned are kept.
    pub fn patch(&mut self, table: &str, id: DocId, changes: impl Into<Changes>) -> Result<()> {
        self.ensure_writable(table)?;
        let changes = changes.into();
        let meta = self.schema().table(table)?;
        let prior = self.existing(table, id)?;

        check_fields(meta, &changes.set)?;
        let mut set = Fields::new();
        let mut unset = Vec::new();
        for (name, value) in changes.set {
            if value.is_null() {
                unset.push(name);
            } else {
                set.insert(name, value);
            }
        }
        for name in changes.unset {
            check_writable_field(meta, &name)?;
            unset.push(name);
        }

        let mut merged = prior.fields.clone();
        for name in &unset {
            merged.remove(name);
        }
        merged.extend(set.clone());
        check_required(meta, &merged)?;

        self.check_unique(meta, &set, Some(id))?;
        self.check_references(meta, &set)?;
        let mut visible = set.clone();
        visible.extend(unset.iter().map(|name| (name.clone(), Value::Null)));
        self.check_write(table, Some(&prior), Some(&visible), Operation::Patch)?;

        self.tx_mut().patch(table, id, set, &unset)?;
        self.apply_edge_changes(meta, id, &changes.edges)?;
        Ok(())
    }

    /// Overwrites every field of an entity. Defaults apply as on insert;
    /// the soft-deletion marker is kept.
    pub fn replace(&mut self, table: &str, id: DocId, changes: impl Into<Changes>) -> Result<()> {
        self.ensure_writable(table)?;
        let changes = changes.into();
        let meta = self.schema().table(table)?;
        let prior = self.existing(table, id)?;

        let mut fields = complete_fields(meta, changes.set)?;
        self.check_unique(meta, &fields, Some(id))?;
        self.check_references(meta, &fields)?;
        self.check_write(table, Some(&prior), Some(&fields), Operation::Replace)?;

        if let Some(marker) = prior.fields.get(DELETION_TIME_FIELD) {
            fields.insert(DELETION_TIME_FIELD.to_string(), marker.clone());
        }
        self.tx_mut().replace(table, id, fields)?;
        self.apply_edge_changes(meta, id, &changes.edges)?;
        Ok(())
    }

    /// Deletes an entity according to its table's deletion policy.
    pub fn delete(&mut self, table: &str, id: DocId) -> Result<()> {
        self.ensure_writable(table)?;
        let meta = self.schema().table(table)?;
        let prior = self.existing(table, id)?;
        self.check_write(table, Some(&prior), None, Operation::Delete)?;
        deletion::delete(self, meta, &prior)
    }

    /// Clears the soft-deletion marker of an entity and of the dependents
    /// soft-deleted together with it. A pending scheduled pass for the
    /// entity becomes a no-op.
    pub fn undelete(&mut self, table: &str, id: DocId) -> Result<()> {
        self.ensure_writable(table)?;
        let meta = self.schema().table(table)?;
        let prior = self.existing(table, id)?;
        if !prior.is_deleted() {
            return Ok(());
        }
        let mut visible = Fields::new();
        visible.insert(DELETION_TIME_FIELD.to_string(), Value::Null);
        self.check_write(table, Some(&prior), Some(&visible), Operation::Patch)?;
        deletion::undelete(self, meta, &prior)
    }

    fn check_write(
        &self,
        table: &str,
        prior: Option<&Document>,
        changes: Option<&Fields>,
        operation: Operation,
    ) -> Result<()> {
        if self.rules().write(table, prior, changes) {
            Ok(())
        } else {
            Err(Error::Unauthorized {
                table: table.to_string(),
                operation,
            })
        }
    }

    /// Fails if another entity holds any of the unique values in `fields`.
    /// Soft-deleted entities still hold their values.
    fn check_unique(&self, meta: &TableMeta, fields: &Fields, own: Option<DocId>) -> Result<()> {
        for field in &meta.unique_fields {
            let Some(value) = fields.get(field) else {
                continue;
            };
            let scan =
                IndexScan::new(field.as_str()).range(IndexRange::all().eq(value.clone()));
            let holder = self
                .tx()
                .scan(&meta.name, &scan)?
                .map(|(_, doc)| doc.id)
                .find(|holder| Some(*holder) != own);
            if let Some(existing) = holder {
                return Err(ValidationError::UniqueViolation {
                    table: meta.name.clone(),
                    field: field.clone(),
                    value: value.clone(),
                    existing,
                }
                .into());
            }
        }
        Ok(())
    }

    /// Fails if an ID-valued field points at no entity of its table.
    fn check_references(&self, meta: &TableMeta, fields: &Fields) -> Result<()> {
        for (name, value) in fields {
            let Some(def) = meta.fields.get(name) else {
                continue;
            };
            let Some(target) = id_target(&def.ty) else {
                continue;
            };
            let ids: Vec<DocId> = match value {
                Value::Id(id) => vec![*id],
                Value::Array(items) => items.iter().filter_map(Value::as_id).collect(),
                _ => Vec::new(),
            };
            for id in ids {
                if self.tx().get(target, id)?.is_none() {
                    return Err(ValidationError::DanglingReference {
                        table: meta.name.clone(),
                        field: name.clone(),
                        target_table: target.to_string(),
                        id,
                    }
                    .into());
                }
            }
        }
        Ok(())
    }

    fn apply_edge_changes(
        &mut self,
        meta: &TableMeta,
        id: DocId,
        changes: &[(String, EdgeChange)],
    ) -> Result<()> {
        for (name, change) in changes {
            let edge = meta.edge(name)?;
            let EdgeKind::Join {
                table: join,
                field,
                ref_field,
                symmetric,
            } = &edge.kind
            else {
                return Err(ConfigError::EdgeCardinality {
                    table: meta.name.clone(),
                    edge: name.clone(),
                    expected: "many:many",
                }
                .into());
            };
            let link = Link {
                table: &meta.name,
                edge: name,
                far_table: &edge.far_table,
                join,
                field,
                ref_field,
                symmetric: *symmetric,
            };

            match change {
                EdgeChange::Add(ids) => {
                    for far in ids {
                        self.connect(&link, id, *far)?;
                    }
                }
                EdgeChange::Remove(ids) => {
                    for far in ids {
                        self.disconnect(&link, id, *far)?;
                    }
                }
                EdgeChange::Replace(ids) => {
                    let current = self.connected(&link, id)?;
                    for far in current.iter().filter(|far| !ids.contains(far)) {
                        self.disconnect(&link, id, *far)?;
                    }
                    for far in ids.iter().filter(|far| !current.contains(far)) {
                        self.connect(&link, id, *far)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn connect(&mut self, link: &Link<'_>, id: DocId, far: DocId) -> Result<()> {
        if self.tx().get(link.far_table, far)?.is_none() {
            return Err(ValidationError::DanglingReference {
                table: link.table.to_string(),
                field: link.edge.to_string(),
                target_table: link.far_table.to_string(),
                id: far,
            }
            .into());
        }
        self.insert_join_row(link, id, far)?;
        if link.symmetric && far != id {
            self.insert_join_row(link, far, id)?;
        }
        Ok(())
    }

    fn disconnect(&mut self, link: &Link<'_>, id: DocId, far: DocId) -> Result<()> {
        let mut rows = self.join_rows(link, id, far)?;
        if link.symmetric && far != id {
            rows.extend(self.join_rows(link, far, id)?);
        }
        for row in rows {
            self.tx_mut().delete(link.join, row)?;
        }
        Ok(())
    }

    fn insert_join_row(&mut self, link: &Link<'_>, near: DocId, far: DocId) -> Result<()> {
        if !self.join_rows(link, near, far)?.is_empty() {
            return Ok(());
        }
        let mut row = Fields::new();
        row.insert(link.field.to_string(), Value::Id(near));
        row.insert(link.ref_field.to_string(), Value::Id(far));
        self.tx_mut().insert(link.join, row)?;
        Ok(())
    }

    /// Join rows connecting `near` to `far`, via the compound index.
    fn join_rows(&self, link: &Link<'_>, near: DocId, far: DocId) -> Result<Vec<DocId>> {
        let scan = IndexScan::new(format!("{}_{}", link.field, link.ref_field))
            .range(IndexRange::all().eq(near).eq(far));
        Ok(self
            .tx()
            .scan(link.join, &scan)?
            .map(|(_, row)| row.id)
            .collect())
    }

    /// Far IDs currently connected to `id`.
    fn connected(&self, link: &Link<'_>, id: DocId) -> Result<Vec<DocId>> {
        let scan = IndexScan::new(link.field).range(IndexRange::all().eq(id));
        Ok(self
            .tx()
            .scan(link.join, &scan)?
            .filter_map(|(_, row)| row.id_field(link.ref_field))
            .collect())
    }
}

/// Returns the table an ID-valued field points into.
fn id_target(ty: &FieldType) -> Option<&str> {
    match ty {
        FieldType::Id(table) => Some(table),
        FieldType::Optional(inner) | FieldType::Array(inner) => id_target(inner),
        _ => None,
    }
}

fn check_writable_field(
    meta: &TableMeta,
    name: &str,
) -> std::result::Result<(), ValidationError> {
    if name.starts_with('_') || name == DELETION_TIME_FIELD {
        return Err(ValidationError::ReadOnlyField {
            table: meta.name.clone(),
            field: name.to_string(),
        });
    }
    if !meta.fields.contains_key(name) {
        return Err(ValidationError::UnknownField {
            table: meta.name.clone(),
            field: name.to_string(),
        });
    }
    Ok(())
}

/// Rejects system and undeclared fields and mistyped values. Null passes:
/// it means "absent".
fn check_fields(meta: &TableMeta, fields: &Fields) -> std::result::Result<(), ValidationError> {
    for (name, value) in fields {
        check_writable_field(meta, name)?;
        let ty = &meta.fields[name.as_str()].ty;
        if !value.is_null() && !ty.accepts(value) {
            return Err(ValidationError::TypeMismatch {
                table: meta.name.clone(),
                field: name.clone(),
                expected: ty.to_string(),
                found: value.type_name(),
            });
        }
    }
    Ok(())
}

fn check_required(meta: &TableMeta, fields: &Fields) -> std::result::Result<(), ValidationError> {
    for def in meta.fields.values() {
        if !def.ty.is_optional() && !fields.contains_key(&def.name) {
            return Err(ValidationError::MissingField {
                table: meta.name.clone(),
                field: def.name.clone(),
            });
        }
    }
    Ok(())
}

/// Validates a complete field set and fills in defaults.
fn complete_fields(meta: &TableMeta, set: Fields) -> std::result::Result<Fields, ValidationError> {
    check_fields(meta, &set)?;
    let mut fields: Fields = set.into_iter().filter(|(_, v)| !v.is_null()).collect();
    for def in meta.fields.values() {
        if let Some(default) = &def.default {
            fields
                .entry(def.name.clone())
                .or_insert_with(|| default.clone());
        }
    }
    check_required(meta, &fields)?;
    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use entgraph_common::fields;
    use entgraph_core::schema::{EdgeDecl, EntDef};
    use entgraph_core::EntSchema;

    fn schema() -> EntSchema {
        EntSchema::build(vec![
            EntDef::new("users")
                .field("name", FieldType::String)
                .field_with_default("role", FieldType::String, "member")
                .field("age", FieldType::optional(FieldType::Int64))
                .edge(EdgeDecl::many("posts")),
            EntDef::new("posts")
                .field("title", FieldType::String)
                .edge(EdgeDecl::single("user")),
        ])
        .unwrap()
    }

    #[test]
    fn test_complete_fields_applies_defaults() {
        let schema = schema();
        let users = schema.table("users").unwrap();
        let fields = complete_fields(users, fields! { "name" => "Ada", "age" => Value::Null })
            .unwrap();
        assert_eq!(fields["role"], Value::from("member"));
        assert!(!fields.contains_key("age"));
    }

    #[test]
    fn test_field_validation() {
        let schema = schema();
        let users = schema.table("users").unwrap();

        let err = complete_fields(users, fields! { "role" => "admin" }).unwrap_err();
        assert!(matches!(err, ValidationError::MissingField { ref field, .. } if field == "name"));

        let err = complete_fields(users, fields! { "name" => 3 }).unwrap_err();
        assert!(matches!(err, ValidationError::TypeMismatch { found: "int64", .. }));

        let err = complete_fields(users, fields! { "name" => "x", "nick" => "y" }).unwrap_err();
        assert!(matches!(err, ValidationError::UnknownField { .. }));

        let err = complete_fields(users, fields! { "name" => "x", "_id" => 1 }).unwrap_err();
        assert!(matches!(err, ValidationError::ReadOnlyField { .. }));

        let err = complete_fields(users, fields! { "name" => "x", DELETION_TIME_FIELD => 1 })
            .unwrap_err();
        assert!(matches!(err, ValidationError::ReadOnlyField { .. }));
    }

    #[test]
    fn test_foreign_key_is_a_declared_field() {
        let schema = schema();
        let posts = schema.table("posts").unwrap();
        let err = complete_fields(posts, fields! { "title" => "t" }).unwrap_err();
        assert!(matches!(err, ValidationError::MissingField { ref field, .. } if field == "userId"));
        assert_eq!(id_target(&posts.fields["userId"].ty), Some("users"));
    }

    #[test]
    fn test_changes_builder() {
        let changes = Changes::from(fields! { "name" => "Ada" })
            .set("age", 3)
            .unset("role")
            .add_edges("friends", [DocId::new(1)]);
        assert_eq!(changes.fields().len(), 2);
        assert_eq!(changes.unset, vec!["role".to_string()]);
        assert_eq!(
            changes.edges,
            vec![("friends".to_string(), EdgeChange::Add(vec![DocId::new(1)]))]
        );
    }
}
