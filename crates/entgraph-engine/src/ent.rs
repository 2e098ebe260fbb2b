//! The entity accessor.
//!
//! An [`Ent`] is one stored document plus the name of its table. Edges are
//! resolved lazily against a [`Ctx`]: [`Ent::edge`] for single ends,
//! [`Ent::edges`] for collections.

use entgraph_common::types::{DocId, Document, Fields, Timestamp, Value};
use entgraph_common::utils::error::{ConfigError, Error, Result};
use entgraph_core::metadata::EdgeKind;
use entgraph_core::storage::{IndexRange, IndexScan};

use crate::ctx::{Ctx, Lookup};
use crate::query::Query;
use crate::writer::Changes;

/// A stored entity.
#[derive(Debug, Clone, PartialEq)]
pub struct Ent {
    table: String,
    doc: Document,
}

impl Ent {
    pub(crate) fn new(table: impl Into<String>, doc: Document) -> Self {
        Self {
            table: table.into(),
            doc,
        }
    }

    /// Table the entity belongs to.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Entity ID.
    #[must_use]
    pub fn id(&self) -> DocId {
        self.doc.id
    }

    /// Creation time.
    #[must_use]
    pub fn creation_time(&self) -> Timestamp {
        self.doc.creation_time
    }

    /// Returns a field value, including the system fields `_id` and
    /// `_creationTime`.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<Value> {
        self.doc.get(field)
    }

    /// Returns a stored field by reference.
    #[must_use]
    pub fn field(&self, field: &str) -> Option<&Value> {
        self.doc.field(field)
    }

    /// All stored fields.
    #[must_use]
    pub fn fields(&self) -> &Fields {
        &self.doc.fields
    }

    /// Soft-deletion time, if any.
    #[must_use]
    pub fn deletion_time(&self) -> Option<Timestamp> {
        self.doc.deletion_time()
    }

    /// Returns true if the entity is soft-deleted. Writers that attach new
    /// dependents should check this on the parent while a scheduled
    /// deletion may be pending.
    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.doc.is_deleted()
    }

    /// The underlying document.
    #[must_use]
    pub fn document(&self) -> &Document {
        &self.doc
    }

    /// Consumes the entity, returning its document.
    #[must_use]
    pub fn into_document(self) -> Document {
        self.doc
    }

    /// Returns a lazy reference to the far end of a single edge.
    #[must_use]
    pub fn edge(&self, name: impl Into<String>) -> EdgeRef<'_> {
        EdgeRef {
            ent: self,
            name: name.into(),
        }
    }

    /// Resolves a single edge, failing when the far entity is absent.
    pub fn edge_x(&self, ctx: &Ctx<'_>, name: &str) -> Result<Ent> {
        self.edge(name).get_x(ctx)
    }

    /// Returns a lazy query over the far ends of a multiple edge.
    #[must_use]
    pub fn edges(&self, name: impl Into<String>) -> Query {
        Query::edge(self.table.clone(), self.id(), name)
    }

    /// Patches this entity. See [`Ctx::patch`].
    pub fn patch(&self, ctx: &mut Ctx<'_>, changes: impl Into<Changes>) -> Result<()> {
        ctx.patch(&self.table, self.id(), changes)
    }

    /// Replaces this entity. See [`Ctx::replace`].
    pub fn replace(&self, ctx: &mut Ctx<'_>, changes: impl Into<Changes>) -> Result<()> {
        ctx.replace(&self.table, self.id(), changes)
    }

    /// Deletes this entity according to its table's policy.
    pub fn delete(&self, ctx: &mut Ctx<'_>) -> Result<()> {
        ctx.delete(&self.table, self.id())
    }
}

/// A lazy single-edge reference. Nothing is read until `get` or `get_x`.
#[derive(Debug, Clone)]
pub struct EdgeRef<'e> {
    ent: &'e Ent,
    name: String,
}

impl EdgeRef<'_> {
    /// Resolves the edge.
    ///
    /// A required field edge always yields an entity; a missing target is
    /// an integrity error. Optional field ends and the ref end of a 1:1
    /// edge may be absent. Soft-deleted targets are returned: deletion
    /// never makes an edge look dangling. Targets hidden by read rules are
    /// absent.
    pub fn get(&self, ctx: &Ctx<'_>) -> Result<Option<Ent>> {
        Ok(self.resolve(ctx)?.into_option())
    }

    /// Resolves the edge, failing with `NotFound` when it is absent and
    /// `Unauthorized` when read rules hide it.
    pub fn get_x(&self, ctx: &Ctx<'_>) -> Result<Ent> {
        self.resolve(ctx)?.require(format_args!(
            "edge `{}` of {} in `{}`",
            self.name,
            self.ent.id(),
            self.ent.table
        ))
    }

    fn resolve(&self, ctx: &Ctx<'_>) -> Result<Lookup> {
        let edge = ctx.schema().edge(&self.ent.table, &self.name)?;
        let far = edge.far_table.as_str();
        let id = self.ent.id();

        let doc = match &edge.kind {
            EdgeKind::Field {
                field, optional, ..
            } => match self.ent.doc.id_field(field) {
                None if *optional => None,
                None => {
                    return Err(Error::Integrity(format!(
                        "{id} in `{}` has no `{field}` for required edge `{}`",
                        self.ent.table, self.name
                    )));
                }
                Some(target) => Some(ctx.tx().get(far, target)?.ok_or_else(|| {
                    Error::Integrity(format!(
                        "edge `{}` of {id} in `{}` points at missing {target} in `{far}`",
                        self.name, self.ent.table
                    ))
                })?),
            },
            EdgeKind::RefOne { ref_field, .. } => {
                let scan = IndexScan::new(ref_field.as_str()).range(IndexRange::all().eq(id));
                let mut holders = ctx.tx().scan(far, &scan)?;
                let first = holders.next();
                if holders.next().is_some() {
                    return Err(Error::Integrity(format!(
                        "several `{far}` entities hold {id} in unique field `{ref_field}`"
                    )));
                }
                first.map(|(_, doc)| doc)
            }
            EdgeKind::RefMany { .. } | EdgeKind::Join { .. } => {
                return Err(ConfigError::EdgeCardinality {
                    table: self.ent.table.clone(),
                    edge: self.name.clone(),
                    expected: "single",
                }
                .into());
            }
        };

        Ok(match doc {
            None => Lookup::Absent {
                table: far.to_string(),
            },
            Some(doc) if !ctx.rules().read(far, &doc) => Lookup::Hidden {
                table: far.to_string(),
            },
            Some(doc) => Lookup::Found(Ent::new(far, doc)),
        })
    }
}
