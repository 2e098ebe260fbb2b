//! The lazy query and traversal builder.
//!
//! A [`Query`] is plain data: a source (a table, or the far ends of an
//! entity's multiple edge) plus pending operations. Building a query reads
//! nothing. Terminals take the query by value together with a [`Ctx`] and
//! run it inside that context's transaction, so a query executes at most
//! once.
//!
//! ## Execution
//!
//! | Source | Scanned index | Order |
//! |--------|---------------|-------|
//! | table | the named index, else creation order | index order |
//! | 1:many edge | far table's foreign-key index | far creation order |
//! | many:many edge | join table's index on the near field | join-row creation order |
//!
//! Filters, the soft-deletion marker and read rules are applied to every
//! scanned entity; `take` counts entities that pass them, across pages.
//!
//! - [`filter`] - Row predicates ([`Filter`])
//! - [`page`] - Pagination and mapped queries

pub mod filter;
pub mod page;

use std::ops::ControlFlow;

use entgraph_common::types::{DocId, Document};
use entgraph_common::utils::error::{CardinalityError, ConfigError, Error, Result};
use entgraph_core::metadata::EdgeKind;
use entgraph_core::storage::{CREATION_INDEX, IndexKey, IndexRange, IndexScan, Order};

use crate::ctx::{Ctx, Lookup};
use crate::ent::Ent;

pub use filter::Filter;
pub use page::{MappedQuery, Page, PageRequest};

#[derive(Debug, Clone, PartialEq)]
enum Source {
    Table(String),
    Edge {
        table: String,
        id: DocId,
        edge: String,
    },
}

/// A resolved scan: where to read and what the rows mean.
struct Plan<'s> {
    /// Table of the resulting entities.
    table: &'s str,
    /// Table actually scanned (a join table for many:many edges).
    scan_table: &'s str,
    scan: IndexScan,
    /// Join-row field holding the far ID, for many:many edges.
    join_ref: Option<&'s str>,
}

/// A lazily evaluated query.
#[derive(Debug, Clone)]
pub struct Query {
    source: Source,
    index: Option<(String, IndexRange)>,
    order: Order,
    filters: Vec<Filter>,
    limit: Option<usize>,
    include_deleted: bool,
}

impl Query {
    fn new(source: Source) -> Self {
        Self {
            source,
            index: None,
            order: Order::Asc,
            filters: Vec::new(),
            limit: None,
            include_deleted: false,
        }
    }

    /// Queries every entity of a table.
    #[must_use]
    pub fn table(table: impl Into<String>) -> Self {
        Self::new(Source::Table(table.into()))
    }

    /// Queries the far ends of a multiple edge of one entity.
    #[must_use]
    pub fn edge(table: impl Into<String>, id: DocId, edge: impl Into<String>) -> Self {
        Self::new(Source::Edge {
            table: table.into(),
            id,
            edge: edge.into(),
        })
    }

    /// Adds a filter. Filters accumulate.
    #[must_use]
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Scans a named index over `range`. Table queries only.
    #[must_use]
    pub fn with_index(mut self, index: impl Into<String>, range: IndexRange) -> Self {
        self.index = Some((index.into(), range));
        self
    }

    /// Sets the scan direction.
    #[must_use]
    pub fn order(mut self, order: Order) -> Self {
        self.order = order;
        self
    }

    /// Orders by a named index. Table queries only.
    #[must_use]
    pub fn order_by(self, order: Order, index: impl Into<String>) -> Self {
        self.with_index(index, IndexRange::all()).order(order)
    }

    /// Returns at most `n` entities.
    #[must_use]
    pub fn take(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }

    /// Includes soft-deleted entities.
    #[must_use]
    pub fn include_deleted(mut self) -> Self {
        self.include_deleted = true;
        self
    }

    /// Maps every result through `f` when the query runs.
    pub fn map<T, F>(self, f: F) -> MappedQuery<F, T>
    where
        F: FnMut(&Ctx<'_>, Ent) -> Result<T>,
    {
        MappedQuery::new(self, f)
    }

    /// Collects all results.
    pub fn collect(self, ctx: &Ctx<'_>) -> Result<Vec<Ent>> {
        let mut out = Vec::new();
        self.scan_matches(ctx, None, |_, ent| {
            out.push(ent);
            Ok(ControlFlow::Continue(()))
        })?;
        Ok(out)
    }

    /// Returns the first result.
    pub fn first(self, ctx: &Ctx<'_>) -> Result<Option<Ent>> {
        let mut first = None;
        self.scan_matches(ctx, None, |_, ent| {
            first = Some(ent);
            Ok(ControlFlow::Break(()))
        })?;
        Ok(first)
    }

    /// Returns the first result, failing with `NotFound` if there is none.
    pub fn first_x(self, ctx: &Ctx<'_>) -> Result<Ent> {
        let table = self.target_table(ctx)?.to_string();
        let detail = self.describe();
        self.first(ctx)?
            .ok_or_else(|| CardinalityError::not_found(table, detail).into())
    }

    /// Returns the only result. More than one is a `TooMany` error.
    pub fn unique(self, ctx: &Ctx<'_>) -> Result<Option<Ent>> {
        let mut found = Vec::with_capacity(2);
        self.scan_matches(ctx, None, |_, ent| {
            found.push(ent);
            Ok(if found.len() > 1 {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            })
        })?;
        if found.len() > 1 {
            let table = found[0].table().to_string();
            return Err(CardinalityError::TooMany { table }.into());
        }
        Ok(found.pop())
    }

    /// Returns the only result, failing with `NotFound` if there is none.
    pub fn unique_x(self, ctx: &Ctx<'_>) -> Result<Ent> {
        let table = self.target_table(ctx)?.to_string();
        let detail = self.describe();
        self.unique(ctx)?
            .ok_or_else(|| CardinalityError::not_found(table, detail).into())
    }

    /// Counts results.
    pub fn count(self, ctx: &Ctx<'_>) -> Result<usize> {
        let mut n = 0;
        self.scan_matches(ctx, None, |_, _| {
            n += 1;
            Ok(ControlFlow::Continue(()))
        })?;
        Ok(n)
    }

    /// Returns one page of results.
    pub fn paginate(self, ctx: &Ctx<'_>, request: PageRequest) -> Result<Page<Ent>> {
        self.paginate_with(ctx, request, Ok)
    }

    /// Returns true if the entity with `id` is among the results.
    ///
    /// For many:many edges this looks up the join table's compound index; the
    /// collection is never materialized.
    pub fn has(self, ctx: &Ctx<'_>, id: DocId) -> Result<bool> {
        Ok(matches!(self.lookup(ctx, id)?, Lookup::Found(_)))
    }

    /// Point read within the query's results.
    pub fn get(self, ctx: &Ctx<'_>, id: DocId) -> Result<Option<Ent>> {
        Ok(self.lookup(ctx, id)?.into_option())
    }

    /// Point read that fails with `NotFound` or `Unauthorized`.
    pub fn get_x(self, ctx: &Ctx<'_>, id: DocId) -> Result<Ent> {
        self.lookup(ctx, id)?.require(id)
    }

    /// Short description of what the query looked at, for error messages.
    fn describe(&self) -> String {
        let mut parts = Vec::new();
        if let Source::Edge { table, id, edge } = &self.source {
            parts.push(format!("edge `{edge}` of {id} in `{table}`"));
        }
        if let Some((index, _)) = &self.index {
            parts.push(format!("index `{index}`"));
        }
        match self.filters.len() {
            0 => {}
            1 => parts.push("1 filter".to_string()),
            n => parts.push(format!("{n} filters")),
        }
        if parts.is_empty() {
            "whole table".to_string()
        } else {
            parts.join(", ")
        }
    }

    fn target_table<'c>(&self, ctx: &Ctx<'c>) -> Result<&'c str> {
        Ok(self.plan(ctx)?.table)
    }

    /// Resolves the source against the schema.
    fn plan<'c>(&self, ctx: &Ctx<'c>) -> Result<Plan<'c>> {
        let schema = ctx.schema();
        match &self.source {
            Source::Table(table) => {
                let meta = schema.table(table)?;
                let (index, range) = match &self.index {
                    Some((name, range)) => {
                        let def = meta.index(name)?;
                        if range.constrained_fields() > def.fields.len() {
                            return Err(ConfigError::IndexNotApplicable {
                                table: table.clone(),
                                index: name.clone(),
                                reason: format!(
                                    "the range constrains {} fields, the index has {}",
                                    range.constrained_fields(),
                                    def.fields.len()
                                ),
                            }
                            .into());
                        }
                        (name.clone(), range.clone())
                    }
                    None => (CREATION_INDEX.to_string(), IndexRange::all()),
                };
                Ok(Plan {
                    table: &meta.name,
                    scan_table: &meta.name,
                    scan: IndexScan::new(index).range(range).order(self.order),
                    join_ref: None,
                })
            }
            Source::Edge { table, id, edge } => {
                let edge = schema.edge(table, edge)?;
                if let Some((index, _)) = &self.index {
                    return Err(ConfigError::IndexNotApplicable {
                        table: edge.far_table.clone(),
                        index: index.clone(),
                        reason: "edge traversals scan the edge's own index".to_string(),
                    }
                    .into());
                }
                let near = IndexRange::all().eq(*id);
                match &edge.kind {
                    EdgeKind::RefMany { ref_field, .. } => Ok(Plan {
                        table: &edge.far_table,
                        scan_table: &edge.far_table,
                        scan: IndexScan::new(ref_field.as_str())
                            .range(near)
                            .order(self.order),
                        join_ref: None,
                    }),
                    EdgeKind::Join {
                        table: join,
                        field,
                        ref_field,
                        ..
                    } => Ok(Plan {
                        table: &edge.far_table,
                        scan_table: join,
                        scan: IndexScan::new(field.as_str()).range(near).order(self.order),
                        join_ref: Some(ref_field.as_str()),
                    }),
                    EdgeKind::Field { .. } | EdgeKind::RefOne { .. } => {
                        Err(ConfigError::EdgeCardinality {
                            table: table.clone(),
                            edge: edge.name.clone(),
                            expected: "multiple",
                        }
                        .into())
                    }
                }
            }
        }
    }

    /// Feeds every admitted entity to `visit`, in scan order, starting
    /// after `after`.
    ///
    /// `take` bounds the whole result, not what follows the cursor: with a
    /// limit set, admitted entities up to the cursor count against it.
    pub(crate) fn scan_matches<F>(
        &self,
        ctx: &Ctx<'_>,
        after: Option<IndexKey>,
        mut visit: F,
    ) -> Result<()>
    where
        F: FnMut(IndexKey, Ent) -> Result<ControlFlow<()>>,
    {
        let Plan {
            table,
            scan_table,
            scan,
            join_ref,
        } = self.plan(ctx)?;
        let resume = scan.clone().after(after);
        let scan = if self.limit.is_some() { scan } else { resume.clone() };
        let mut taken = 0;

        for (key, row) in ctx.tx().scan(scan_table, &scan)? {
            let doc = match join_ref {
                None => row,
                Some(ref_field) => join_target(ctx, scan_table, &row, ref_field, table)?,
            };
            if !self.admits(ctx, table, &doc) {
                continue;
            }
            if self.limit.is_some_and(|limit| taken >= limit) {
                break;
            }
            taken += 1;
            if !resume.accepts(&key) {
                continue;
            }
            if visit(key, Ent::new(table, doc))?.is_break() {
                break;
            }
        }
        Ok(())
    }

    fn admits(&self, ctx: &Ctx<'_>, table: &str, doc: &Document) -> bool {
        (self.include_deleted || !doc.is_deleted())
            && self.filters.iter().all(|f| f.matches(doc))
            && ctx.rules().read(table, doc)
    }

    fn lookup(&self, ctx: &Ctx<'_>, id: DocId) -> Result<Lookup> {
        let table = self.target_table(ctx)?;
        let absent = || Lookup::Absent {
            table: table.to_string(),
        };
        let Some(doc) = ctx.tx().get(table, id)? else {
            return Ok(absent());
        };
        if !self.is_member(ctx, &doc)?
            || (!self.include_deleted && doc.is_deleted())
            || !self.filters.iter().all(|f| f.matches(&doc))
        {
            return Ok(absent());
        }
        if !ctx.rules().read(table, &doc) {
            return Ok(Lookup::Hidden {
                table: table.to_string(),
            });
        }
        Ok(Lookup::Found(Ent::new(table, doc)))
    }

    /// Returns true if `doc` belongs to the source collection.
    fn is_member(&self, ctx: &Ctx<'_>, doc: &Document) -> Result<bool> {
        let Source::Edge { table, id, edge } = &self.source else {
            return Ok(true);
        };
        let edge = ctx.schema().edge(table, edge)?;
        match &edge.kind {
            EdgeKind::RefMany { ref_field, .. } => Ok(doc.id_field(ref_field) == Some(*id)),
            EdgeKind::Join {
                table: join,
                field,
                ref_field,
                ..
            } => {
                let pair = IndexScan::new(format!("{field}_{ref_field}"))
                    .range(IndexRange::all().eq(*id).eq(doc.id));
                Ok(ctx.tx().scan(join, &pair)?.next().is_some())
            }
            EdgeKind::Field { .. } | EdgeKind::RefOne { .. } => Ok(false),
        }
    }
}

/// Follows a join row to its far entity.
fn join_target(
    ctx: &Ctx<'_>,
    join: &str,
    row: &Document,
    ref_field: &str,
    far: &str,
) -> Result<Document> {
    let target = row.id_field(ref_field).ok_or_else(|| {
        Error::Integrity(format!("join row {} in `{join}` has no `{ref_field}`", row.id))
    })?;
    ctx.tx().get(far, target)?.ok_or_else(|| {
        Error::Integrity(format!(
            "join row {} in `{join}` points at missing {target} in `{far}`",
            row.id
        ))
    })
}
