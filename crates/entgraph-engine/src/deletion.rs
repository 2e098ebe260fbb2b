//! The cascading deletion engine.
//!
//! Entity states: `live -> soft-deleted | removed`, `soft-deleted ->
//! removed` (hard pass) and `soft-deleted -> live` (undelete).
//!
//! - **hard**: an explicit work-list walks dependents depth first. Entities
//!   whose required key points at the deleted one are removed before it,
//!   optional keys are cleared, join rows naming it on either side are
//!   removed, and the entity itself goes last.
//! - **soft**: `deletionTime` is set to the transaction time, and the same
//!   marker is propagated across soft-cascade edges. Join rows are kept.
//! - **scheduled**: soft now, then a hard pass for the root after the
//!   table's delay. Cascaded dependents are removed by that pass.
//!
//! A scheduled pass does at most `deletion_batch_size` writes per
//! transaction and re-enqueues itself with no delay until done. Each pass
//! starts from the root again; progress is whatever earlier passes
//! committed, so no cursor has to be carried between passes. A pass whose
//! root is gone or no longer carries the same marker does nothing.

use std::time::Duration;

use entgraph_common::types::{DocId, Document, Fields, Timestamp, Value, DELETION_TIME_FIELD};
use entgraph_common::utils::error::{Error, Result};
use entgraph_common::utils::hash::FastHashSet;
use entgraph_core::metadata::{Dependent, TableMeta};
use entgraph_core::schema::{DeletionPolicy, EdgeDeletion};
use entgraph_core::storage::{IndexRange, IndexScan};

use crate::ctx::Ctx;

/// A pending hard-deletion pass for a scheduled-deletion root.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScheduledDeletion {
    /// Root table.
    pub table: String,
    /// Root entity.
    pub id: DocId,
    /// Marker set when the root was soft-deleted. The pass only runs while
    /// the root still carries it.
    pub deletion_time: Timestamp,
}

/// What a scheduled pass did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassOutcome {
    /// The root was undeleted, re-deleted or already removed.
    Skipped,
    /// The batch budget ran out; the pass was re-enqueued.
    Partial {
        /// Writes performed by this pass.
        writes: usize,
    },
    /// The root and everything depending on it are gone.
    Completed {
        /// Writes performed by this pass.
        writes: usize,
    },
}

pub(crate) fn delete(ctx: &mut Ctx<'_>, meta: &TableMeta, root: &Document) -> Result<()> {
    match meta.deletion {
        DeletionPolicy::Hard => {
            let progress = hard_delete(ctx, &meta.name, root.id, None)?;
            tracing::debug!(
                table = %meta.name,
                id = %root.id,
                writes = progress.writes,
                "hard-deleted"
            );
        }
        DeletionPolicy::Soft => {
            soft_delete(ctx, meta, root)?;
        }
        DeletionPolicy::Scheduled { delay } => {
            if root.is_deleted() {
                return Ok(());
            }
            let deletion_time = soft_delete(ctx, meta, root)?;
            ctx.schedule(
                ScheduledDeletion {
                    table: meta.name.clone(),
                    id: root.id,
                    deletion_time,
                },
                delay,
            );
        }
    }
    Ok(())
}

/// Marks `root` and its soft-cascade dependents. Returns the marker.
fn soft_delete(ctx: &mut Ctx<'_>, meta: &TableMeta, root: &Document) -> Result<Timestamp> {
    if let Some(existing) = root.deletion_time() {
        return Ok(existing);
    }
    let marker = ctx.timestamp();
    let schema = ctx.schema();
    let mut stack = vec![(meta.name.clone(), root.id, 0)];
    let mut marked = 0usize;

    while let Some((table, id, depth)) = stack.pop() {
        check_depth(ctx, &table, depth)?;
        let Some(doc) = ctx.tx().get(&table, id)? else {
            continue;
        };
        if doc.is_deleted() {
            continue;
        }
        let mut set = Fields::new();
        set.insert(DELETION_TIME_FIELD.to_string(), Value::from(marker));
        ctx.tx_mut().patch(&table, id, set, &[])?;
        marked += 1;

        for dep in &schema.table(&table)?.dependents {
            if dep.cascade != EdgeDeletion::Soft {
                continue;
            }
            for holder in holders(ctx, dep, id)? {
                stack.push((dep.table.clone(), holder, depth + 1));
            }
        }
    }

    tracing::debug!(table = %meta.name, id = %root.id, marked, "soft-deleted");
    Ok(marker)
}

pub(crate) fn undelete(ctx: &mut Ctx<'_>, meta: &TableMeta, root: &Document) -> Result<()> {
    let Some(marker) = root.deletion_time() else {
        return Ok(());
    };
    let schema = ctx.schema();
    let mut stack = vec![(meta.name.clone(), root.id, 0)];
    let mut restored = 0usize;

    while let Some((table, id, depth)) = stack.pop() {
        check_depth(ctx, &table, depth)?;
        let Some(doc) = ctx.tx().get(&table, id)? else {
            continue;
        };
        if doc.deletion_time() != Some(marker) {
            continue;
        }
        ctx.tx_mut()
            .patch(&table, id, Fields::new(), &[DELETION_TIME_FIELD.to_string()])?;
        restored += 1;

        for dep in &schema.table(&table)?.dependents {
            if dep.cascade != EdgeDeletion::Soft {
                continue;
            }
            for holder in holders(ctx, dep, id)? {
                stack.push((dep.table.clone(), holder, depth + 1));
            }
        }
    }

    tracing::debug!(table = %meta.name, id = %root.id, restored, "undeleted");
    Ok(())
}

/// Runs one scheduled hard-deletion pass.
pub(crate) fn run_pass(ctx: &mut Ctx<'_>, task: &ScheduledDeletion) -> Result<PassOutcome> {
    let root = ctx.tx().get(&task.table, task.id)?;
    if root.and_then(|doc| doc.deletion_time()) != Some(task.deletion_time) {
        tracing::debug!(
            table = %task.table,
            id = %task.id,
            "scheduled deletion skipped: root restored or already removed"
        );
        return Ok(PassOutcome::Skipped);
    }

    let budget = ctx.config().deletion_batch_size;
    let progress = hard_delete(ctx, &task.table, task.id, Some(budget))?;
    if progress.complete {
        tracing::info!(
            table = %task.table,
            id = %task.id,
            writes = progress.writes,
            "scheduled deletion completed"
        );
        Ok(PassOutcome::Completed {
            writes: progress.writes,
        })
    } else {
        tracing::debug!(
            table = %task.table,
            id = %task.id,
            writes = progress.writes,
            "scheduled deletion batch done, re-enqueueing"
        );
        ctx.schedule(task.clone(), Duration::ZERO);
        Ok(PassOutcome::Partial {
            writes: progress.writes,
        })
    }
}

#[derive(Debug, Clone, Copy)]
struct Progress {
    writes: usize,
    complete: bool,
}

impl Progress {
    fn partial(writes: usize) -> Self {
        Self {
            writes,
            complete: false,
        }
    }
}

enum Step {
    /// Expand an entity's dependents and joins.
    Visit {
        table: String,
        id: DocId,
        depth: usize,
    },
    /// Remove an entity whose dependents were handled.
    Remove { table: String, id: DocId },
}

/// Removes `id` and everything that requires it. With a budget, stops
/// after that many writes; every committed prefix leaves no dangling
/// required key behind.
fn hard_delete(
    ctx: &mut Ctx<'_>,
    table: &str,
    id: DocId,
    budget: Option<usize>,
) -> Result<Progress> {
    let schema = ctx.schema();
    let mut stack = vec![Step::Visit {
        table: table.to_string(),
        id,
        depth: 0,
    }];
    let mut visited: FastHashSet<(String, DocId)> = FastHashSet::default();
    let mut writes = 0usize;
    // A zero budget would never make progress; every pass writes at least once.
    let budget = budget.map(|budget| budget.max(1));
    let exhausted = |writes: usize| budget.is_some_and(|budget| writes >= budget);

    while let Some(step) = stack.pop() {
        match step {
            Step::Visit { table, id, depth } => {
                if !visited.insert((table.clone(), id)) {
                    continue;
                }
                check_depth(ctx, &table, depth)?;
                if ctx.tx().get(&table, id)?.is_none() {
                    continue;
                }
                let meta = schema.table(&table)?;
                stack.push(Step::Remove {
                    table: table.clone(),
                    id,
                });

                for dep in &meta.dependents {
                    for holder in holders(ctx, dep, id)? {
                        if !dep.optional {
                            tracing::debug!(table = %dep.table, id = %holder, "cascading hard delete");
                            stack.push(Step::Visit {
                                table: dep.table.clone(),
                                id: holder,
                                depth: depth + 1,
                            });
                            continue;
                        }
                        if exhausted(writes) {
                            return Ok(Progress::partial(writes));
                        }
                        ctx.tx_mut()
                            .patch(&dep.table, holder, Fields::new(), &[dep.field.clone()])?;
                        writes += 1;
                    }
                }

                for join in &meta.joins {
                    let rows = scan_ids(ctx, &join.join_table, &join.field, id)?;
                    for row in rows {
                        if exhausted(writes) {
                            return Ok(Progress::partial(writes));
                        }
                        ctx.tx_mut().delete(&join.join_table, row)?;
                        writes += 1;
                    }
                }
            }
            Step::Remove { table, id } => {
                if exhausted(writes) {
                    return Ok(Progress::partial(writes));
                }
                if ctx.tx().get(&table, id)?.is_some() {
                    ctx.tx_mut().delete(&table, id)?;
                    writes += 1;
                }
            }
        }
    }

    Ok(Progress {
        writes,
        complete: true,
    })
}

/// IDs of the `dep.table` entities whose `dep.field` holds `id`.
fn holders(ctx: &Ctx<'_>, dep: &Dependent, id: DocId) -> Result<Vec<DocId>> {
    scan_ids(ctx, &dep.table, &dep.field, id)
}

/// IDs of the documents of `table` whose single-field index `index` equals `id`.
fn scan_ids(ctx: &Ctx<'_>, table: &str, index: &str, id: DocId) -> Result<Vec<DocId>> {
    let scan = IndexScan::new(index).range(IndexRange::all().eq(id));
    Ok(ctx
        .tx()
        .scan(table, &scan)?
        .map(|(_, doc)| doc.id)
        .collect())
}

fn check_depth(ctx: &Ctx<'_>, table: &str, depth: usize) -> Result<()> {
    match ctx.config().max_traversal_depth {
        Some(limit) if depth > limit => Err(Error::CascadeTooDeep {
            table: table.to_string(),
            limit,
        }),
        _ => Ok(()),
    }
}
