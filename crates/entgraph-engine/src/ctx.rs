//! Execution contexts.
//!
//! A [`Ctx`] wraps one store transaction together with the schema, the
//! rules and the configuration. Every read and write goes through it;
//! nothing is held in ambient state. Contexts are handed out by
//! [`EntDb::query`](crate::EntDb::query) and
//! [`EntDb::mutation`](crate::EntDb::mutation) and live for one call.

use std::time::Duration;

use entgraph_common::types::{DocId, Document, Timestamp, Value};
use entgraph_common::utils::error::{
    CardinalityError, Error, Operation, Result, StorageError,
};
use entgraph_core::metadata::EntSchema;
use entgraph_core::storage::{IndexRange, StoreTransaction};

use crate::config::Config;
use crate::deletion::ScheduledDeletion;
use crate::ent::Ent;
use crate::query::Query;
use crate::rules::Rules;

/// One logical transaction.
pub struct Ctx<'a> {
    tx: Box<dyn StoreTransaction + 'a>,
    schema: &'a EntSchema,
    rules: &'a dyn Rules,
    config: &'a Config,
    read_only: bool,
    scheduled: Vec<(ScheduledDeletion, Duration)>,
}

impl<'a> Ctx<'a> {
    pub(crate) fn new(
        tx: Box<dyn StoreTransaction + 'a>,
        schema: &'a EntSchema,
        rules: &'a dyn Rules,
        config: &'a Config,
        read_only: bool,
    ) -> Self {
        Self {
            tx,
            schema,
            rules,
            config,
            read_only,
            scheduled: Vec::new(),
        }
    }

    /// Returns the resolved schema.
    #[must_use]
    pub fn schema(&self) -> &'a EntSchema {
        self.schema
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &'a Config {
        self.config
    }

    /// Returns the transaction's logical time.
    #[must_use]
    pub fn timestamp(&self) -> Timestamp {
        self.tx.timestamp()
    }

    /// Returns true inside [`EntDb::query`](crate::EntDb::query).
    #[must_use]
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Starts a lazy query over a table.
    #[must_use]
    pub fn table(&self, table: impl Into<String>) -> Query {
        Query::table(table)
    }

    /// Point read. Soft-deleted and unreadable entities are absent.
    pub fn get(&self, table: &str, id: DocId) -> Result<Option<Ent>> {
        Query::table(table).get(self, id)
    }

    /// Point read that fails with `NotFound` when the entity is absent, or
    /// `Unauthorized` when read rules hide it.
    pub fn get_x(&self, table: &str, id: DocId) -> Result<Ent> {
        Query::table(table).get_x(self, id)
    }

    /// Looks up the single entity whose `index` starts with `value`.
    ///
    /// Typically used with the index of a unique field, which is named after
    /// the field. More than one match is a cardinality error.
    pub fn get_by(
        &self,
        table: &str,
        index: &str,
        value: impl Into<Value>,
    ) -> Result<Option<Ent>> {
        Query::table(table)
            .with_index(index, IndexRange::all().eq(value))
            .unique(self)
    }

    pub(crate) fn rules(&self) -> &'a dyn Rules {
        self.rules
    }

    pub(crate) fn tx(&self) -> &(dyn StoreTransaction + 'a) {
        &*self.tx
    }

    pub(crate) fn tx_mut(&mut self) -> &mut (dyn StoreTransaction + 'a) {
        &mut *self.tx
    }

    pub(crate) fn ensure_writable(&self, table: &str) -> Result<()> {
        if self.read_only {
            return Err(StorageError::ReadOnly(table.to_string()).into());
        }
        Ok(())
    }

    /// Reads a document that must exist, whatever its deletion state.
    pub(crate) fn existing(&self, table: &str, id: DocId) -> Result<Document> {
        self.tx.get(table, id)?.ok_or_else(|| {
            StorageError::DocumentNotFound {
                table: table.to_string(),
                id,
            }
            .into()
        })
    }

    /// Queues a task for dispatch after commit.
    pub(crate) fn schedule(&mut self, task: ScheduledDeletion, delay: Duration) {
        self.scheduled.push((task, delay));
    }

    /// Commits and hands back the tasks to dispatch.
    pub(crate) fn commit(self) -> Result<Vec<(ScheduledDeletion, Duration)>> {
        self.tx.commit()?;
        Ok(self.scheduled)
    }

    pub(crate) fn rollback(self) {
        self.tx.rollback();
    }
}

impl std::fmt::Debug for Ctx<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ctx")
            .field("timestamp", &self.tx.timestamp())
            .field("read_only", &self.read_only)
            .field("scheduled", &self.scheduled.len())
            .finish_non_exhaustive()
    }
}

/// Outcome of a point lookup that distinguishes absence from rule denial.
#[derive(Debug)]
pub(crate) enum Lookup {
    Found(Ent),
    Hidden { table: String },
    Absent { table: String },
}

impl Lookup {
    pub(crate) fn into_option(self) -> Option<Ent> {
        match self {
            Self::Found(ent) => Some(ent),
            Self::Hidden { .. } | Self::Absent { .. } => None,
        }
    }

    pub(crate) fn require(self, detail: impl std::fmt::Display) -> Result<Ent> {
        match self {
            Self::Found(ent) => Ok(ent),
            Self::Hidden { table } => Err(Error::Unauthorized {
                table,
                operation: Operation::Read,
            }),
            Self::Absent { table } => Err(CardinalityError::not_found(table, detail).into()),
        }
    }
}
