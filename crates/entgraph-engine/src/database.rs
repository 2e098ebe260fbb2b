//! EntDb main database struct.

use std::sync::Arc;
use std::time::Duration;

use entgraph_common::utils::error::Result;
use entgraph_core::metadata::EntSchema;
use entgraph_core::storage::{DocumentStore, MemoryStore};

use crate::config::Config;
use crate::ctx::Ctx;
use crate::deletion::{self, PassOutcome, ScheduledDeletion};
use crate::rules::{AllowAll, Rules};
use crate::scheduler::Scheduler;

/// An entity database: a resolved schema over a document store.
pub struct EntDb {
    /// Resolved schema.
    schema: Arc<EntSchema>,
    /// The underlying document store.
    store: Arc<dyn DocumentStore>,
    /// Receives hard-deletion passes; none means they are dropped.
    scheduler: Option<Arc<dyn Scheduler>>,
    /// Authorization hooks.
    rules: Arc<dyn Rules>,
    /// Database configuration.
    config: Config,
}

impl EntDb {
    /// Creates a database over a fresh in-memory store with default
    /// configuration, no rules and no scheduler.
    ///
    /// # Examples
    ///
    /// ```
    /// use entgraph_core::schema::{EntDef, FieldType};
    /// use entgraph_core::EntSchema;
    /// use entgraph_engine::EntDb;
    /// use entgraph_common::fields;
    ///
    /// let schema = EntSchema::build([EntDef::new("notes").field("text", FieldType::String)]).unwrap();
    /// let db = EntDb::new(schema).unwrap();
    /// let id = db.mutation(|ctx| ctx.insert("notes", fields! { "text" => "hi" })).unwrap();
    /// let note = db.query(|ctx| ctx.get_x("notes", id)).unwrap();
    /// assert_eq!(note.get("text").unwrap().as_str(), Some("hi"));
    /// ```
    pub fn new(schema: impl Into<Arc<EntSchema>>) -> Result<Self> {
        Self::builder(schema).build()
    }

    /// Starts building a database.
    #[must_use]
    pub fn builder(schema: impl Into<Arc<EntSchema>>) -> EntDbBuilder {
        EntDbBuilder {
            schema: schema.into(),
            store: None,
            scheduler: None,
            rules: None,
            config: Config::default(),
        }
    }

    /// Returns the schema.
    #[must_use]
    pub fn schema(&self) -> &Arc<EntSchema> {
        &self.schema
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Runs `f` in a read-only transaction. Writes fail with
    /// `StorageError::ReadOnly`.
    pub fn query<T>(&self, f: impl FnOnce(&Ctx<'_>) -> Result<T>) -> Result<T> {
        let tx = self.store.begin()?;
        let ctx = Ctx::new(tx, &self.schema, self.rules.as_ref(), &self.config, true);
        let result = f(&ctx);
        ctx.rollback();
        result
    }

    /// Runs `f` in a read-write transaction.
    ///
    /// On `Ok` the transaction commits and the hard-deletion passes it
    /// scheduled are handed to the scheduler. On `Err` every write is
    /// rolled back and nothing is scheduled.
    pub fn mutation<T>(&self, f: impl FnOnce(&mut Ctx<'_>) -> Result<T>) -> Result<T> {
        let tx = self.store.begin()?;
        let mut ctx = Ctx::new(tx, &self.schema, self.rules.as_ref(), &self.config, false);
        let value = match f(&mut ctx) {
            Ok(value) => value,
            Err(err) => {
                ctx.rollback();
                return Err(err);
            }
        };
        let scheduled = ctx.commit()?;
        self.dispatch(scheduled);
        Ok(value)
    }

    /// Runs one scheduled hard-deletion pass in its own transaction.
    ///
    /// Safe to call repeatedly: a pass for a root that was undeleted or is
    /// already gone returns [`PassOutcome::Skipped`].
    pub fn run_scheduled(&self, task: &ScheduledDeletion) -> Result<PassOutcome> {
        self.mutation(|ctx| deletion::run_pass(ctx, task))
    }

    fn dispatch(&self, scheduled: Vec<(ScheduledDeletion, Duration)>) {
        for (task, delay) in scheduled {
            match &self.scheduler {
                Some(scheduler) => scheduler.schedule(task, delay),
                None => tracing::warn!(
                    table = %task.table,
                    id = %task.id,
                    "no scheduler configured, dropping hard-deletion pass"
                ),
            }
        }
    }
}

impl std::fmt::Debug for EntDb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntDb")
            .field("tables", &self.schema.tables().count())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Builder for [`EntDb`].
pub struct EntDbBuilder {
    schema: Arc<EntSchema>,
    store: Option<Arc<dyn DocumentStore>>,
    scheduler: Option<Arc<dyn Scheduler>>,
    rules: Option<Arc<dyn Rules>>,
    config: Config,
}

impl EntDbBuilder {
    /// Uses `store` instead of a fresh [`MemoryStore`].
    #[must_use]
    pub fn store(mut self, store: Arc<dyn DocumentStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Sets the scheduler for hard-deletion passes.
    #[must_use]
    pub fn scheduler(mut self, scheduler: Arc<dyn Scheduler>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    /// Sets the authorization rules.
    #[must_use]
    pub fn rules(mut self, rules: impl Rules + 'static) -> Self {
        self.rules = Some(Arc::new(rules));
        self
    }

    /// Sets the configuration.
    #[must_use]
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Registers every table and join table layout on the store.
    pub fn build(self) -> Result<EntDb> {
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(MemoryStore::new()));
        let mut defined = 0;
        for layout in self.schema.layouts() {
            store.define_table(layout)?;
            defined += 1;
        }
        tracing::info!(tables = defined, "entity database ready");

        Ok(EntDb {
            schema: self.schema,
            store,
            scheduler: self.scheduler,
            rules: self.rules.unwrap_or_else(|| Arc::new(AllowAll)),
            config: self.config,
        })
    }
}

impl std::fmt::Debug for EntDbBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntDbBuilder")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
