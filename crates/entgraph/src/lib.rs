//! # Entgraph
//!
//! Typed entities and edges on top of a transactional document store.
//!
//! Declare tables with [`EntDef`] and edges with [`EdgeDecl`], resolve them
//! into an [`EntSchema`], and open an [`EntDb`]. Every read runs inside
//! [`EntDb::query`] and every write inside [`EntDb::mutation`]; both hand
//! the closure a [`Ctx`] bound to one transaction.
//!
//! ## Deletion
//!
//! | Policy | Effect of `delete` |
//! | ------ | ------------------ |
//! | `Hard` | Removes the entity, its required dependents and its join rows |
//! | `Soft` | Sets `deletionTime`, propagated over soft-cascade edges |
//! | `Scheduled` | Soft now, hard later through a [`Scheduler`] |
//!
//! ## Quick Start
//!
//! ```rust
//! use entgraph::prelude::*;
//!
//! let schema = EntSchema::build([
//!     EntDef::new("users")
//!         .unique_field("email", FieldType::String)
//!         .edge(EdgeDecl::many("posts")),
//!     EntDef::new("posts")
//!         .field("title", FieldType::String)
//!         .edge(EdgeDecl::single("user")),
//! ])?;
//! let db = EntDb::new(schema)?;
//!
//! let ada = db.mutation(|ctx| {
//!     let ada = ctx.insert("users", fields! { "email" => "ada@example.com" })?;
//!     ctx.insert("posts", fields! { "title" => "Notes", "userId" => ada })?;
//!     Ok(ada)
//! })?;
//!
//! let titles = db.query(|ctx| {
//!     ctx.get_x("users", ada)?
//!         .edges("posts")
//!         .map(|_, post| Ok(post.get("title")))
//!         .collect(ctx)
//! })?;
//! assert_eq!(titles, vec![Some(Value::from("Notes"))]);
//! # Ok::<(), entgraph::Error>(())
//! ```

// Re-export the main database API
pub use entgraph_engine::{
    AllowAll, Changes, Config, Ctx, EdgeChange, EdgeRef, Ent, EntDb, EntDbBuilder, Filter,
    MappedQuery, Page, PageRequest, PassOutcome, Query, QueueScheduler, RuleSet, Rules,
    ScheduledDeletion, Scheduler, TokioScheduler, TokioWorker,
};

// Schema declarations and the storage seam
pub use entgraph_core::{
    DeletionPolicy, DocumentStore, EdgeDecl, EdgeDeletion, EdgeDescriptor, EdgeKind, EntDef,
    EntSchema, FieldType, IndexKey, IndexRange, MemoryStore, Order, StoreTransaction, TableMeta,
};

// Identifiers, values and errors
pub use entgraph_common::fields;
pub use entgraph_common::{
    CardinalityError, ConfigError, DocId, Document, Error, Fields, Operation, Result,
    StorageError, Timestamp, ValidationError, Value,
};

/// Everything needed to declare a schema and run transactions.
pub mod prelude {
    pub use crate::{
        Changes, Ctx, DeletionPolicy, DocId, EdgeDecl, Ent, EntDb, EntDef, EntSchema, Error,
        FieldType, Filter, Order, PageRequest, Result, Value, fields,
    };
}
