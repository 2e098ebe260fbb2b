//! # entgraph-engine
//!
//! The main entry point for Entgraph: the database handle, execution
//! contexts, entity access, lazy queries, write validation and cascading
//! deletion.
//!
//! ## Modules
//!
//! - [`database`] - EntDb struct and transaction entry points
//! - [`ctx`] - Per-transaction execution context
//! - [`config`] - Configuration options
//! - [`ent`] - Loaded entities and edge traversal
//! - [`query`] - Lazy query builder, filters and pagination
//! - [`writer`] - Validated inserts, patches, replaces and edge changes
//! - [`deletion`] - Hard, soft and scheduled cascading deletion
//! - [`rules`] - Read and write authorization hooks
//! - [`scheduler`] - Background execution of scheduled deletion passes

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod ctx;
pub mod database;
pub mod deletion;
pub mod ent;
pub mod query;
pub mod rules;
pub mod scheduler;
pub mod writer;

pub use config::Config;
pub use ctx::Ctx;
pub use database::{EntDb, EntDbBuilder};
pub use deletion::{PassOutcome, ScheduledDeletion};
pub use ent::{EdgeRef, Ent};
pub use query::{Filter, MappedQuery, Page, PageRequest, Query};
pub use rules::{AllowAll, RuleSet, Rules};
pub use scheduler::{QueueScheduler, Scheduler, TokioScheduler, TokioWorker};
pub use writer::{Changes, EdgeChange};
