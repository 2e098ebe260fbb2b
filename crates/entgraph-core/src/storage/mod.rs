//! Document storage.
//!
//! The ent layer never talks to a concrete database. It talks to a
//! [`DocumentStore`] that hands out [`StoreTransaction`]s: point reads,
//! inserts, patches, replaces, deletes and ordered index scans, all inside
//! one atomic transaction.
//!
//! - [`index`] - Index layouts, keys, ranges and scans
//! - [`traits`] - The store seam
//! - [`memory`] - An in-process store with ordered indexes and rollback

pub mod index;
pub mod memory;
pub mod traits;

pub use entgraph_common::utils::error::StorageError;
pub use index::{
    CREATION_INDEX, IndexDef, IndexKey, IndexRange, IndexScan, Order, TableLayout,
};
pub use memory::MemoryStore;
pub use traits::{DocumentStore, ScanIter, StoreTransaction};
