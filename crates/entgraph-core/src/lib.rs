//! # entgraph-core
//!
//! Core layer for Entgraph: schema declarations, the edge metadata model and
//! the document storage seam.
//!
//! This crate depends only on `entgraph-common`.
//!
//! ## Modules
//!
//! - [`schema`] - Declarations: tables ("ents"), fields, edges, deletion policies
//! - [`metadata`] - Edge metadata resolved from declarations ([`EntSchema`])
//! - [`storage`] - Document store traits, index keys and the in-memory store

pub mod metadata;
pub mod schema;
pub mod storage;

// Re-export commonly used types
pub use metadata::{EdgeDescriptor, EdgeKind, EntSchema, TableMeta};
pub use schema::{DeletionPolicy, EdgeDecl, EdgeDeletion, EntDef, FieldType};
pub use storage::{
    DocumentStore, IndexKey, IndexRange, IndexScan, MemoryStore, Order, StoreTransaction,
    TableLayout,
};
