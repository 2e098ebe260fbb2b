//! # entgraph-common
//!
//! Foundation layer for Entgraph: identifiers, values, documents and the
//! error taxonomy shared by every other crate.
//!
//! This crate has no internal dependencies and should be kept minimal.
//!
//! ## Modules
//!
//! - [`types`] - Core type definitions (DocId, Timestamp, Value, Document)
//! - [`utils`] - Utility functions and helpers (hashing, errors)

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod types;
pub mod utils;

// Re-export commonly used types at crate root
pub use types::{DocId, Document, Fields, Timestamp, Value};
pub use utils::error::{
    CardinalityError, ConfigError, Error, Operation, Result, StorageError, ValidationError,
};
