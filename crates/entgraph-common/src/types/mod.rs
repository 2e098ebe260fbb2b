//! Core type definitions for Entgraph.
//!
//! - Identifier types ([`DocId`])
//! - Temporal types ([`Timestamp`])
//! - Document values ([`Value`], [`Fields`], [`Document`])

mod document;
mod id;
mod timestamp;
mod value;

pub use document::{Document, Fields, CREATION_TIME_FIELD, DELETION_TIME_FIELD, ID_FIELD};
pub use id::DocId;
pub use timestamp::Timestamp;
pub use value::Value;
