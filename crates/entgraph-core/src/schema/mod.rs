//! Schema declarations.
//!
//! Declarations describe *what* a schema author wants: tables, their fields,
//! their edges and how deletion behaves. They are plain data; nothing is
//! validated here. [`EntSchema::build`](crate::metadata::EntSchema::build)
//! turns a set of declarations into resolved metadata and reports every
//! configuration error up front.
//!
//! ```
//! use entgraph_core::schema::{DeletionPolicy, EdgeDecl, EntDef, FieldType};
//! use std::time::Duration;
//!
//! let users = EntDef::new("users")
//!     .field("name", FieldType::String)
//!     .unique_field("email", FieldType::String)
//!     .edge(EdgeDecl::many("profiles").ref_field("userId").soft_cascade())
//!     .edge(EdgeDecl::many("friends").to("users"))
//!     .deletion(DeletionPolicy::Scheduled { delay: Duration::from_secs(60) });
//!
//! let profiles = EntDef::new("profiles")
//!     .field("bio", FieldType::String)
//!     .edge(EdgeDecl::single("user"))
//!     .deletion(DeletionPolicy::Soft);
//! # let _ = (users, profiles);
//! ```

mod edge;
mod field;
mod table;

pub use edge::{Cardinality, EdgeDecl, EdgeDeletion};
pub use field::{FieldDef, FieldType};
pub use table::{DeletionPolicy, EntDef, IndexDecl};
