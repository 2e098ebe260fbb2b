//! Utility functions and helpers.
//!
//! - [`error`] - Error taxonomy and the crate-wide `Result`
//! - [`hash`] - Fast hash map/set aliases

pub mod error;
pub mod hash;
