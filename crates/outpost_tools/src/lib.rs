//! # Outpost Operator Tools
//!
//! Command-line tools for server operators:
//! - Directory-backed layout store
//! - Layout listing and selection dry runs
//! - Layout and exclusion-zone file checks
//! - Data validators

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod error;
pub mod store;
pub mod validate;

pub use error::{Result, ToolError};
pub use store::DirectoryStore;
