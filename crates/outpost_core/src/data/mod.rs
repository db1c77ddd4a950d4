//! Data structures for structure attributes and server tunables.
//!
//! All structs here deserialize from RON.
//!
//! **Note:** This module contains no IO. Callers read the text and pass
//! it in.

mod build_config;
mod buildable_data;

pub use build_config::BuildConfig;
pub use buildable_data::{ArchetypeTable, BuildableData};
