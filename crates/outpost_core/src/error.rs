//! Error types for the structure simulation.
//!
//! Placement rejections are not errors: they are reported through
//! [`crate::placement::BuildError`] inside a verdict.

use thiserror::Error;

use crate::structure::StructureId;

/// Result type alias using [`SimError`].
pub type Result<T> = std::result::Result<T, SimError>;

/// Top-level error type for the structure simulation.
#[derive(Debug, Error)]
pub enum SimError {
    /// The referenced structure no longer exists.
    #[error("Structure not found: {0:?}")]
    StructureNotFound(StructureId),

    /// A numeric archetype id outside the known range.
    #[error("Unknown archetype id: {0}")]
    UnknownArchetype(i32),

    /// A layout or exclusion-zone line could not be parsed.
    #[error("Layout parse error on line {line}: {message}")]
    LayoutParse {
        /// One-based line number.
        line: usize,
        /// Error message.
        message: String,
    },

    /// The layout store failed to read or write.
    #[error("Layout store error at '{path}': {message}")]
    Store {
        /// Store path of the failed operation.
        path: String,
        /// Error message.
        message: String,
    },

    /// Data file parsing error.
    #[error("Failed to parse data file '{path}': {message}")]
    DataParse {
        /// Path to the file that failed to parse.
        path: String,
        /// Error message.
        message: String,
    },

    /// Invalid simulation state.
    #[error("Invalid simulation state: {0}")]
    InvalidState(String),

    /// A map-scoped operation was requested before a map was loaded.
    #[error("No map is loaded")]
    NoMapLoaded,
}
