//! Error types for the operator tools.

use std::path::PathBuf;

use outpost_core::error::SimError;
use thiserror::Error;

/// Result type alias using [`ToolError`].
pub type Result<T> = std::result::Result<T, ToolError>;

/// Top-level error type for the operator tools.
#[derive(Debug, Error)]
pub enum ToolError {
    /// A file or directory could not be accessed.
    #[error("IO error at '{path}': {source}")]
    Io {
        /// Path of the failed operation.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The simulation library rejected the input.
    #[error(transparent)]
    Sim(#[from] SimError),

    /// A report could not be written as RON.
    #[error("RON output error: {0}")]
    Ron(#[from] ron::Error),

    /// A checked file had problems.
    #[error("{path}: {problems} problem(s) found")]
    Invalid {
        /// Checked file.
        path: String,
        /// Number of problems.
        problems: usize,
    },
}
