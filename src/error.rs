//! # Error Types
//!
//! Fatal error classes for dataset operations.
//!
//! Per-subject failures (generation or validation) are never errors at this
//! level: they are carried as data in [`crate::generation::GenerationOutcome`]
//! and [`crate::validator::ValidationOutcome`] and end up in a failed
//! [`crate::store::DatasetRecord`]. Only the classes below abort a run.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type for fallible dataset operations
pub type DatasetResult<T> = Result<T, DatasetError>;

#[derive(Debug, Error)]
pub enum DatasetError {
    /// The store (or combined output) could not be written
    #[error("Persistence error at {path}: {source}")]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An input file exists but does not have the expected shape
    #[error("Malformed input {path}: {reason}")]
    MalformedInput { path: PathBuf, reason: String },

    /// An input file could not be read
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Unknown category: {0}")]
    UnknownCategory(String),

    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("State machine error: {0}")]
    StateMachine(#[from] crate::pipeline::state::StateTransitionError),
}

impl DatasetError {
    pub fn persistence(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Persistence {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub fn malformed(path: impl AsRef<Path>, reason: impl Into<String>) -> Self {
        Self::MalformedInput {
            path: path.as_ref().to_path_buf(),
            reason: reason.into(),
        }
    }

    pub fn read(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Read {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Whether the error was raised before any subject was processed
    #[must_use]
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Self::MalformedInput { .. }
                | Self::Read { .. }
                | Self::Configuration(_)
                | Self::UnknownCategory(_)
        )
    }
}

impl From<config::ConfigError> for DatasetError {
    fn from(error: config::ConfigError) -> Self {
        DatasetError::Configuration(error.to_string())
    }
}
