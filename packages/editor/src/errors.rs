//! Error types for the editor

use thiserror::Error;

/// Input rejected before any state is touched
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Unsupported file type '{mime}': only images can be inserted")]
    NotAnImage { mime: String },

    #[error("Image is too large ({size} bytes, the limit is {limit} bytes)")]
    TooLarge { size: u64, limit: u64 },

    #[error("{0} is required")]
    EmptyField(&'static str),

    #[error("Tables need between 1 and {max} rows and columns (got {rows}x{columns})")]
    TableDimensions {
        rows: usize,
        columns: usize,
        max: usize,
    },
}

/// Failure reported by a persistence or storage collaborator
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PersistError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("Request rejected: {0}")]
    Rejected(String),
}

impl PersistError {
    pub fn io(message: impl Into<String>) -> Self {
        PersistError::Io(message.into())
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        PersistError::Rejected(message.into())
    }
}

#[derive(Error, Debug)]
pub enum EditorError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Save failed: {0}")]
    Persist(#[from] PersistError),

    #[error("Version not found: {0}")]
    VersionNotFound(String),

    #[error("Editing session is closed")]
    SessionClosed,

    #[error("Invalid configuration: {0}")]
    Config(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl EditorError {
    /// True for failures the user can fix by retrying later
    pub fn is_retryable(&self) -> bool {
        matches!(self, EditorError::Persist(_))
    }
}
