//! Store Error Types
//!
//! Errors raised by the persistence layer and by the external collaborators
//! (content stores) the engine calls through. The service layer surfaces all
//! of them as `StructureError::StoreFailure` without retrying.

use std::path::PathBuf;
use thiserror::Error;

/// Persistence and collaborator errors
#[derive(Error, Debug)]
pub enum StoreError {
    /// A bulk insert carried an id that already exists
    #[error("Duplicate location id: {id}")]
    DuplicateId { id: String },

    /// A bulk replace referenced a record that does not exist
    #[error("Location not found in store: {id}")]
    MissingRecord { id: String },

    /// A position or level shift would produce a negative value
    #[error("Shift of {delta} underflows {field} {value} on location {id}")]
    ShiftUnderflow {
        id: String,
        field: &'static str,
        value: usize,
        delta: i64,
    },

    /// Snapshot file could not be read or written
    #[error("Snapshot I/O failed at {path}: {source}")]
    Snapshot {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Snapshot content could not be encoded or decoded
    #[error("Snapshot serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A content store or other collaborator failed
    #[error("Collaborator '{collaborator}' failed: {message}")]
    Collaborator {
        collaborator: String,
        message: String,
    },

    /// Generic backend failure with context
    #[error("Store operation failed: {context}")]
    OperationFailed { context: String },
}

impl StoreError {
    pub fn duplicate_id(id: impl Into<String>) -> Self {
        Self::DuplicateId { id: id.into() }
    }

    pub fn missing_record(id: impl Into<String>) -> Self {
        Self::MissingRecord { id: id.into() }
    }

    pub fn snapshot(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Snapshot {
            path: path.into(),
            source,
        }
    }

    /// Wrap a collaborator error, keeping its full context chain in the message
    pub fn collaborator(collaborator: impl Into<String>, error: anyhow::Error) -> Self {
        Self::Collaborator {
            collaborator: collaborator.into(),
            message: format!("{:#}", error),
        }
    }

    pub fn operation_failed(context: impl Into<String>) -> Self {
        Self::OperationFailed {
            context: context.into(),
        }
    }
}

/// Result alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;
