//! Service Layer Error Types
//!
//! Errors returned by the structural operations. Validation variants are
//! raised before any write happens; `StoreFailure` may arrive part-way
//! through a multi-step mutation and is never retried.

use crate::db::StoreError;
use thiserror::Error;

/// Structural operation errors
#[derive(Error, Debug)]
pub enum StructureError {
    /// Level index outside `[0, depth)` (or `[0, depth]` for level insertion)
    #[error("Invalid level {level}: text has {depth} levels")]
    InvalidLevel { level: usize, depth: usize },

    /// Parent missing, on the wrong level, in another text, or not allowed
    #[error("Invalid parent {parent}: {reason}")]
    InvalidParent { parent: String, reason: String },

    /// Location or text id did not resolve
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Requested position outside the allowed slot range
    #[error("Invalid position {position}: {reason}")]
    InvalidPosition { position: usize, reason: String },

    /// Malformed request arguments
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Operation conflicts with the current state of the text
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Stored structure violates an invariant the operation relies on
    #[error("Inconsistent structure in text {text_id}: {detail}")]
    InconsistentStructure { text_id: String, detail: String },

    /// Underlying store or collaborator failure
    #[error("Store failure: {0}")]
    StoreFailure(#[from] StoreError),

    /// Service could not be constructed
    #[error("Initialization error: {0}")]
    InitializationError(String),
}

impl StructureError {
    pub fn invalid_level(level: usize, depth: usize) -> Self {
        Self::InvalidLevel { level, depth }
    }

    pub fn invalid_parent(parent: Option<&str>, reason: impl Into<String>) -> Self {
        Self::InvalidParent {
            parent: parent.unwrap_or("(none)").to_string(),
            reason: reason.into(),
        }
    }

    pub fn location_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: "Location",
            id: id.into(),
        }
    }

    pub fn text_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: "Text",
            id: id.into(),
        }
    }

    pub fn invalid_position(position: usize, reason: impl Into<String>) -> Self {
        Self::InvalidPosition {
            position,
            reason: reason.into(),
        }
    }

    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn inconsistent(text_id: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::InconsistentStructure {
            text_id: text_id.into(),
            detail: detail.into(),
        }
    }

    pub fn initialization_error(msg: impl Into<String>) -> Self {
        Self::InitializationError(msg.into())
    }

    /// Whether the error was raised before any write took place
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidLevel { .. }
                | Self::InvalidParent { .. }
                | Self::NotFound { .. }
                | Self::InvalidPosition { .. }
                | Self::InvalidRequest(_)
                | Self::Conflict(_)
        )
    }
}
