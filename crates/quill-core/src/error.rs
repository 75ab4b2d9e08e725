//! Error types for quill-core

use thiserror::Error;

use crate::validation::ValidationErrors;

/// Result type alias using quill-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in quill-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Input rejected before reaching the store
    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    /// Note not found
    #[error("Note not found: {0}")]
    NotFound(String),

    /// Note exists but belongs to another user
    #[error("Forbidden")]
    Forbidden,

    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// libSQL error
    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Whether this error came from the storage layer rather than from the caller's input.
    pub const fn is_store_error(&self) -> bool {
        matches!(
            self,
            Self::Database(_) | Self::LibSql(_) | Self::Serialization(_)
        )
    }
}

impl From<ValidationErrors> for Error {
    fn from(errors: ValidationErrors) -> Self {
        Self::Validation(errors)
    }
}
