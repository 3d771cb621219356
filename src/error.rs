//! Error types for the vector database

use thiserror::Error;

/// Result type alias for storex operations
pub type Result<T> = std::result::Result<T, VectorDbError>;

/// Error types that can occur in storex operations
#[derive(Error, Debug)]
pub enum VectorDbError {
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    #[error("Store is not bound to a storage path")]
    NoStorage,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Corrupt data: {0}")]
    CorruptData(String),

    #[error("Unsupported format version {found} (supported: {supported})")]
    UnsupportedVersion { found: u16, supported: u16 },
}

impl VectorDbError {
    pub(crate) fn invalid_argument(reason: impl Into<String>) -> Self {
        VectorDbError::InvalidArgument(reason.into())
    }

    pub(crate) fn corrupt(reason: impl Into<String>) -> Self {
        VectorDbError::CorruptData(reason.into())
    }
}
