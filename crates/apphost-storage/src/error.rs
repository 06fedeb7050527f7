//! Storage error types.

/// Errors from storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// A storage operation failed.
    #[error("storage error: {0}")]
    Internal(String),

    /// Reading or writing the backing file failed.
    #[error("io error at {path}: {source}")]
    Io {
        /// Path of the file being accessed.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The path is not a safe relative path.
    #[error("invalid path: {0}")]
    InvalidPath(String),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
