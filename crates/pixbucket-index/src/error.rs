//! Error types for index persistence.

use thiserror::Error;

use pixbucket_types::TypeError;

/// Errors that can occur while saving or loading a bucket index.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The stored blob could not be decompressed or decoded.
    #[error("corrupt index: {0}")]
    Corrupt(String),

    /// The blob was written by a format revision this build does not know.
    #[error("unsupported index version: {0}")]
    UnsupportedVersion(u32),

    /// The blob belongs to a different bucket than the one requested.
    #[error("index belongs to bucket {found:?}, expected {expected:?}")]
    BucketMismatch { expected: String, found: String },

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("invalid bucket name: {0}")]
    InvalidBucketName(String),
}

impl From<TypeError> for IndexError {
    fn from(e: TypeError) -> Self {
        IndexError::InvalidBucketName(e.to_string())
    }
}

/// Convenience type alias for index operations.
pub type IndexResult<T> = Result<T, IndexError>;
