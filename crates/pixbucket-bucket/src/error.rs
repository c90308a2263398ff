//! Error types for bucket operations.

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

use pixbucket_codec::CodecError;
use pixbucket_gateway::GatewayError;
use pixbucket_index::IndexError;
use pixbucket_types::TypeError;

/// The bulk operations that can partially fail.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BatchOperation {
    Commit,
    Push,
    DeleteBucket,
}

impl fmt::Display for BatchOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BatchOperation::Commit => "commit",
            BatchOperation::Push => "push",
            BatchOperation::DeleteBucket => "delete bucket",
        };
        f.write_str(s)
    }
}

/// Per-object failures of a bulk operation.
///
/// Objects not listed here succeeded and their effects are durable.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchFailure {
    pub operation: BatchOperation,
    /// Number of objects the operation attempted.
    pub attempted: usize,
    /// Failed object name to failure reason.
    pub failed: BTreeMap<String, String>,
}

impl BatchFailure {
    pub fn new(operation: BatchOperation, attempted: usize, failed: BTreeMap<String, String>) -> Self {
        Self {
            operation,
            attempted,
            failed,
        }
    }

    /// Names of the failed objects, sorted.
    pub fn failed_names(&self) -> Vec<&str> {
        self.failed.keys().map(String::as_str).collect()
    }

    pub fn is_failed(&self, name: &str) -> bool {
        self.failed.contains_key(name)
    }

    pub fn reason(&self, name: &str) -> Option<&str> {
        self.failed.get(name).map(String::as_str)
    }
}

impl fmt::Display for BatchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} failed for {} of {} objects: {}",
            self.operation,
            self.failed.len(),
            self.attempted,
            self.failed_names().join(", ")
        )
    }
}

/// Errors that can occur during bucket operations.
#[derive(Debug, Error)]
pub enum BucketError {
    /// No staged or uploaded object with this name.
    #[error("object not found: {0}")]
    NotFound(String),

    /// No persisted index exists for this bucket.
    #[error("no such bucket: {0}")]
    NoSuchBucket(String),

    #[error("bucket already exists: {0}")]
    AlreadyExists(String),

    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("index error: {0}")]
    Index(#[from] IndexError),

    #[error(transparent)]
    InvalidName(#[from] TypeError),

    #[error("{0}")]
    BatchFailed(BatchFailure),

    /// A bulk operation finished its remote calls but could not store the
    /// index. Per-object failures, if any, are kept in `batch`.
    #[error("index error: {source}{}", batch_suffix(.batch))]
    PersistFailed {
        source: IndexError,
        batch: Option<BatchFailure>,
    },

    /// The background task driving an operation panicked or was aborted.
    #[error("operation interrupted: {0}")]
    Interrupted(String),
}

impl BucketError {
    /// The batch failure carried by this error, if any.
    pub fn batch(&self) -> Option<&BatchFailure> {
        match self {
            BucketError::BatchFailed(failure) => Some(failure),
            BucketError::PersistFailed { batch, .. } => batch.as_ref(),
            _ => None,
        }
    }
}

fn batch_suffix(batch: &Option<BatchFailure>) -> String {
    batch.as_ref().map(|b| format!(" ({b})")).unwrap_or_default()
}

/// Convenience type alias for bucket operations.
pub type BucketResult<T> = Result<T, BucketError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_failure_display_lists_names() {
        let mut failed = BTreeMap::new();
        failed.insert("b".to_string(), "boom".to_string());
        failed.insert("a".to_string(), "bang".to_string());
        let failure = BatchFailure::new(BatchOperation::Commit, 3, failed);

        assert_eq!(failure.failed_names(), vec!["a", "b"]);
        assert_eq!(failure.reason("a"), Some("bang"));
        assert!(!failure.is_failed("c"));
        assert_eq!(failure.to_string(), "commit failed for 2 of 3 objects: a, b");
    }

    #[test]
    fn batch_accessor() {
        let err = BucketError::BatchFailed(BatchFailure::new(
            BatchOperation::DeleteBucket,
            1,
            BTreeMap::from([("x".to_string(), "gone".to_string())]),
        ));
        assert_eq!(err.batch().unwrap().failed_names(), vec!["x"]);
        assert!(BucketError::NotFound("y".into()).batch().is_none());
    }

    #[test]
    fn persist_failure_keeps_batch() {
        let err = BucketError::PersistFailed {
            source: IndexError::Io(std::io::Error::other("disk full")),
            batch: Some(BatchFailure::new(
                BatchOperation::Commit,
                2,
                BTreeMap::from([("a".to_string(), "rejected".to_string())]),
            )),
        };
        assert_eq!(err.batch().unwrap().failed_names(), vec!["a"]);
        let text = err.to_string();
        assert!(text.contains("disk full"));
        assert!(text.contains("commit failed for 1 of 2 objects: a"));
    }
}
