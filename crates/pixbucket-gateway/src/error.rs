use std::time::Duration;

use thiserror::Error;

/// Errors from remote gateway primitives.
///
/// The bucket treats every variant as an opaque per-item failure.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// No image exists for the given remote id or delete token.
    #[error("remote object not found: {0}")]
    NotFound(String),

    /// The remote side refused the request (quota, size, policy).
    #[error("request rejected: {0}")]
    Rejected(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type GatewayResult<T> = Result<T, GatewayError>;
