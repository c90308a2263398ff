use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
    /// Framing, length, decompression, or deserialization failure on decode.
    #[error("corrupt payload: {0}")]
    CorruptPayload(String),

    #[error("payload too large to frame: {0} bytes")]
    PayloadTooLarge(usize),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("compression failed: {0}")]
    Compression(String),

    #[error("image error: {0}")]
    Image(String),
}

pub type CodecResult<T> = Result<T, CodecError>;
