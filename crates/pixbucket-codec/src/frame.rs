//! Compression and length framing helpers.
//!
//! A framed payload is laid out as:
//! ```text
//! [4 bytes: payload length (big-endian u32)]
//! [N bytes: payload]
//! [padding: ignored]
//! ```

use crate::error::{CodecError, CodecResult};

/// Size of the length header in bytes.
pub const HEADER_SIZE: usize = 4;

/// Compress `data` with zstd at the given level.
pub fn compress(data: &[u8], level: i32) -> CodecResult<Vec<u8>> {
    zstd::encode_all(data, level).map_err(|e| CodecError::Compression(e.to_string()))
}

/// Decompress zstd `data`.
///
/// Any failure means the input was not produced by [`compress`], so it is
/// reported as a corrupt payload.
pub fn decompress(data: &[u8]) -> CodecResult<Vec<u8>> {
    zstd::decode_all(data)
        .map_err(|e| CodecError::CorruptPayload(format!("decompression failed: {e}")))
}

/// Prepend the big-endian length header to `payload`.
pub fn frame(payload: &[u8]) -> CodecResult<Vec<u8>> {
    let len = u32::try_from(payload.len())
        .map_err(|_| CodecError::PayloadTooLarge(payload.len()))?;
    let mut framed = Vec::with_capacity(HEADER_SIZE + payload.len());
    framed.extend_from_slice(&len.to_be_bytes());
    framed.extend_from_slice(payload);
    Ok(framed)
}

/// Strip the length header and any trailing padding.
///
/// Padding bytes are not inspected; only the declared length matters.
pub fn unframe(data: &[u8]) -> CodecResult<&[u8]> {
    if data.len() < HEADER_SIZE {
        return Err(CodecError::CorruptPayload(format!(
            "need {HEADER_SIZE} header bytes, got {}",
            data.len()
        )));
    }
    let mut header = [0u8; HEADER_SIZE];
    header.copy_from_slice(&data[..HEADER_SIZE]);
    let len = u32::from_be_bytes(header) as usize;

    let body = &data[HEADER_SIZE..];
    if len > body.len() {
        return Err(CodecError::CorruptPayload(format!(
            "declared length {len} exceeds {} available bytes",
            body.len()
        )));
    }
    Ok(&body[..len])
}
