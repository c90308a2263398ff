use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::CodecConfig;
use crate::error::{CodecError, CodecResult};
use crate::frame::{compress, decompress, frame, unframe};
use crate::grid::PixelGrid;
use crate::render::{from_png, to_png};

/// Reversible value ↔ pixel grid codec.
///
/// Encoding pipeline:
/// `bincode(value) -> zstd -> length header -> zero pad -> S×S RGBA grid`.
/// Decoding reverses it and ignores whatever follows the declared length.
#[derive(Clone, Debug, Default)]
pub struct Codec {
    config: CodecConfig,
}

impl Codec {
    pub fn new(config: CodecConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    /// Serialize a value to bytes.
    pub fn serialize<T: Serialize + ?Sized>(&self, value: &T) -> CodecResult<Vec<u8>> {
        bincode::serialize(value).map_err(|e| CodecError::Serialization(e.to_string()))
    }

    /// Deserialize a value from bytes produced by [`Self::serialize`].
    pub fn deserialize<T: DeserializeOwned>(&self, bytes: &[u8]) -> CodecResult<T> {
        bincode::deserialize(bytes)
            .map_err(|e| CodecError::CorruptPayload(format!("deserialization failed: {e}")))
    }

    /// Build the framed payload for a value: length header plus compressed
    /// serialized bytes, without padding.
    pub fn framed_payload<T: Serialize + ?Sized>(&self, value: &T) -> CodecResult<Vec<u8>> {
        let serialized = self.serialize(value)?;
        let compressed = compress(&serialized, self.config.compression_level)?;
        frame(&compressed)
    }

    /// Encode a value into the smallest square grid that holds it.
    pub fn encode<T: Serialize + ?Sized>(&self, value: &T) -> CodecResult<PixelGrid> {
        let framed = self.framed_payload(value)?;
        let framed_len = framed.len();
        let grid = PixelGrid::from_framed(framed)?;
        tracing::trace!(framed_len, side = grid.side(), "encoded value");
        Ok(grid)
    }

    /// Decode a value from a grid produced by [`Self::encode`].
    pub fn decode<T: DeserializeOwned>(&self, grid: &PixelGrid) -> CodecResult<T> {
        let payload = unframe(grid.as_bytes())?;
        let serialized = decompress(payload)?;
        self.deserialize(&serialized)
    }

    /// Encode a value straight to PNG bytes.
    pub fn encode_image<T: Serialize + ?Sized>(&self, value: &T) -> CodecResult<Vec<u8>> {
        to_png(&self.encode(value)?)
    }

    /// Decode a value from PNG bytes produced by [`Self::encode_image`].
    pub fn decode_image<T: DeserializeOwned>(&self, bytes: &[u8]) -> CodecResult<T> {
        self.decode(&from_png(bytes)?)
    }
}
