//! Value to pixel-grid codec for pixbucket.
//!
//! Turns any serde-serializable value into a square RGBA image and back.
//! This defines the binary format of every object a bucket uploads.
//!
//! # Format
//!
//! ```text
//! framed  = length (4 bytes, big-endian) ‖ zstd(bincode(value))
//! grid    = framed zero-padded to S*S*4 bytes, S minimal, S >= 1
//! image   = grid as an 8-bit RGBA PNG, row-major, one cell per pixel
//! ```
//!
//! Decoders read `length` and ignore everything after the payload, so the
//! padding may hold anything.

pub mod codec;
pub mod config;
pub mod error;
pub mod frame;
pub mod grid;
pub mod render;

pub use codec::Codec;
pub use config::CodecConfig;
pub use error::{CodecError, CodecResult};
pub use frame::{compress, decompress, HEADER_SIZE};
pub use grid::PixelGrid;
