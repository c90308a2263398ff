//! Lossless PNG rendering of pixel grids.

use std::io::Cursor;

use image::{ImageFormat, RgbaImage};

use crate::error::{CodecError, CodecResult};
use crate::grid::PixelGrid;

/// Render a grid as an 8-bit RGBA PNG.
pub fn to_png(grid: &PixelGrid) -> CodecResult<Vec<u8>> {
    let side = grid.side();
    let img = RgbaImage::from_raw(side, side, grid.as_bytes().to_vec())
        .ok_or_else(|| CodecError::Image(format!("buffer does not fit {side}x{side}")))?;

    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .map_err(|e| CodecError::Image(e.to_string()))?;
    Ok(buf)
}

/// Parse PNG bytes back into a grid.
///
/// Anything that is not a square image is reported as a corrupt payload.
pub fn from_png(bytes: &[u8]) -> CodecResult<PixelGrid> {
    let img = image::load_from_memory_with_format(bytes, ImageFormat::Png)
        .map_err(|e| CodecError::CorruptPayload(format!("unreadable image: {e}")))?
        .into_rgba8();

    let (width, height) = img.dimensions();
    if width != height {
        return Err(CodecError::CorruptPayload(format!(
            "image is {width}x{height}, expected a square"
        )));
    }
    PixelGrid::from_raw(width, img.into_raw())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn png_roundtrip_is_lossless() {
        let framed: Vec<u8> = (0..=255u8).cycle().take(1000).collect();
        let grid = PixelGrid::from_framed(framed).unwrap();
        let png = to_png(&grid).unwrap();
        assert_eq!(&png[1..4], b"PNG");
        assert_eq!(from_png(&png).unwrap(), grid);
    }

    #[test]
    fn non_square_png_rejected() {
        let img = RgbaImage::from_raw(2, 1, vec![0; 8]).unwrap();
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        let err = from_png(&buf).unwrap_err();
        assert!(matches!(err, CodecError::CorruptPayload(_)));
    }

    #[test]
    fn garbage_bytes_rejected() {
        let err = from_png(b"not an image").unwrap_err();
        assert!(matches!(err, CodecError::CorruptPayload(_)));
    }
}
