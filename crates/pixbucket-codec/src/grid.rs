use crate::error::{CodecError, CodecResult};

/// Bytes per pixel (RGBA).
pub const CHANNELS: usize = 4;

/// A square grid of RGBA cells holding a framed payload.
///
/// Cells are stored row-major; cell `i` holds payload bytes
/// `4i..4i + 4` in R, G, B, A order. Bytes past the framed payload are zero
/// on encode.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PixelGrid {
    side: u32,
    data: Vec<u8>,
}

impl PixelGrid {
    /// Lay out `framed` in the smallest square grid that holds it, zero
    /// padding the tail. Always yields at least a 1×1 grid.
    pub fn from_framed(mut framed: Vec<u8>) -> CodecResult<Self> {
        let side = side_for(framed.len());
        let side_u32 = u32::try_from(side).map_err(|_| CodecError::PayloadTooLarge(framed.len()))?;
        framed.resize(side * side * CHANNELS, 0);
        Ok(Self {
            side: side_u32,
            data: framed,
        })
    }

    /// Wrap raw RGBA bytes for a `side`×`side` grid.
    pub fn from_raw(side: u32, data: Vec<u8>) -> CodecResult<Self> {
        let expected = (side as usize)
            .checked_mul(side as usize)
            .and_then(|n| n.checked_mul(CHANNELS))
            .ok_or_else(|| CodecError::CorruptPayload(format!("grid side {side} overflows")))?;
        if side == 0 || data.len() != expected {
            return Err(CodecError::CorruptPayload(format!(
                "expected {expected} bytes for a {side}x{side} grid, got {}",
                data.len()
            )));
        }
        Ok(Self { side, data })
    }

    /// Side length in cells.
    pub fn side(&self) -> u32 {
        self.side
    }

    /// Number of cells.
    pub fn cell_count(&self) -> usize {
        self.data.len() / CHANNELS
    }

    /// The cell at (`row`, `col`), or `None` if out of bounds.
    pub fn cell(&self, row: u32, col: u32) -> Option<[u8; CHANNELS]> {
        if row >= self.side || col >= self.side {
            return None;
        }
        let start = (row as usize * self.side as usize + col as usize) * CHANNELS;
        let mut cell = [0u8; CHANNELS];
        cell.copy_from_slice(&self.data[start..start + CHANNELS]);
        Some(cell)
    }

    /// Iterate over rows, each a slice of `side * 4` bytes.
    pub fn rows(&self) -> impl Iterator<Item = &[u8]> {
        self.data.chunks_exact(self.side as usize * CHANNELS)
    }

    /// Flattened bytes, row-major.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Mutable access to the flattened bytes.
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}

/// Smallest side `S` with `S * S * 4 >= len`, never less than 1.
pub fn side_for(len: usize) -> usize {
    let cells = len.div_ceil(CHANNELS).max(1);
    let mut side = (cells as f64).sqrt().ceil() as usize;
    // Correct for floating point error in either direction.
    while side * side < cells {
        side += 1;
    }
    while side > 1 && (side - 1) * (side - 1) >= cells {
        side -= 1;
    }
    side
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn side_for_small_lengths() {
        assert_eq!(side_for(0), 1);
        assert_eq!(side_for(1), 1);
        assert_eq!(side_for(4), 1);
        assert_eq!(side_for(5), 2);
        assert_eq!(side_for(16), 2);
        assert_eq!(side_for(17), 3);
        assert_eq!(side_for(36), 3);
        assert_eq!(side_for(37), 4);
    }

    #[test]
    fn side_for_is_minimal() {
        for len in 1..5000usize {
            let s = side_for(len);
            assert!(s * s * CHANNELS >= len, "len {len} does not fit side {s}");
            assert!((s - 1) * (s - 1) * CHANNELS < len, "side {s} not minimal for {len}");
        }
    }

    #[test]
    fn from_framed_pads_with_zeros() {
        // [1..7] -> 2x2 grid, as in the worked example of the format.
        let grid = PixelGrid::from_framed(vec![0, 0, 0, 7, 1, 2, 3, 4, 5, 6, 7]).unwrap();
        assert_eq!(grid.side(), 2);
        assert_eq!(grid.cell(0, 0), Some([0, 0, 0, 7]));
        assert_eq!(grid.cell(0, 1), Some([1, 2, 3, 4]));
        assert_eq!(grid.cell(1, 0), Some([5, 6, 7, 0]));
        assert_eq!(grid.cell(1, 1), Some([0, 0, 0, 0]));
        assert_eq!(grid.cell(2, 0), None);
    }

    #[test]
    fn from_framed_empty_is_one_cell() {
        let grid = PixelGrid::from_framed(Vec::new()).unwrap();
        assert_eq!(grid.side(), 1);
        assert_eq!(grid.cell_count(), 1);
    }

    #[test]
    fn rows_have_side_cells() {
        let grid = PixelGrid::from_framed(vec![9; 40]).unwrap();
        assert_eq!(grid.side(), 4);
        let rows: Vec<&[u8]> = grid.rows().collect();
        assert_eq!(rows.len(), 4);
        assert!(rows.iter().all(|r| r.len() == 16));
    }

    #[test]
    fn from_raw_rejects_wrong_length() {
        let err = PixelGrid::from_raw(2, vec![0; 15]).unwrap_err();
        assert!(matches!(err, CodecError::CorruptPayload(_)));
        assert!(PixelGrid::from_raw(0, Vec::new()).is_err());
        assert!(PixelGrid::from_raw(2, vec![0; 16]).is_ok());
    }
}
