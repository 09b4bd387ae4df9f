// SPDX-License-Identifier: MIT
//! # Bit Packing
//!
//! Each byte spreads over four consecutive cells, most significant bit pair first:
//!
//! ```text
//! byte 0b01_10_11_00  →  cells [01, 10, 11, 00]  →  [Red, Green, Blue, Black]
//! ```
//!
//! Cell `c` (row-major) carries pair `c % 4` of byte `c / 4`, taken with a right shift
//! of `6 - 2 * (c % 4)`. The decoder reverses this as
//! `(v0 << 6) | (v1 << 4) | (v2 << 2) | v3`.

use crate::alphabet::Symbol;
use crate::grid::{Grid, GridSize};

/// The 2-bit value at `pair_index` (0 = most significant) of `byte`.
#[inline]
pub fn bit_pair(byte: u8, pair_index: usize) -> u8 {
    (byte >> (6 - pair_index * 2)) & 0b11
}

/// Encode `bytes` into a fresh grid of the given size.
///
/// Bytes past `size.capacity_bytes()` are dropped; a frame carries no more than its
/// capacity, and splitting larger payloads over several frames is the caller's job.
/// Cells past the end of the payload hold the value-0 symbol, so an empty payload
/// yields an all-black grid.
pub fn encode(bytes: &[u8], size: GridSize) -> Grid {
    let cells = (0..size.cells())
        .map(|cell| {
            let value = bytes
                .get(cell / 4)
                .map(|&byte| bit_pair(byte, cell % 4))
                .unwrap_or(0);
            Symbol::from_value(value)
        })
        .collect();

    Grid::from_cells(size, cells)
}

/// Decode a grid back into `floor(N² / 4)` bytes.
///
/// There is no length prefix: padding cells come back as zero bytes and are not
/// distinguishable from payload zeros.
pub fn decode(grid: &Grid) -> Vec<u8> {
    decode_symbols(grid.symbols())
}

/// Pack row-major symbols into bytes, four cells per byte.
///
/// A trailing group of fewer than four symbols is dropped.
pub fn decode_symbols(symbols: &[Symbol]) -> Vec<u8> {
    symbols
        .chunks_exact(4)
        .map(|group| {
            (group[0].value() << 6)
                | (group[1].value() << 4)
                | (group[2].value() << 2)
                | group[3].value()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn size(n: u32) -> GridSize {
        GridSize::new(n).unwrap()
    }

    #[test]
    fn test_bit_pairs() {
        let byte = 0b01_10_11_00;
        assert_eq!(bit_pair(byte, 0), 0b01);
        assert_eq!(bit_pair(byte, 1), 0b10);
        assert_eq!(bit_pair(byte, 2), 0b11);
        assert_eq!(bit_pair(byte, 3), 0b00);
    }

    #[test]
    fn test_worked_example() {
        let input = [0b0110_1100, 0b0000_0000];
        let grid = encode(&input, size(4));

        let mut expected = vec![Symbol::Red, Symbol::Green, Symbol::Blue];
        expected.resize(16, Symbol::Black);
        assert_eq!(grid.symbols(), expected.as_slice());

        // a 4x4 grid holds 4 bytes; the unused cells decode as zero padding
        assert_eq!(decode(&grid), vec![0b0110_1100, 0, 0, 0]);
    }

    #[test]
    fn test_empty_input_is_all_black() {
        let grid = encode(&[], size(16));
        assert!(grid.symbols().iter().all(|&s| s == Symbol::Black));
        assert_eq!(decode(&grid), vec![0u8; 64]);
    }

    #[test]
    fn test_short_input_is_zero_padded() {
        let grid = encode(b"Hi", size(4));
        // second byte lands in cells 4..8, rest is padding
        assert!(grid.symbols()[8..].iter().all(|&s| s == Symbol::Black));
        assert_eq!(decode(&grid), vec![b'H', b'i', 0, 0]);

        let grid = encode(b"Hello", size(16));
        let mut expected = b"Hello".to_vec();
        expected.resize(64, 0);
        assert_eq!(decode(&grid), expected);
    }

    #[test]
    fn test_oversized_input_is_truncated() {
        let long: Vec<u8> = (0..=255).collect();
        assert_eq!(encode(&long, size(4)), encode(&long[..4], size(4)));
        assert_eq!(decode(&encode(&long, size(4))), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_partial_trailing_group_dropped() {
        let symbols = [
            Symbol::Blue,
            Symbol::Blue,
            Symbol::Blue,
            Symbol::Blue,
            Symbol::Red,
            Symbol::Red,
        ];
        assert_eq!(decode_symbols(&symbols), vec![0xFF]);

        // odd grid: 9 cells → 2 bytes, last cell ignored
        let grid = encode(&[0x1B, 0xE4, 0xFF], size(3));
        assert_eq!(decode(&grid), vec![0x1B, 0xE4]);
    }
}
