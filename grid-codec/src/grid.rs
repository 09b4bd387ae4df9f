// SPDX-License-Identifier: MIT
//! # Grid Dimensions and Storage
//!
//! A grid is an N×N matrix of symbols stored as one flat, row-major sequence:
//! cell `(row, col)` lives at index `row * N + col`. Keeping it flat means the codec
//! walks a single slice in the same order on both sides, with no nested ownership.
//!
//! ## Capacity
//!
//! - cells: `N²`
//! - bits: `N² × 2`
//! - bytes: `floor(N² / 4)`; exact whenever N is even
//!
//! Odd dimensions are representable (the decoder drops the incomplete trailing group)
//! but configuration layers should insist on even N.

use crate::alphabet::Symbol;
use crate::error::CodecError;

/// Side length of a square grid, in cells. Never zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GridSize(u32);

impl GridSize {
    /// Reference configuration used by both devices unless told otherwise.
    pub const DEFAULT: GridSize = GridSize(16);

    pub fn new(dimension: u32) -> Result<Self, CodecError> {
        if dimension == 0 {
            return Err(CodecError::ZeroGrid);
        }
        Ok(Self(dimension))
    }

    /// Cells per row (and per column).
    pub fn dimension(self) -> u32 {
        self.0
    }

    /// Total number of cells, `N²`.
    pub fn cells(self) -> usize {
        (self.0 as usize) * (self.0 as usize)
    }

    /// Payload bits one frame carries.
    pub fn capacity_bits(self) -> usize {
        self.cells() * 2
    }

    /// Payload bytes one frame carries, `floor(N² / 4)`.
    pub fn capacity_bytes(self) -> usize {
        self.cells() / 4
    }
}

impl Default for GridSize {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl std::fmt::Display for GridSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.0, self.0)
    }
}

/// Named grid densities for the command line.
///
/// Denser grids carry more bytes per frame but give each cell fewer camera pixels,
/// which costs noise margin at a distance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum GridPreset {
    /// 8×8 cells, 16 bytes per frame
    Coarse,
    /// 16×16 cells, 64 bytes per frame
    Standard,
    /// 32×32 cells, 256 bytes per frame
    Fine,
}

impl GridPreset {
    pub fn size(self) -> GridSize {
        match self {
            GridPreset::Coarse => GridSize(8),
            GridPreset::Standard => GridSize(16),
            GridPreset::Fine => GridSize(32),
        }
    }
}

/// An N×N grid of symbols in row-major order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Grid {
    size: GridSize,
    cells: Vec<Symbol>,
}

impl Grid {
    /// A grid with every cell set to `symbol`.
    pub fn filled(size: GridSize, symbol: Symbol) -> Self {
        Self {
            size,
            cells: vec![symbol; size.cells()],
        }
    }

    /// Wrap a row-major symbol list. The list must hold exactly `N²` symbols.
    pub fn from_symbols(size: GridSize, cells: Vec<Symbol>) -> Result<Self, CodecError> {
        if cells.len() != size.cells() {
            return Err(CodecError::SymbolCount {
                expected: size.cells(),
                actual: cells.len(),
            });
        }
        Ok(Self { size, cells })
    }

    /// Internal constructor for callers that build exactly `N²` cells.
    pub(crate) fn from_cells(size: GridSize, cells: Vec<Symbol>) -> Self {
        debug_assert_eq!(cells.len(), size.cells());
        Self { size, cells }
    }

    pub fn size(&self) -> GridSize {
        self.size
    }

    /// Symbol at `(row, col)`, or `None` outside the grid.
    pub fn get(&self, row: u32, col: u32) -> Option<Symbol> {
        let n = self.size.dimension();
        if row >= n || col >= n {
            return None;
        }
        self.cells.get(cell_index(n, row, col)).copied()
    }

    /// All cells, row-major.
    pub fn symbols(&self) -> &[Symbol] {
        &self.cells
    }

    /// Iterate rows as slices of length N.
    pub fn rows(&self) -> impl Iterator<Item = &[Symbol]> {
        self.cells.chunks(self.size.dimension() as usize)
    }

    pub fn into_symbols(self) -> Vec<Symbol> {
        self.cells
    }
}

/// Row-major index of `(row, col)`, computed in `usize` so large grids do not wrap.
fn cell_index(n: u32, row: u32, col: u32) -> usize {
    row as usize * n as usize + col as usize
}
