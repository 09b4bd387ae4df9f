// SPDX-License-Identifier: MIT
// Grid painter for the display side, built on fast_image_resize.
// Paints one RGBA pixel per cell into an N×N tile, then nearest-neighbour
// upscales the tile into the caller's viewport buffer. When the viewport is an
// exact multiple of N every cell becomes a solid `W/N × H/N` rectangle. Otherwise
// cell widths differ by a pixel and drift away from the sampler's `W / N` centres,
// so only exact viewports are guaranteed to read back cell for cell.

use fast_image_resize as fir;
use fir::images::{TypedImage, TypedImageRef};
use fir::pixels::U8x4;
use fir::{ResizeAlg, ResizeOptions, Resizer};

use crate::error::CodecError;
use crate::grid::Grid;

/// Pixel size of the drawing surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Bytes of an RGBA buffer covering the viewport.
    pub fn rgba_len(&self) -> usize {
        (self.width as usize) * (self.height as usize) * 4
    }
}

/// Reusable grid painter. Keeps the resizer and tile scratch across frames.
pub struct GridRenderer {
    resizer: Resizer,
    tile: Vec<u8>,
}

impl Default for GridRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl GridRenderer {
    pub fn new() -> Self {
        Self {
            resizer: Resizer::new(),
            tile: Vec::new(),
        }
    }

    /// Paint `grid` into a fresh RGBA buffer of `viewport` size.
    pub fn render(&mut self, grid: &Grid, viewport: Viewport) -> Result<Vec<u8>, CodecError> {
        let mut out = vec![0u8; viewport.rgba_len()];
        self.render_into(grid, viewport, &mut out)?;
        Ok(out)
    }

    /// Paint `grid` into `dst`, which must hold at least `viewport.rgba_len()` bytes.
    pub fn render_into(&mut self, grid: &Grid, viewport: Viewport, dst: &mut [u8]) -> Result<(), CodecError> {
        let n = grid.size().dimension();
        if viewport.width < n || viewport.height < n {
            return Err(CodecError::InvalidGeometry {
                width: viewport.width,
                height: viewport.height,
                grid: n,
            });
        }
        let dst_len = viewport.rgba_len();
        if dst.len() < dst_len {
            return Err(CodecError::BufferTooSmall {
                expected: dst_len,
                actual: dst.len(),
            });
        }

        paint_tile(grid, &mut self.tile);

        if viewport.width == n && viewport.height == n {
            dst[..dst_len].copy_from_slice(&self.tile);
            return Ok(());
        }

        let src_view = TypedImageRef::<U8x4>::from_buffer(n, n, &self.tile)?;
        let mut dst_image = TypedImage::<U8x4>::from_buffer(viewport.width, viewport.height, &mut dst[..dst_len])?;
        let opts = ResizeOptions::new().resize_alg(ResizeAlg::Nearest).use_alpha(false);
        self.resizer.resize_typed::<U8x4>(&src_view, &mut dst_image, &opts)?;
        Ok(())
    }
}

/// One RGBA pixel per cell, row-major.
fn paint_tile(grid: &Grid, tile: &mut Vec<u8>) {
    tile.clear();
    tile.reserve(grid.symbols().len() * 4);
    for symbol in grid.symbols() {
        tile.extend_from_slice(&symbol.color().to_rgba());
    }
}
