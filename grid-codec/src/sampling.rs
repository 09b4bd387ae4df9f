// SPDX-License-Identifier: MIT
//! # Cell Geometry and Colour Sampling
//!
//! The receiving side divides a captured raster into an N×N lattice and reads one
//! averaged colour per cell.
//!
//! ## Geometry
//!
//! For a W×H raster and grid dimension N, cells are `cw = W / N` by `ch = H / N`
//! pixels (integer division). Cell `(row, col)` is sampled at
//! `(col * cw + cw / 2, row * ch + ch / 2)`.
//!
//! ## Neighbourhood Averaging
//!
//! The sample is the per-channel arithmetic mean over a `(2r + 1)²` square around the
//! centre (r = 1 by default, a 3×3 patch). Coordinates are clamped to the raster, so
//! edge samples count the border pixel repeatedly instead of reading out of bounds.
//! The mean truncates toward zero. Averaging suppresses single-pixel sensor noise.

use crate::alphabet::Rgb;
use crate::error::CodecError;
use crate::grid::GridSize;

/// Default neighbourhood radius (3×3 patch).
pub const DEFAULT_RADIUS: u32 = 1;

/// Largest neighbourhood radius accepted (a 33×33 patch).
pub const MAX_RADIUS: u32 = 16;

/// Read access to a raster image.
///
/// Implementations must return a colour for every `x < width()` and `y < height()`.
pub trait RasterView {
    fn width(&self) -> u32;
    fn height(&self) -> u32;
    fn pixel(&self, x: u32, y: u32) -> Rgb;
}

/// Channel order of a packed pixel buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelLayout {
    Rgb,
    Rgba,
    Bgra,
}

impl PixelLayout {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelLayout::Rgb => 3,
            PixelLayout::Rgba | PixelLayout::Bgra => 4,
        }
    }
}

/// Borrowed, possibly strided, packed pixel buffer.
#[derive(Clone, Copy, Debug)]
pub struct PackedRaster<'a> {
    data: &'a [u8],
    width: u32,
    height: u32,
    stride: usize,
    layout: PixelLayout,
}

impl<'a> PackedRaster<'a> {
    /// Wrap a tightly packed buffer (`stride = width * bytes_per_pixel`).
    pub fn new(data: &'a [u8], width: u32, height: u32, layout: PixelLayout) -> Result<Self, CodecError> {
        Self::with_stride(data, width, height, width as usize * layout.bytes_per_pixel(), layout)
    }

    /// Wrap a buffer whose rows are `stride` bytes apart.
    pub fn with_stride(
        data: &'a [u8],
        width: u32,
        height: u32,
        stride: usize,
        layout: PixelLayout,
    ) -> Result<Self, CodecError> {
        let row_bytes = width as usize * layout.bytes_per_pixel();
        let stride = stride.max(row_bytes);
        // last row only needs its pixels, not the full stride
        let expected = match height {
            0 => 0,
            h => stride * (h as usize - 1) + row_bytes,
        };
        if data.len() < expected {
            return Err(CodecError::BufferTooSmall {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            data,
            width,
            height,
            stride,
            layout,
        })
    }

    pub fn layout(&self) -> PixelLayout {
        self.layout
    }
}

impl RasterView for PackedRaster<'_> {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn pixel(&self, x: u32, y: u32) -> Rgb {
        let off = y as usize * self.stride + x as usize * self.layout.bytes_per_pixel();
        let p = &self.data[off..off + self.layout.bytes_per_pixel()];
        match self.layout {
            PixelLayout::Rgb | PixelLayout::Rgba => Rgb::new(p[0], p[1], p[2]),
            PixelLayout::Bgra => Rgb::new(p[2], p[1], p[0]),
        }
    }
}

/// Cell lattice laid over a raster of known size.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CellGeometry {
    pub cell_width: u32,
    pub cell_height: u32,
    size: GridSize,
}

impl CellGeometry {
    /// Geometry for a `width`×`height` raster.
    ///
    /// Fails with [`CodecError::InvalidGeometry`] when either dimension is zero or
    /// smaller than the grid dimension, since cells would then be zero pixels wide.
    pub fn new(width: u32, height: u32, size: GridSize) -> Result<Self, CodecError> {
        let n = size.dimension();
        if width < n || height < n {
            return Err(CodecError::InvalidGeometry {
                width,
                height,
                grid: n,
            });
        }
        Ok(Self {
            cell_width: width / n,
            cell_height: height / n,
            size,
        })
    }

    pub fn size(&self) -> GridSize {
        self.size
    }

    /// Sample centre of cell `(row, col)`.
    pub fn center(&self, row: u32, col: u32) -> (u32, u32) {
        (
            col * self.cell_width + self.cell_width / 2,
            row * self.cell_height + self.cell_height / 2,
        )
    }

    /// All sample centres in row-major order.
    pub fn centers(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        let n = self.size.dimension();
        (0..n).flat_map(move |row| (0..n).map(move |col| self.center(row, col)))
    }
}

/// Mean colour of the `(2 * radius + 1)²` neighbourhood around `(cx, cy)`, with
/// coordinates clamped to the raster.
///
/// Fails with [`CodecError::InvalidGeometry`] on an empty raster and with
/// [`CodecError::RadiusTooLarge`] above [`MAX_RADIUS`].
pub fn sample_cell<R: RasterView + ?Sized>(
    raster: &R,
    cx: u32,
    cy: u32,
    radius: u32,
) -> Result<Rgb, CodecError> {
    if raster.width() == 0 || raster.height() == 0 {
        return Err(CodecError::InvalidGeometry {
            width: raster.width(),
            height: raster.height(),
            grid: 1,
        });
    }
    if radius > MAX_RADIUS {
        return Err(CodecError::RadiusTooLarge {
            radius,
            max: MAX_RADIUS,
        });
    }

    let max_x = i64::from(raster.width()) - 1;
    let max_y = i64::from(raster.height()) - 1;
    let r = i64::from(radius);

    let (mut sr, mut sg, mut sb, mut count) = (0u64, 0u64, 0u64, 0u64);
    for dx in -r..=r {
        for dy in -r..=r {
            let x = (i64::from(cx) + dx).clamp(0, max_x) as u32;
            let y = (i64::from(cy) + dy).clamp(0, max_y) as u32;
            let p = raster.pixel(x, y);
            sr += u64::from(p.r);
            sg += u64::from(p.g);
            sb += u64::from(p.b);
            count += 1;
        }
    }

    Ok(Rgb::new((sr / count) as u8, (sg / count) as u8, (sb / count) as u8))
}

/// One averaged colour per cell, row-major.
pub fn sample_grid<R: RasterView + ?Sized>(
    raster: &R,
    size: GridSize,
    radius: u32,
) -> Result<Vec<Rgb>, CodecError> {
    let geometry = CellGeometry::new(raster.width(), raster.height(), size)?;
    geometry
        .centers()
        .map(|(x, y)| sample_cell(raster, x, y, radius))
        .collect()
}
