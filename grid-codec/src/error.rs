// SPDX-License-Identifier: MIT
// Errors for the few codec operations that can fail: raster geometry,
// caller-provided buffer sizes and the renderer's resize step.

use fast_image_resize as fir;

#[derive(Debug)]
pub enum CodecError {
    /// Raster dimensions leave the cell geometry undefined (zero size, or fewer
    /// pixels than grid cells along an axis).
    InvalidGeometry { width: u32, height: u32, grid: u32 },
    /// A pixel buffer is shorter than its declared dimensions require.
    BufferTooSmall { expected: usize, actual: usize },
    /// A symbol or colour list does not match the grid's cell count.
    SymbolCount { expected: usize, actual: usize },
    /// Grid dimension of zero.
    ZeroGrid,
    /// Sampling neighbourhood wider than the sampler allows.
    RadiusTooLarge { radius: u32, max: u32 },
    Fir(fir::ResizeError),
    ImageBuf(fir::ImageBufferError),
}

impl From<fir::ResizeError> for CodecError { fn from(e: fir::ResizeError) -> Self { Self::Fir(e) } }
impl From<fir::ImageBufferError> for CodecError { fn from(e: fir::ImageBufferError) -> Self { Self::ImageBuf(e) } }

impl CodecError {
    /// Whether this is a geometry failure rather than a buffer or resize problem.
    pub fn is_geometry(&self) -> bool {
        matches!(self, CodecError::InvalidGeometry { .. } | CodecError::ZeroGrid)
    }
}

impl std::fmt::Display for CodecError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CodecError::InvalidGeometry { width, height, grid } => write!(
                f,
                "Invalid geometry: {}x{} raster cannot hold a {}x{} grid",
                width, height, grid, grid
            ),
            CodecError::BufferTooSmall { expected, actual } => {
                write!(f, "Pixel buffer too small: need {} bytes, got {}", expected, actual)
            }
            CodecError::SymbolCount { expected, actual } => {
                write!(f, "Cell count mismatch: expected {}, got {}", expected, actual)
            }
            CodecError::ZeroGrid => write!(f, "Grid dimension must be at least 1"),
            CodecError::RadiusTooLarge { radius, max } => {
                write!(f, "Sampling radius {} exceeds the maximum of {}", radius, max)
            }
            CodecError::Fir(e) => write!(f, "Fast image resize error: {}", e),
            CodecError::ImageBuf(e) => write!(f, "Image buffer error: {}", e),
        }
    }
}

impl std::error::Error for CodecError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CodecError::Fir(e) => Some(e),
            CodecError::ImageBuf(e) => Some(e),
            _ => None,
        }
    }
}
