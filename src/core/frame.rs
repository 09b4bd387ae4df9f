//! Owned camera and display frames.
//!
//! A [`Frame`] holds its pixels behind an `Arc` so the receive pipeline can hand the
//! same buffer to several consumers without copying. Sampling borrows it through a
//! [`PackedRaster`] view.

use std::sync::Arc;

use grid_codec::sampling::{PackedRaster, PixelLayout};

use crate::config::CropRegion;
use crate::error::{ShareError, ShareResult};

/// Size representation for frame dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Size {
    pub w: u32,
    pub h: u32,
}

/// Packed pixel frame with shared ownership of its buffer.
#[derive(Debug, Clone)]
pub struct Frame {
    pub data: Arc<Vec<u8>>,
    pub width: u32,
    pub height: u32,
    /// Bytes between the starts of consecutive rows.
    pub stride: usize,
    pub layout: PixelLayout,
    /// Presentation timestamp in nanoseconds, when the source knows one.
    pub pts_ns: Option<u64>,
}

impl Frame {
    /// Wrap a tightly packed buffer, checking it covers `width × height` pixels.
    pub fn new(data: Vec<u8>, width: u32, height: u32, layout: PixelLayout) -> ShareResult<Self> {
        let stride = width as usize * layout.bytes_per_pixel();
        Self::with_stride(data, width, height, stride, layout)
    }

    /// Wrap a buffer whose rows are `stride` bytes apart.
    pub fn with_stride(
        data: Vec<u8>,
        width: u32,
        height: u32,
        stride: usize,
        layout: PixelLayout,
    ) -> ShareResult<Self> {
        PackedRaster::with_stride(&data, width, height, stride, layout)?;
        Ok(Self {
            data: Arc::new(data),
            width,
            height,
            stride: stride.max(width as usize * layout.bytes_per_pixel()),
            layout,
            pts_ns: None,
        })
    }

    /// Attach a presentation timestamp.
    pub fn with_pts(mut self, pts_ns: u64) -> Self {
        self.pts_ns = Some(pts_ns);
        self
    }

    pub fn size(&self) -> Size {
        Size {
            w: self.width,
            h: self.height,
        }
    }

    /// Borrowed view for sampling.
    pub fn raster(&self) -> ShareResult<PackedRaster<'_>> {
        Ok(PackedRaster::with_stride(
            &self.data,
            self.width,
            self.height,
            self.stride,
            self.layout,
        )?)
    }

    /// Copy out the pixels inside `region` as a new tightly packed frame.
    pub fn crop(&self, region: CropRegion) -> ShareResult<Frame> {
        if !region.fits(self.width, self.height) {
            return Err(ShareError::invalid_region(
                self.width,
                self.height,
                format!("crop {} lies outside the frame", region),
            ));
        }

        let bpp = self.layout.bytes_per_pixel();
        let row_bytes = region.width as usize * bpp;
        let mut out = Vec::with_capacity(row_bytes * region.height as usize);
        for y in region.y..region.y + region.height {
            let start = y as usize * self.stride + region.x as usize * bpp;
            out.extend_from_slice(&self.data[start..start + row_bytes]);
        }

        let mut cropped = Frame::new(out, region.width, region.height, self.layout)?;
        cropped.pts_ns = self.pts_ns;
        Ok(cropped)
    }
}
