//! # Display Surfaces
//!
//! Where the send side puts rendered grids. A [`RenderSurface`] has a fixed viewport
//! and accepts fully painted RGBA frames; [`PngSurface`] writes each one to disk.

use std::path::PathBuf;

use anyhow::Result;
use async_trait::async_trait;
use grid_codec::render::Viewport;
use grid_codec::Grid;
use image::ImageEncoder;
use tracing::debug;

use crate::error::{ShareError, ShareResult};

/// What a presented grid carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridKind {
    /// Encoded payload bytes.
    Payload,
    /// Random placeholder shown while no payload is set.
    Idle,
}

/// A grid painted into an RGBA buffer of viewport size.
#[derive(Debug, Clone)]
pub struct RenderedGrid {
    pub grid: Grid,
    pub viewport: Viewport,
    pub pixels: Vec<u8>,
    pub kind: GridKind,
}

/// Abstract display interface.
#[async_trait]
pub trait RenderSurface: Send {
    /// Size rendered grids must have.
    fn viewport(&self) -> Viewport;

    /// Show one rendered grid, replacing whatever was shown before.
    async fn present(&mut self, frame: &RenderedGrid) -> Result<()>;
}

/// Writes every presented grid to a PNG file.
///
/// A `{}` in the path is replaced with a running frame counter; without one the
/// same file is overwritten each time.
#[derive(Debug, Clone)]
pub struct PngSurface {
    pattern: String,
    viewport: Viewport,
    presented: u64,
}

impl PngSurface {
    pub fn new(pattern: impl Into<String>, viewport: Viewport) -> Self {
        Self {
            pattern: pattern.into(),
            viewport,
            presented: 0,
        }
    }

    /// Path the next presented frame will be written to.
    pub fn next_path(&self) -> PathBuf {
        PathBuf::from(self.pattern.replace("{}", &self.presented.to_string()))
    }

    pub fn presented(&self) -> u64 {
        self.presented
    }
}

/// PNG encoding of an RGBA frame.
pub fn encode_png(frame: &RenderedGrid) -> ShareResult<Vec<u8>> {
    let mut png = Vec::new();
    image::codecs::png::PngEncoder::new(&mut png).write_image(
        &frame.pixels,
        frame.viewport.width,
        frame.viewport.height,
        image::ExtendedColorType::Rgba8,
    )?;
    Ok(png)
}

#[async_trait]
impl RenderSurface for PngSurface {
    fn viewport(&self) -> Viewport {
        self.viewport
    }

    async fn present(&mut self, frame: &RenderedGrid) -> Result<()> {
        if frame.viewport != self.viewport {
            return Err(ShareError::render(
                "png",
                format!(
                    "frame is {}x{}, surface is {}x{}",
                    frame.viewport.width,
                    frame.viewport.height,
                    self.viewport.width,
                    self.viewport.height
                ),
            )
            .into());
        }

        let path = self.next_path();
        let png = encode_png(frame)?;
        tokio::fs::write(&path, png)
            .await
            .map_err(|e| ShareError::io_at("write png", path.display().to_string(), e))?;
        debug!(path = %path.display(), kind = ?frame.kind, "presented grid");
        self.presented += 1;
        Ok(())
    }
}
