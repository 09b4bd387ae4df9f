// # Image Sequence Source
//
// FrameSource over a list of still images (PNG, JPEG, ...), one frame per file.
// Useful for decoding photos of a displayed grid or frames dumped by a camera app.

use std::path::PathBuf;

use anyhow::Result;
use async_trait::async_trait;
use grid_codec::sampling::PixelLayout;
use tracing::debug;

use crate::core::Frame;
use crate::error::ShareError;
use crate::session::FrameSource;

/// Reads image files in order and yields them as RGBA frames.
#[derive(Debug)]
pub struct ImageSequenceSource {
    paths: Vec<PathBuf>,
    next: usize,
}

impl ImageSequenceSource {
    pub fn new<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
            next: 0,
        }
    }

    /// Number of images still to be read.
    pub fn remaining(&self) -> usize {
        self.paths.len() - self.next
    }
}

#[async_trait]
impl FrameSource for ImageSequenceSource {
    fn name(&self) -> &str {
        "images"
    }

    async fn initialize(&mut self) -> Result<()> {
        self.next = 0;
        Ok(())
    }

    async fn next_frame(&mut self) -> Result<Option<Frame>> {
        let Some(path) = self.paths.get(self.next) else {
            return Ok(None);
        };
        self.next += 1;

        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| ShareError::io_at("read image", path.display().to_string(), e))?;
        let image = image::load_from_memory(&bytes)
            .map_err(|e| {
                ShareError::frame_source("images", e.to_string())
                    .with_context(path.display().to_string())
            })?
            .to_rgba8();

        let (width, height) = image.dimensions();
        debug!(path = %path.display(), width, height, "loaded image frame");
        Ok(Some(Frame::new(
            image.into_raw(),
            width,
            height,
            PixelLayout::Rgba,
        )?))
    }

    async fn shutdown(&mut self) -> Result<()> {
        self.next = self.paths.len();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grid_codec::sampling::RasterView;

    #[tokio::test]
    async fn test_reads_images_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut paths = Vec::new();
        for (i, shade) in [10u8, 200].iter().enumerate() {
            let path = dir.path().join(format!("frame{i}.png"));
            image::RgbaImage::from_pixel(4, 3, image::Rgba([*shade, 0, 0, 255]))
                .save(&path)
                .unwrap();
            paths.push(path);
        }

        let mut source = ImageSequenceSource::new(paths);
        source.initialize().await.unwrap();
        assert_eq!(source.remaining(), 2);

        let first = source.next_frame().await.unwrap().unwrap();
        assert_eq!((first.width, first.height), (4, 3));
        assert_eq!(first.raster().unwrap().pixel(0, 0).r, 10);

        let second = source.next_frame().await.unwrap().unwrap();
        assert_eq!(second.raster().unwrap().pixel(3, 2).r, 200);

        assert!(source.next_frame().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_missing_file_is_error() {
        let mut source = ImageSequenceSource::new(["/nonexistent/grid.png"]);
        assert!(source.next_frame().await.is_err());
    }

    #[tokio::test]
    async fn test_garbage_file_is_source_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("junk.png");
        std::fs::write(&path, b"not an image").unwrap();

        let mut source = ImageSequenceSource::new([path]);
        let err = source.next_frame().await.unwrap_err();
        let share = err.downcast_ref::<ShareError>().unwrap();
        assert_eq!(share.category(), "frame_source");
    }
}
