// # Raw NV21 Source
//
// FrameSource over a file of back-to-back NV21 frames, the format Android camera
// previews deliver. Every frame has the same declared size.

use std::path::PathBuf;

use anyhow::Result;
use async_trait::async_trait;
use tokio::fs::File;
use tokio::io::AsyncReadExt;
use tracing::debug;

use crate::core::yuv::{nv21_len, nv21_to_rgba};
use crate::core::{Frame, Size};
use crate::error::ShareError;
use crate::session::FrameSource;

/// Reads fixed-size NV21 frames from a file and converts them to RGBA.
#[derive(Debug)]
pub struct Nv21FileSource {
    path: PathBuf,
    size: Size,
    file: Option<File>,
    buffer: Vec<u8>,
    frames_read: u64,
}

impl Nv21FileSource {
    pub fn new(path: impl Into<PathBuf>, width: u32, height: u32) -> Self {
        Self {
            path: path.into(),
            size: Size {
                w: width,
                h: height,
            },
            file: None,
            buffer: vec![0; nv21_len(width, height)],
            frames_read: 0,
        }
    }

    pub fn frame_size(&self) -> Size {
        self.size
    }
}

#[async_trait]
impl FrameSource for Nv21FileSource {
    fn name(&self) -> &str {
        "nv21"
    }

    async fn initialize(&mut self) -> Result<()> {
        if self.size.w == 0 || self.size.h == 0 {
            return Err(ShareError::invalid_region(
                self.size.w,
                self.size.h,
                "NV21 frames need a non-zero size",
            )
            .into());
        }
        let file = File::open(&self.path)
            .await
            .map_err(|e| ShareError::io_at("open nv21", self.path.display().to_string(), e))?;
        self.file = Some(file);
        self.frames_read = 0;
        Ok(())
    }

    async fn next_frame(&mut self) -> Result<Option<Frame>> {
        let Some(file) = self.file.as_mut() else {
            return Err(ShareError::state("closed", "next_frame", "source not initialized").into());
        };

        let mut filled = 0;
        while filled < self.buffer.len() {
            let n = file.read(&mut self.buffer[filled..]).await?;
            if n == 0 {
                break;
            }
            filled += n;
        }

        if filled == 0 {
            return Ok(None);
        }
        if filled < self.buffer.len() {
            return Err(ShareError::frame_source(
                "nv21",
                format!(
                    "frame {} truncated: {} of {} bytes",
                    self.frames_read,
                    filled,
                    self.buffer.len()
                ),
            )
            .into());
        }

        let frame = nv21_to_rgba(&self.buffer, self.size.w, self.size.h)?;
        debug!(frame = self.frames_read, "converted nv21 frame");
        self.frames_read += 1;
        Ok(Some(frame))
    }

    async fn shutdown(&mut self) -> Result<()> {
        self.file = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::yuv::rgba_to_nv21;
    use grid_codec::alphabet::Symbol;
    use grid_codec::classify::classify;
    use grid_codec::sampling::RasterView;

    #[tokio::test]
    async fn test_reads_consecutive_frames() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preview.nv21");

        let red: Vec<u8> = (0..16).flat_map(|_| Symbol::Red.color().to_rgba()).collect();
        let green: Vec<u8> = (0..16).flat_map(|_| Symbol::Green.color().to_rgba()).collect();
        let mut raw = rgba_to_nv21(&red, 4, 4).unwrap();
        raw.extend(rgba_to_nv21(&green, 4, 4).unwrap());
        std::fs::write(&path, raw).unwrap();

        let mut source = Nv21FileSource::new(&path, 4, 4);
        source.initialize().await.unwrap();

        let first = source.next_frame().await.unwrap().unwrap();
        assert_eq!(classify(first.raster().unwrap().pixel(1, 1)), Symbol::Red);
        let second = source.next_frame().await.unwrap().unwrap();
        assert_eq!(classify(second.raster().unwrap().pixel(2, 3)), Symbol::Green);
        assert!(source.next_frame().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_truncated_frame_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("short.nv21");
        std::fs::write(&path, vec![0u8; nv21_len(4, 4) + 5]).unwrap();

        let mut source = Nv21FileSource::new(&path, 4, 4);
        source.initialize().await.unwrap();
        assert!(source.next_frame().await.unwrap().is_some());
        assert!(source.next_frame().await.is_err());
    }

    #[tokio::test]
    async fn test_uninitialized_source() {
        let mut source = Nv21FileSource::new("/tmp/never-opened.nv21", 4, 4);
        assert!(source.next_frame().await.is_err());
    }
}
