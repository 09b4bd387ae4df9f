//! # Frame Processing Pipeline
//!
//! Composable processors applied to camera frames before the grid is sampled.
//!
//! ## Architecture
//!
//! 1. **FrameProcessor Trait**: extensible per-frame transform
//! 2. **ProcessingPipeline**: ordered processor chain
//! 3. **RegionCrop**: cuts the grid out of a larger camera frame
//!
//! ## Shared Buffers
//!
//! Frames carry `Arc<Vec<u8>>` pixel data. A processor that does not change the
//! pixels passes the frame through without copying; a processor that does produces
//! a new frame and drops its reference to the old buffer.

use anyhow::Result;
use async_trait::async_trait;
use tracing::debug;

use crate::config::CropRegion;
use crate::core::{Frame, Size};
use crate::error::ShareError;

/// Abstract frame processing interface.
/// Implement this trait to create custom frame processors.
#[async_trait]
pub trait FrameProcessor: Send {
    /// Initialize the processor with input size and return output size.
    async fn initialize(&mut self, input_size: Size) -> Result<Size>;

    /// Process a single frame.
    ///
    /// # Returns
    /// The processed frame, or None to skip this frame
    async fn process_frame(&mut self, frame: Frame) -> Result<Option<Frame>>;
}

/// Composable processing pipeline.
/// Chains multiple processors together for sequential frame processing.
#[derive(Default)]
pub struct ProcessingPipeline {
    pub processors: Vec<Box<dyn FrameProcessor>>,
}

impl ProcessingPipeline {
    /// Create a new processing pipeline.
    pub fn new() -> Self {
        Self {
            processors: Vec::new(),
        }
    }

    /// Append a processor to the end of the chain.
    pub fn push<P: FrameProcessor + 'static>(&mut self, processor: P) {
        self.processors.push(Box::new(processor));
    }

    /// Initialize the pipeline and return the output size.
    pub async fn initialize(&mut self, input_size: Size) -> Result<Size> {
        let mut current_size = input_size;
        for processor in &mut self.processors {
            current_size = processor.initialize(current_size).await?;
        }
        Ok(current_size)
    }

    /// Process a frame through the entire pipeline.
    /// Returns None as soon as any processor skips the frame.
    pub async fn process_frame(&mut self, frame: Frame) -> Result<Option<Frame>> {
        let mut current_frame = frame;
        for processor in &mut self.processors {
            match processor.process_frame(current_frame).await? {
                Some(processed) => current_frame = processed,
                None => return Ok(None),
            }
        }
        Ok(Some(current_frame))
    }

    pub fn len(&self) -> usize {
        self.processors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processors.is_empty()
    }
}

/// Crops every frame to a fixed region.
///
/// Lets the decoder work on camera frames where the displayed grid covers only
/// part of the picture.
#[derive(Debug, Clone)]
pub struct RegionCrop {
    pub region: CropRegion,
}

impl RegionCrop {
    pub fn new(region: CropRegion) -> Self {
        Self { region }
    }
}

#[async_trait]
impl FrameProcessor for RegionCrop {
    async fn initialize(&mut self, input_size: Size) -> Result<Size> {
        if !self.region.fits(input_size.w, input_size.h) {
            return Err(ShareError::invalid_region(
                input_size.w,
                input_size.h,
                format!("crop {} lies outside the frame", self.region),
            )
            .into());
        }
        debug!(region = %self.region, "crop processor ready");
        Ok(Size {
            w: self.region.width,
            h: self.region.height,
        })
    }

    async fn process_frame(&mut self, frame: Frame) -> Result<Option<Frame>> {
        Ok(Some(frame.crop(self.region)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grid_codec::sampling::PixelLayout;

    /// Drops every other frame.
    struct Alternate {
        keep: bool,
    }

    #[async_trait]
    impl FrameProcessor for Alternate {
        async fn initialize(&mut self, input_size: Size) -> Result<Size> {
            Ok(input_size)
        }

        async fn process_frame(&mut self, frame: Frame) -> Result<Option<Frame>> {
            self.keep = !self.keep;
            Ok(self.keep.then_some(frame))
        }
    }

    fn blank(width: u32, height: u32) -> Frame {
        Frame::new(
            vec![0; (width * height * 4) as usize],
            width,
            height,
            PixelLayout::Rgba,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_pipeline_sizes_chain() {
        let mut pipeline = ProcessingPipeline::new();
        pipeline.push(RegionCrop::new(CropRegion::new(10, 10, 64, 48)));
        pipeline.push(RegionCrop::new(CropRegion::new(0, 0, 32, 32)));

        let out = pipeline.initialize(Size { w: 100, h: 100 }).await.unwrap();
        assert_eq!(out, Size { w: 32, h: 32 });

        let frame = pipeline.process_frame(blank(100, 100)).await.unwrap().unwrap();
        assert_eq!(frame.size(), Size { w: 32, h: 32 });
    }

    #[tokio::test]
    async fn test_skipped_frame_stops_chain() {
        let mut pipeline = ProcessingPipeline::new();
        pipeline.push(Alternate { keep: false });
        pipeline.push(RegionCrop::new(CropRegion::new(0, 0, 2, 2)));
        pipeline.initialize(Size { w: 4, h: 4 }).await.unwrap();

        assert!(pipeline.process_frame(blank(4, 4)).await.unwrap().is_some());
        assert!(pipeline.process_frame(blank(4, 4)).await.unwrap().is_none());
        assert!(pipeline.process_frame(blank(4, 4)).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_crop_outside_input_fails_initialize() {
        let mut crop = RegionCrop::new(CropRegion::new(50, 0, 64, 64));
        let err = crop.initialize(Size { w: 100, h: 100 }).await.unwrap_err();
        let share = err.downcast_ref::<ShareError>().unwrap();
        assert_eq!(share.category(), "invalid_geometry");
    }

    #[tokio::test]
    async fn test_empty_pipeline_passes_frames() {
        let mut pipeline = ProcessingPipeline::new();
        assert!(pipeline.is_empty());
        let frame = blank(3, 3);
        let data = frame.data.clone();
        let out = pipeline.process_frame(frame).await.unwrap().unwrap();
        assert!(std::sync::Arc::ptr_eq(&out.data, &data));
    }
}
