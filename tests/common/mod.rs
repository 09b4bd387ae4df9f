//! Common test utilities and helpers for the lightshare tests
//!
//! Synthetic camera frames, in-memory sources, sinks and surfaces.

#![allow(dead_code)]

pub mod test_frames {
    use grid_codec::codec::encode;
    use grid_codec::render::{GridRenderer, Viewport};
    use grid_codec::GridSize;
    use lightshare::core::Frame;
    use grid_codec::sampling::PixelLayout;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    /// RGBA rendering of `payload` at exactly `width × height`.
    pub fn rendered_grid(payload: &[u8], size: GridSize, width: u32, height: u32) -> Vec<u8> {
        GridRenderer::new()
            .render(&encode(payload, size), Viewport::new(width, height))
            .unwrap()
    }

    /// Camera-like frame: the grid occupies a `grid_px × grid_px` square at
    /// `(x, y)` on a grey background, every channel jittered by up to ±`noise`.
    pub fn camera_frame(
        payload: &[u8],
        size: GridSize,
        frame: (u32, u32),
        at: (u32, u32),
        grid_px: u32,
        noise: i16,
        seed: u64,
    ) -> Vec<u8> {
        let (fw, fh) = frame;
        let grid = rendered_grid(payload, size, grid_px, grid_px);
        let mut rng = StdRng::seed_from_u64(seed);
        let mut out = vec![0u8; (fw * fh * 4) as usize];

        for y in 0..fh {
            for x in 0..fw {
                let inside = x >= at.0 && x < at.0 + grid_px && y >= at.1 && y < at.1 + grid_px;
                let base = if inside {
                    let i = (((y - at.1) * grid_px + (x - at.0)) * 4) as usize;
                    [grid[i], grid[i + 1], grid[i + 2]]
                } else {
                    [90, 90, 90]
                };
                let o = ((y * fw + x) * 4) as usize;
                for c in 0..3 {
                    let jitter = if noise > 0 { rng.gen_range(-noise..=noise) } else { 0 };
                    out[o + c] = (i16::from(base[c]) + jitter).clamp(0, 255) as u8;
                }
                out[o + 3] = 255;
            }
        }
        out
    }

    pub fn rgba_frame(pixels: Vec<u8>, width: u32, height: u32) -> Frame {
        Frame::new(pixels, width, height, PixelLayout::Rgba).unwrap()
    }
}

pub mod mock_source {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use anyhow::Result;
    use async_trait::async_trait;
    use lightshare::core::Frame;
    use lightshare::error::ShareError;
    use lightshare::session::FrameSource;

    /// Item a [`VecSource`] yields.
    pub enum Scripted {
        Frame(Frame),
        /// A transient frame-source failure.
        Glitch,
    }

    /// Frame source replaying a fixed script.
    pub struct VecSource {
        script: VecDeque<Scripted>,
        closed: Arc<AtomicBool>,
    }

    impl VecSource {
        pub fn new(frames: Vec<Frame>) -> Self {
            Self::scripted(frames.into_iter().map(Scripted::Frame).collect())
        }

        pub fn scripted(script: Vec<Scripted>) -> Self {
            Self {
                script: script.into(),
                closed: Arc::new(AtomicBool::new(false)),
            }
        }

        /// Flag raised when the session shuts the source down.
        pub fn closed(&self) -> Arc<AtomicBool> {
            self.closed.clone()
        }
    }

    #[async_trait]
    impl FrameSource for VecSource {
        fn name(&self) -> &str {
            "vec"
        }

        async fn initialize(&mut self) -> Result<()> {
            Ok(())
        }

        async fn next_frame(&mut self) -> Result<Option<Frame>> {
            match self.script.pop_front() {
                Some(Scripted::Frame(frame)) => Ok(Some(frame)),
                Some(Scripted::Glitch) => {
                    Err(ShareError::frame_source("vec", "dropped frame").into())
                }
                None => Ok(None),
            }
        }

        async fn shutdown(&mut self) -> Result<()> {
            self.closed.store(true, Ordering::Release);
            Ok(())
        }
    }
}

pub mod mock_sink {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};

    use anyhow::Result;
    use async_trait::async_trait;
    use lightshare::processing::{DecodedFrame, PayloadSink};

    /// Sink that keeps every delivered frame.
    #[derive(Clone, Default)]
    pub struct CollectingSink {
        pub frames: Arc<Mutex<Vec<DecodedFrame>>>,
        closed: Arc<AtomicBool>,
    }

    impl CollectingSink {
        pub fn is_closed(&self) -> bool {
            self.closed.load(Ordering::Acquire)
        }

        pub fn payloads(&self) -> Vec<Vec<u8>> {
            self.frames
                .lock()
                .unwrap()
                .iter()
                .map(|f| f.payload.clone())
                .collect()
        }
    }

    #[async_trait]
    impl PayloadSink for CollectingSink {
        fn name(&self) -> &str {
            "collect"
        }

        async fn deliver(&mut self, frame: &DecodedFrame) -> Result<()> {
            self.frames.lock().unwrap().push(frame.clone());
            Ok(())
        }

        async fn shutdown(&mut self) -> Result<()> {
            self.closed.store(true, Ordering::Release);
            Ok(())
        }
    }
}

pub mod mock_surface {
    use std::sync::{Arc, Mutex};

    use anyhow::Result;
    use async_trait::async_trait;
    use grid_codec::render::Viewport;
    use lightshare::display::{RenderSurface, RenderedGrid};

    /// Surface that keeps every presented frame in memory.
    #[derive(Clone)]
    pub struct MemorySurface {
        pub viewport: Viewport,
        pub presented: Arc<Mutex<Vec<RenderedGrid>>>,
    }

    impl MemorySurface {
        pub fn new(width: u32, height: u32) -> Self {
            Self {
                viewport: Viewport::new(width, height),
                presented: Arc::new(Mutex::new(Vec::new())),
            }
        }

        pub fn count(&self) -> usize {
            self.presented.lock().unwrap().len()
        }

        pub fn last(&self) -> Option<RenderedGrid> {
            self.presented.lock().unwrap().last().cloned()
        }
    }

    #[async_trait]
    impl RenderSurface for MemorySurface {
        fn viewport(&self) -> Viewport {
            self.viewport
        }

        async fn present(&mut self, frame: &RenderedGrid) -> Result<()> {
            self.presented.lock().unwrap().push(frame.clone());
            Ok(())
        }
    }
}
