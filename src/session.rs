//! # Share Session Management
//!
//! High-level orchestration of both ends of the link. Provides a builder-pattern API
//! for the receive side and a shareable handle for the send side.
//!
//! ## Architecture
//!
//! 1. **FrameSource Trait**: abstract interface for camera-like frame producers
//! 2. **ReceiveSession**: source → processors → grid decoder → sinks
//! 3. **ReceiveSessionBuilder**: fluent API for session configuration
//! 4. **SendSession**: encodes payloads onto a [`RenderSurface`] and animates a random
//!    placeholder grid while nothing is being sent
//!
//! ## Error Policy
//!
//! Geometry errors stop a session: a frame that cannot hold the grid will not
//! start holding it on the next frame. A frame-source error that
//! [`classify::can_skip`] allows drops the frame, and the session waits
//! [`classify::retry_after`] before pulling again, up to
//! [`MAX_CONSECUTIVE_SOURCE_ERRORS`] in a row. Sources and sinks are shut down
//! however the run ends.

// Standard library imports
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

// External crate imports
use anyhow::Result;
use async_trait::async_trait;
use grid_codec::alphabet::Symbol;
use grid_codec::codec::encode;
use grid_codec::render::{GridRenderer, Viewport};
use grid_codec::{Grid, GridSize};
use rand::Rng;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

// Internal module imports
use crate::config::{CropRegion, ShareConfig};
use crate::core::{Frame, Size};
use crate::display::{GridKind, RenderSurface, RenderedGrid};
use crate::error::{classify, ShareError, ShareResult};
use crate::processing::{
    FrameProcessor, GridDecoder, PayloadSink, ProcessingPipeline, RegionCrop, SinkMultiplexer,
};

/// Source errors tolerated back to back before the receive session gives up.
pub const MAX_CONSECUTIVE_SOURCE_ERRORS: u32 = 3;

/// Abstract interface for frame sources.
/// Enables pluggable camera backends and recorded inputs.
#[async_trait]
pub trait FrameSource: Send {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Prepares the source before the first frame.
    async fn initialize(&mut self) -> Result<()>;

    /// Next frame, or `None` once the source is exhausted.
    async fn next_frame(&mut self) -> Result<Option<Frame>>;

    /// Releases the source.
    async fn shutdown(&mut self) -> Result<()>;
}

/// Counters from one receive session run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReceiveReport {
    /// Frames produced by the source.
    pub frames_seen: u64,
    /// Frames that made it through the pipeline and were decoded.
    pub frames_decoded: u64,
    /// Decoded frames handed to the sinks.
    pub frames_delivered: u64,
    /// Frames dropped by a processor.
    pub frames_skipped: u64,
    /// Decoded frames withheld because the payload had not changed.
    pub frames_unchanged: u64,
    /// Source errors skipped over.
    pub source_errors: u64,
    /// Ambiguous cells summed over every decoded frame.
    pub ambiguous_cells: u64,
}

/// Receiving end: decodes every frame a source produces.
pub struct ReceiveSession {
    source: Box<dyn FrameSource>,
    pipeline: ProcessingPipeline,
    decoder: GridDecoder,
    sinks: SinkMultiplexer,
    only_changes: bool,
    max_frames: Option<u64>,
}

impl ReceiveSession {
    /// Create a new receive session using the builder pattern.
    pub fn builder() -> ReceiveSessionBuilder {
        ReceiveSessionBuilder::new()
    }

    /// Run until the source is exhausted or the frame limit is reached.
    ///
    /// Sinks and source are shut down on every exit path once the source has
    /// initialized; the first error wins.
    pub async fn run(mut self) -> Result<ReceiveReport> {
        self.source.initialize().await?;

        let mut report = ReceiveReport::default();
        let outcome = self.receive(&mut report).await;
        let closed = self.close().await;
        if let (Err(_), Err(e)) = (&outcome, &closed) {
            warn!(error = %e, "shutdown after a failed run also failed");
        }
        outcome?;
        closed?;

        info!(
            seen = report.frames_seen,
            decoded = report.frames_decoded,
            delivered = report.frames_delivered,
            skipped = report.frames_skipped,
            unchanged = report.frames_unchanged,
            "receive session finished"
        );
        Ok(report)
    }

    async fn receive(&mut self, report: &mut ReceiveReport) -> Result<()> {
        self.sinks.initialize().await?;

        info!(
            source = self.source.name(),
            grid = %self.decoder.size(),
            processors = self.pipeline.len(),
            sinks = self.sinks.sink_count(),
            "receive session started"
        );

        let mut input_size: Option<Size> = None;
        let mut last_payload: Option<Vec<u8>> = None;
        let mut consecutive_errors = 0;

        loop {
            if self.max_frames.is_some_and(|max| report.frames_seen >= max) {
                return Ok(());
            }

            let frame = match self.source.next_frame().await {
                Ok(Some(frame)) => frame,
                Ok(None) => return Ok(()),
                Err(e) => {
                    consecutive_errors += 1;
                    let delay = classify::find(&e)
                        .filter(|share| classify::can_skip(share))
                        .and_then(|share| classify::retry_after(share, consecutive_errors));
                    let Some(delay) = delay else {
                        return Err(e);
                    };
                    warn!(error = %e, attempt = consecutive_errors, "skipping unreadable frame");
                    report.source_errors += 1;
                    tokio::time::sleep(delay).await;
                    continue;
                }
            };
            consecutive_errors = 0;
            report.frames_seen += 1;

            if input_size != Some(frame.size()) {
                let out = self.pipeline.initialize(frame.size()).await?;
                debug!(
                    input = ?frame.size(),
                    output = ?out,
                    "pipeline initialized"
                );
                input_size = Some(frame.size());
            }

            let Some(frame) = self.pipeline.process_frame(frame).await? else {
                report.frames_skipped += 1;
                continue;
            };

            let decoded = self.decoder.decode_frame(&frame)?;
            report.frames_decoded += 1;
            report.ambiguous_cells += decoded.ambiguous_cells as u64;
            if decoded.ambiguous_cells > 0 {
                debug!(
                    frame = decoded.index,
                    cells = decoded.ambiguous_cells,
                    "ambiguous cells in frame"
                );
            }

            if self.only_changes && last_payload.as_deref() == Some(decoded.payload.as_slice()) {
                report.frames_unchanged += 1;
                continue;
            }

            self.sinks.deliver(&decoded).await?;
            report.frames_delivered += 1;
            last_payload = Some(decoded.payload);
        }
    }

    async fn close(&mut self) -> Result<()> {
        let sinks = self.sinks.shutdown().await;
        let source = self.source.shutdown().await;
        sinks.and(source)
    }
}

/// Builder for creating receive sessions with fluent API.
pub struct ReceiveSessionBuilder {
    source: Option<Box<dyn FrameSource>>,
    processors: Vec<Box<dyn FrameProcessor>>,
    sinks: Vec<Box<dyn PayloadSink>>,
    grid: GridSize,
    radius: u32,
    ambiguity_margin: Option<f64>,
    only_changes: bool,
    max_frames: Option<u64>,
}

impl Default for ReceiveSessionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ReceiveSessionBuilder {
    /// Create a new session builder.
    pub fn new() -> Self {
        Self {
            source: None,
            processors: Vec::new(),
            sinks: Vec::new(),
            grid: GridSize::DEFAULT,
            radius: grid_codec::sampling::DEFAULT_RADIUS,
            ambiguity_margin: None,
            only_changes: false,
            max_frames: None,
        }
    }

    /// Apply grid size, sampling radius, crop and de-duplication from a validated
    /// configuration.
    pub fn with_config(mut self, config: &ShareConfig) -> ShareResult<Self> {
        config.validate()?;
        self.grid = config.grid()?;
        self.radius = config.sample_radius;
        self.only_changes = config.only_changes;
        if let Some(region) = config.crop {
            self = self.with_crop(region);
        }
        Ok(self)
    }

    /// Set the frame source for the session.
    pub fn with_source<S: FrameSource + 'static>(mut self, source: S) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Add a processor to the end of the pipeline.
    pub fn with_processor<P: FrameProcessor + 'static>(mut self, processor: P) -> Self {
        self.processors.push(Box::new(processor));
        self
    }

    /// Add a crop processor for the given region.
    pub fn with_crop(self, region: CropRegion) -> Self {
        self.with_processor(RegionCrop::new(region))
    }

    /// Add a payload sink.
    pub fn with_sink<S: PayloadSink + 'static>(mut self, sink: S) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    pub fn with_grid(mut self, grid: GridSize) -> Self {
        self.grid = grid;
        self
    }

    pub fn with_radius(mut self, radius: u32) -> Self {
        self.radius = radius;
        self
    }

    pub fn with_ambiguity_margin(mut self, margin: f64) -> Self {
        self.ambiguity_margin = Some(margin);
        self
    }

    /// Deliver a payload only when it differs from the previous one.
    pub fn only_changes(mut self, only_changes: bool) -> Self {
        self.only_changes = only_changes;
        self
    }

    /// Stop after this many source frames.
    pub fn max_frames(mut self, max_frames: u64) -> Self {
        self.max_frames = Some(max_frames);
        self
    }

    /// Build the receive session with the configured components.
    pub fn build(self) -> Result<ReceiveSession> {
        let source = self
            .source
            .ok_or_else(|| anyhow::anyhow!("No frame source specified"))?;
        if self.sinks.is_empty() {
            return Err(anyhow::anyhow!("At least one sink must be configured"));
        }

        let mut pipeline = ProcessingPipeline::new();
        pipeline.processors.extend(self.processors);

        let mut sinks = SinkMultiplexer::new();
        sinks.sinks.extend(self.sinks);

        let mut decoder = GridDecoder::new(self.grid, self.radius);
        if let Some(margin) = self.ambiguity_margin {
            decoder = decoder.with_ambiguity_margin(margin);
        }

        Ok(ReceiveSession {
            source,
            pipeline,
            decoder,
            sinks,
            only_changes: self.only_changes,
            max_frames: self.max_frames,
        })
    }
}

/// Shared "a payload is on screen" flag.
///
/// Once set, the idle animation stops refreshing the surface.
#[derive(Debug, Clone, Default)]
pub struct PayloadSlot {
    set: Arc<AtomicBool>,
}

impl PayloadSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_set(&self) -> bool {
        self.set.load(Ordering::Acquire)
    }

    fn mark(&self, set: bool) {
        self.set.store(set, Ordering::Release);
    }
}

/// Grid of uniformly random symbols.
pub fn noise_grid<R: Rng + ?Sized>(size: GridSize, rng: &mut R) -> ShareResult<Grid> {
    let symbols = (0..size.cells())
        .map(|_| Symbol::from_value(rng.gen_range(0..4)))
        .collect();
    Ok(Grid::from_symbols(size, symbols)?)
}

struct Presenter {
    surface: Box<dyn RenderSurface>,
    renderer: GridRenderer,
}

impl Presenter {
    async fn show(&mut self, grid: Grid, kind: GridKind) -> Result<RenderedGrid> {
        let viewport = self.surface.viewport();
        let pixels = self.renderer.render(&grid, viewport).map_err(ShareError::from)?;
        let frame = RenderedGrid {
            grid,
            viewport,
            pixels,
            kind,
        };
        self.surface.present(&frame).await?;
        Ok(frame)
    }
}

/// Sending end: paints payload grids, or random noise while idle.
///
/// Cloning yields another handle to the same surface.
#[derive(Clone)]
pub struct SendSession {
    presenter: Arc<Mutex<Presenter>>,
    slot: PayloadSlot,
    grid: GridSize,
    idle_interval: Duration,
}

impl SendSession {
    /// Create a session drawing on `surface` with the grid and idle period from
    /// `config`.
    pub fn new<S: RenderSurface + 'static>(surface: S, config: &ShareConfig) -> ShareResult<Self> {
        config.validate()?;
        let grid = config.grid()?;
        let viewport = surface.viewport();
        if viewport.width < grid.dimension() || viewport.height < grid.dimension() {
            return Err(ShareError::invalid_geometry(
                viewport.width,
                viewport.height,
                grid.dimension(),
            ));
        }

        Ok(Self {
            presenter: Arc::new(Mutex::new(Presenter {
                surface: Box::new(surface),
                renderer: GridRenderer::new(),
            })),
            slot: PayloadSlot::new(),
            grid,
            idle_interval: Duration::from_millis(config.idle_interval_ms),
        })
    }

    pub fn grid(&self) -> GridSize {
        self.grid
    }

    pub fn slot(&self) -> &PayloadSlot {
        &self.slot
    }

    pub fn has_payload(&self) -> bool {
        self.slot.is_set()
    }

    pub async fn viewport(&self) -> Viewport {
        self.presenter.lock().await.surface.viewport()
    }

    /// Encode `payload`, render it and present it. Bytes past the grid capacity are
    /// dropped. The slot is only marked once the surface accepted the grid.
    pub async fn set_payload(&self, payload: &[u8]) -> Result<RenderedGrid> {
        let capacity = self.grid.capacity_bytes();
        if payload.len() > capacity {
            warn!(
                len = payload.len(),
                capacity,
                dropped = payload.len() - capacity,
                "payload truncated to grid capacity"
            );
        }

        let grid = encode(payload, self.grid);
        let mut presenter = self.presenter.lock().await;
        let frame = presenter.show(grid, GridKind::Payload).await?;
        self.slot.mark(true);
        info!(bytes = payload.len().min(capacity), grid = %self.grid, "payload presented");
        Ok(frame)
    }

    /// Mark the surface as idle again. The surface keeps its current content until
    /// the next idle tick.
    pub fn clear_payload(&self) {
        self.slot.mark(false);
    }

    /// Present one random grid if no payload is set. Returns whether it did.
    pub async fn tick_idle(&self) -> Result<bool> {
        let grid = noise_grid(self.grid, &mut rand::thread_rng())?;
        let mut presenter = self.presenter.lock().await;
        if self.slot.is_set() {
            return Ok(false);
        }
        presenter.show(grid, GridKind::Idle).await?;
        Ok(true)
    }

    /// Refresh the idle grid every interval on a background task.
    ///
    /// The task ends when a payload is set or, if given, after `max_ticks` ticks,
    /// and yields the number of grids it presented. A tick whose grid the surface
    /// rejects with a skippable error is logged and counted but presents nothing.
    pub fn spawn_idle(&self, max_ticks: Option<u64>) -> JoinHandle<Result<u64>> {
        let session = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(session.idle_interval);
            let mut ticks = 0;
            let mut presented = 0;
            while max_ticks.is_none_or(|max| ticks < max) {
                interval.tick().await;
                ticks += 1;
                match session.tick_idle().await {
                    Ok(true) => presented += 1,
                    Ok(false) => {
                        debug!(presented, "payload set, idle animation stopped");
                        break;
                    }
                    Err(e) if classify::find(&e).is_some_and(classify::can_skip) => {
                        warn!(error = %e, "idle grid not presented");
                    }
                    Err(e) => return Err(e),
                }
            }
            Ok(presented)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    struct CountingSurface {
        viewport: Viewport,
        kinds: Arc<std::sync::Mutex<Vec<GridKind>>>,
    }

    #[async_trait]
    impl RenderSurface for CountingSurface {
        fn viewport(&self) -> Viewport {
            self.viewport
        }

        async fn present(&mut self, frame: &RenderedGrid) -> Result<()> {
            assert_eq!(frame.pixels.len(), self.viewport.rgba_len());
            self.kinds.lock().unwrap().push(frame.kind);
            Ok(())
        }
    }

    /// Rejects the first `failures` grids it is handed.
    struct FlakySurface {
        viewport: Viewport,
        failures: u32,
        kinds: Arc<std::sync::Mutex<Vec<GridKind>>>,
    }

    #[async_trait]
    impl RenderSurface for FlakySurface {
        fn viewport(&self) -> Viewport {
            self.viewport
        }

        async fn present(&mut self, frame: &RenderedGrid) -> Result<()> {
            if self.failures > 0 {
                self.failures -= 1;
                return Err(ShareError::render("flaky", "display went away").into());
            }
            self.kinds.lock().unwrap().push(frame.kind);
            Ok(())
        }
    }

    fn flaky(failures: u32) -> (FlakySurface, Arc<std::sync::Mutex<Vec<GridKind>>>) {
        let kinds = Arc::new(std::sync::Mutex::new(Vec::new()));
        let surface = FlakySurface {
            viewport: Viewport::new(32, 32),
            failures,
            kinds: kinds.clone(),
        };
        (surface, kinds)
    }

    fn counting(width: u32, height: u32) -> (CountingSurface, Arc<std::sync::Mutex<Vec<GridKind>>>) {
        let kinds = Arc::new(std::sync::Mutex::new(Vec::new()));
        let surface = CountingSurface {
            viewport: Viewport::new(width, height),
            kinds: kinds.clone(),
        };
        (surface, kinds)
    }

    #[test]
    fn test_noise_grid_uses_all_symbols() {
        let mut rng = StdRng::seed_from_u64(7);
        let grid = noise_grid(GridSize::DEFAULT, &mut rng).unwrap();
        for symbol in Symbol::ALL {
            assert!(grid.symbols().contains(&symbol), "{symbol:?} never drawn");
        }
    }

    #[tokio::test]
    async fn test_set_payload_stops_idle_ticks() {
        let (surface, kinds) = counting(64, 64);
        let session = SendSession::new(surface, &ShareConfig::default()).unwrap();

        assert!(session.tick_idle().await.unwrap());
        let frame = session.set_payload(b"Hello").await.unwrap();
        assert_eq!(&grid_codec::codec::decode(&frame.grid)[..5], b"Hello");
        assert!(session.has_payload());
        assert!(!session.tick_idle().await.unwrap());

        session.clear_payload();
        assert!(session.tick_idle().await.unwrap());

        let kinds = kinds.lock().unwrap().clone();
        assert_eq!(kinds, vec![GridKind::Idle, GridKind::Payload, GridKind::Idle]);
    }

    #[tokio::test]
    async fn test_surface_smaller_than_grid() {
        let (surface, _) = counting(8, 64);
        assert!(SendSession::new(surface, &ShareConfig::default()).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawn_idle_tick_limit() {
        let (surface, kinds) = counting(32, 32);
        let session = SendSession::new(surface, &ShareConfig::default()).unwrap();

        let ticks = session.spawn_idle(Some(5)).await.unwrap().unwrap();
        assert_eq!(ticks, 5);
        assert_eq!(kinds.lock().unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_failed_payload_leaves_slot_clear() {
        let (surface, kinds) = flaky(1);
        let session = SendSession::new(surface, &ShareConfig::default()).unwrap();

        assert!(session.set_payload(b"Hello").await.is_err());
        assert!(!session.has_payload());
        assert!(session.tick_idle().await.unwrap());
        assert_eq!(*kinds.lock().unwrap(), vec![GridKind::Idle]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawn_idle_survives_rejected_grids() {
        let (surface, kinds) = flaky(2);
        let session = SendSession::new(surface, &ShareConfig::default()).unwrap();

        let presented = session.spawn_idle(Some(5)).await.unwrap().unwrap();
        assert_eq!(presented, 3);
        assert_eq!(kinds.lock().unwrap().len(), 3);
    }

    #[test]
    fn test_builder_requires_source_and_sink() {
        assert!(ReceiveSession::builder().build().is_err());
    }
}
