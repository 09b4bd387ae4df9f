//! Grid decoding of processed camera frames: sample, classify, unpack.

use grid_codec::classify::classify_detailed;
use grid_codec::codec::decode;
use grid_codec::sampling::sample_grid;
use grid_codec::{Grid, GridSize};
use tracing::debug;

use crate::core::Frame;
use crate::error::ShareResult;

/// Margin below which a cell counts as ambiguous. Reference colours sit at least
/// 255 apart, so a well-lit cell has a margin far above this.
pub const DEFAULT_AMBIGUITY_MARGIN: f64 = 32.0;

/// One decoded camera frame.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedFrame {
    /// Position of the frame in the receive session, counting from 0.
    pub index: u64,
    /// Exactly `grid.size().capacity_bytes()` bytes.
    pub payload: Vec<u8>,
    pub grid: Grid,
    /// Cells whose colour was close to a decision boundary.
    pub ambiguous_cells: usize,
    pub pts_ns: Option<u64>,
}

impl DecodedFrame {
    /// Payload as text. Trailing zero bytes are treated as padding and dropped;
    /// invalid UTF-8 is replaced.
    pub fn text(&self) -> String {
        let end = self
            .payload
            .iter()
            .rposition(|&b| b != 0)
            .map_or(0, |i| i + 1);
        String::from_utf8_lossy(&self.payload[..end]).into_owned()
    }
}

/// Stateful frame → payload decoder.
#[derive(Debug, Clone)]
pub struct GridDecoder {
    size: GridSize,
    radius: u32,
    ambiguity_margin: f64,
    next_index: u64,
}

impl GridDecoder {
    pub fn new(size: GridSize, radius: u32) -> Self {
        Self {
            size,
            radius,
            ambiguity_margin: DEFAULT_AMBIGUITY_MARGIN,
            next_index: 0,
        }
    }

    pub fn with_ambiguity_margin(mut self, margin: f64) -> Self {
        self.ambiguity_margin = margin;
        self
    }

    pub fn size(&self) -> GridSize {
        self.size
    }

    /// Decode one frame. Fails only on geometry: a frame smaller than the grid.
    pub fn decode_frame(&mut self, frame: &Frame) -> ShareResult<DecodedFrame> {
        let raster = frame.raster()?;
        let colors = sample_grid(&raster, self.size, self.radius)?;

        let mut ambiguous_cells = 0;
        let symbols = colors
            .into_iter()
            .map(|color| {
                let c = classify_detailed(color);
                if c.margin() < self.ambiguity_margin {
                    ambiguous_cells += 1;
                }
                c.symbol
            })
            .collect();
        let grid = Grid::from_symbols(self.size, symbols)?;
        let payload = decode(&grid);

        let index = self.next_index;
        self.next_index += 1;
        debug!(
            frame = index,
            width = frame.width,
            height = frame.height,
            ambiguous_cells,
            "decoded grid"
        );

        Ok(DecodedFrame {
            index,
            payload,
            grid,
            ambiguous_cells,
            pts_ns: frame.pts_ns,
        })
    }
}
