//! # Configuration Module
//!
//! This module provides configuration structures and validation for the send and
//! receive sides. It is the common interface between the CLI and the library sessions.
//!
//! ## Configuration Parameters
//!
//! | Parameter | Type | Range | Description |
//! |-----------|------|-------|-------------|
//! | `grid_size` | `u32` | even, 2-256 | Cells per side of the square grid |
//! | `sample_radius` | `u32` | 0-16 | Half-width of the averaged neighbourhood per cell |
//! | `idle_interval_ms` | `u64` | > 0 | Refresh period of the idle noise grid |
//! | `viewport_width` | `u32` | ≥ grid_size | Width of the rendered grid in pixels |
//! | `viewport_height` | `u32` | ≥ grid_size | Height of the rendered grid in pixels |
//! | `only_changes` | `bool` | true/false | Deliver a payload only when it differs from the last |
//! | `crop` | `Option<CropRegion>` | non-empty | Region of the camera frame holding the grid |
//!
//! A viewport that is not a multiple of `grid_size` on both axes still validates,
//! with a warning: nearest-neighbour scaling then gives cells uneven widths, while
//! the receiver samples at `W / N` steps, so cells toward the far edges can be read
//! from their neighbours.
//!
//! ## Grid Presets
//!
//! The CLI maps [`GridPreset`](grid_codec::GridPreset) values onto `grid_size`:
//! - `coarse`: 8×8, 16 bytes per frame
//! - `standard`: 16×16, 64 bytes per frame (default)
//! - `fine`: 32×32, 256 bytes per frame
//!
//! ## Examples
//!
//! ```rust
//! use lightshare::config::config::ShareConfig;
//!
//! let config = ShareConfig::default();
//! assert!(config.validate().is_ok());
//! assert_eq!(config.grid().unwrap().capacity_bytes(), 64);
//! assert!(config.viewport_is_exact());
//! ```

use std::fmt;
use std::str::FromStr;

use grid_codec::render::Viewport;
use grid_codec::GridSize;

use tracing::warn;

use crate::error::{ShareError, ShareResult};

/// Largest grid the configuration accepts.
pub const MAX_GRID_SIZE: u32 = 256;

/// Largest sampling radius the configuration accepts.
pub const MAX_SAMPLE_RADIUS: u32 = grid_codec::sampling::MAX_RADIUS;

/// Rectangle of a camera frame, in pixels.
///
/// Parsed from `x,y,width,height` on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CropRegion {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Whether the region lies entirely inside a `width × height` frame.
    pub fn fits(&self, width: u32, height: u32) -> bool {
        self.x
            .checked_add(self.width)
            .is_some_and(|right| right <= width)
            && self
                .y
                .checked_add(self.height)
                .is_some_and(|bottom| bottom <= height)
    }
}

impl fmt::Display for CropRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{},{}", self.x, self.y, self.width, self.height)
    }
}

impl FromStr for CropRegion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != 4 {
            return Err(format!("expected x,y,width,height but got '{}'", s));
        }
        let mut values = [0u32; 4];
        for (slot, part) in values.iter_mut().zip(&parts) {
            *slot = part
                .parse()
                .map_err(|_| format!("'{}' is not a pixel coordinate", part))?;
        }
        Ok(Self::new(values[0], values[1], values[2], values[3]))
    }
}

/// Configuration shared by the send and receive sessions.
///
/// # Examples
///
/// A denser grid on a larger display:
/// ```rust
/// use lightshare::config::config::ShareConfig;
///
/// let config = ShareConfig {
///     grid_size: 32,
///     viewport_width: 1024,
///     viewport_height: 1024,
///     ..ShareConfig::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ShareConfig {
    /// Cells per side of the square grid.
    ///
    /// Both ends must agree on this value; nothing in a frame announces it.
    /// Must be even so that N² is a whole number of bytes.
    pub grid_size: u32,

    /// Half-width of the square neighbourhood averaged per cell.
    ///
    /// A radius of 1 samples 3×3 pixels, which smooths camera noise without
    /// reaching into neighbouring cells at typical resolutions.
    pub sample_radius: u32,

    /// Period of the idle noise animation in milliseconds.
    pub idle_interval_ms: u64,

    /// Width of the rendered grid in pixels.
    pub viewport_width: u32,

    /// Height of the rendered grid in pixels.
    pub viewport_height: u32,

    /// Suppress delivery of a payload identical to the previous one.
    pub only_changes: bool,

    /// Part of each camera frame that holds the grid, if not the whole frame.
    pub crop: Option<CropRegion>,
}

impl Default for ShareConfig {
    /// Default values:
    /// - `grid_size`: 16
    /// - `sample_radius`: 1 (3×3 average)
    /// - `idle_interval_ms`: 100
    /// - `viewport_width` / `viewport_height`: 512
    /// - `only_changes`: false
    /// - `crop`: None (whole frame)
    fn default() -> Self {
        Self {
            grid_size: GridSize::DEFAULT.dimension(),
            sample_radius: grid_codec::sampling::DEFAULT_RADIUS,
            idle_interval_ms: 100,
            viewport_width: 512,
            viewport_height: 512,
            only_changes: false,
            crop: None,
        }
    }
}

impl ShareConfig {
    /// Validates the configuration parameters.
    pub fn validate(&self) -> ShareResult<()> {
        if !(2..=MAX_GRID_SIZE).contains(&self.grid_size) {
            return Err(ShareError::config(
                "grid_size",
                self.grid_size.to_string(),
                format!("must be between 2 and {}", MAX_GRID_SIZE),
            ));
        }
        if self.grid_size % 2 != 0 {
            return Err(ShareError::config(
                "grid_size",
                self.grid_size.to_string(),
                "must be even so every cell belongs to a whole byte",
            ));
        }
        if self.sample_radius > MAX_SAMPLE_RADIUS {
            return Err(ShareError::config(
                "sample_radius",
                self.sample_radius.to_string(),
                format!("must be at most {}", MAX_SAMPLE_RADIUS),
            ));
        }
        if self.idle_interval_ms == 0 {
            return Err(ShareError::config(
                "idle_interval_ms",
                "0",
                "must be greater than 0",
            ));
        }
        if self.viewport_width < self.grid_size || self.viewport_height < self.grid_size {
            return Err(ShareError::config(
                "viewport",
                format!("{}x{}", self.viewport_width, self.viewport_height),
                format!("must be at least {} pixels per side", self.grid_size),
            ));
        }
        if !self.viewport_is_exact() {
            warn!(
                width = self.viewport_width,
                height = self.viewport_height,
                grid_size = self.grid_size,
                "viewport is not a multiple of the grid size; edge cells may decode wrongly"
            );
        }
        if let Some(crop) = self.crop {
            if crop.width < self.grid_size || crop.height < self.grid_size {
                return Err(ShareError::config(
                    "crop",
                    crop.to_string(),
                    format!("region must be at least {} pixels per side", self.grid_size),
                ));
            }
        }
        Ok(())
    }

    /// Grid dimension as a codec type.
    pub fn grid(&self) -> ShareResult<GridSize> {
        Ok(GridSize::new(self.grid_size)?)
    }

    /// Whether the viewport divides into whole, equal cells.
    pub fn viewport_is_exact(&self) -> bool {
        self.grid_size != 0
            && self.viewport_width % self.grid_size == 0
            && self.viewport_height % self.grid_size == 0
    }

    /// Rendered surface size.
    pub fn viewport(&self) -> Viewport {
        Viewport::new(self.viewport_width, self.viewport_height)
    }
}
