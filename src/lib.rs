//! # LightShare
//!
//! Screen-to-camera data transfer. One device paints bytes as a grid of coloured
//! cells; another points a camera at it and decodes the bytes back.
//!
//! ## Architecture
//!
//! The codec itself lives in the `grid_codec` crate. This crate wraps it in the
//! pieces a working link needs:
//! - `core`: owned frames and camera pixel-format conversion
//! - `capture`: frame sources (image files, raw NV21 camera dumps)
//! - `processing`: frame processors, grid decoding and payload sinks
//! - `display`: surfaces the send side presents rendered grids on
//! - `session`: send and receive session orchestration
//! - `config`: configuration management and validation
//! - `error`: error types with context and recovery classification
//!
//! ## Frame Capacity
//!
//! A grid of N×N cells carries N²/4 bytes: 64 bytes at the default 16×16. There is
//! no length header, so short payloads decode with trailing zero bytes and long
//! payloads are truncated.
//!
//! ## Example
//!
//! ```rust,no_run
//! use lightshare::capture::ImageSequenceSource;
//! use lightshare::processing::TextSink;
//! use lightshare::session::ReceiveSession;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let report = ReceiveSession::builder()
//!     .with_source(ImageSequenceSource::new(["photo.jpg"]))
//!     .with_sink(TextSink::stdout())
//!     .build()?
//!     .run()
//!     .await?;
//! println!("decoded {} frames", report.frames_decoded);
//! # Ok(())
//! # }
//! ```

pub mod capture;
pub mod config;
pub mod core;
pub mod display;
pub mod error;
pub mod processing;
pub mod session;

/// Re-export error types for convenience
pub use error::{
    HasRecoverySuggestion, HasSeverity, Recoverable, Retryable, ShareError, ShareResult,
};

/// Re-export codec types used throughout the public API
pub use grid_codec::{Grid, GridPreset, GridSize};
