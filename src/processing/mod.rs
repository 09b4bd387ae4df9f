//! # Processing Module
//!
//! Receive-side frame processing: the processor pipeline, grid decoding and the
//! sinks decoded payloads are delivered to.

pub mod decoder;
pub mod processing;
pub mod sinks;

pub use decoder::{DecodedFrame, GridDecoder};
pub use processing::{FrameProcessor, ProcessingPipeline, RegionCrop};
pub use sinks::{FileSink, JsonSink, PayloadSink, SinkMultiplexer, TextSink};
