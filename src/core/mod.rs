//! # Core Infrastructure Module
//!
//! Owned frame buffers shared between sources, processors and the grid decoder,
//! plus conversion of camera-native pixel formats into packed RGBA.

pub mod frame;
pub mod yuv;

pub use frame::{Frame, Size};
