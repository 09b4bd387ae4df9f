//! # Configuration Module
//!
//! This module provides the configuration shared by the send and receive sessions.

pub mod config;

pub use config::{CropRegion, ShareConfig};
