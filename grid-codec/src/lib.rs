// SPDX-License-Identifier: MIT
//! # grid-codec: Screen-to-Camera Colour Grid Codec
//!
//! This crate maps arbitrary bytes onto a square grid of coloured cells and back.
//! One device paints the grid on its display; another device points a camera at it,
//! samples one colour per cell and recovers the bytes.
//!
//! ## Architecture Overview
//!
//! The codec is built around a single shared alphabet of four symbols, each worth
//! two bits and each bound to one reference colour:
//!
//! | Symbol | Bits | Reference colour |
//! |--------|------|------------------|
//! | Black  | `00` | (0, 0, 0)        |
//! | Red    | `01` | (255, 0, 0)      |
//! | Green  | `10` | (0, 255, 0)      |
//! | Blue   | `11` | (0, 0, 255)      |
//!
//! ## Key Components
//!
//! - [`alphabet`]: the symbol ↔ value ↔ colour table shared by both directions
//! - [`grid`]: grid dimensions, capacity and the flat row-major [`grid::Grid`]
//! - [`codec`]: bit packing (`encode`) and unpacking (`decode`)
//! - [`classify`]: nearest-reference-colour classification of sampled colours
//! - [`sampling`]: cell geometry and neighbourhood averaging over raster images
//! - [`render`]: painting a grid into an RGBA viewport buffer
//!
//! ## Frame Capacity
//!
//! A grid of dimension N carries `N² × 2` bits, i.e. `N² / 4` bytes. Longer payloads
//! are truncated; shorter ones are padded with the value-0 symbol. There is no length
//! header, so padding zeros come back as real zero bytes.
//!
//! ## Usage Example
//!
//! ```rust
//! use grid_codec::{codec, grid::GridSize};
//!
//! let size = GridSize::new(16).unwrap();
//! let grid = codec::encode(b"Hello", size);
//! let bytes = codec::decode(&grid);
//!
//! assert_eq!(bytes.len(), 64);
//! assert_eq!(&bytes[..5], b"Hello");
//! assert!(bytes[5..].iter().all(|&b| b == 0));
//! ```
//!
//! ## Thread Safety
//!
//! Every operation is a pure function over its inputs and allocates its own output.
//! Nothing here holds shared mutable state, so calls from multiple threads never
//! interfere. The only stateful type, [`render::GridRenderer`], owns its scratch
//! buffers and is used through `&mut self`.

pub mod alphabet;
pub mod classify;
pub mod codec;
pub mod error;
pub mod grid;
pub mod render;
pub mod sampling;

pub use alphabet::{Rgb, Symbol, ALPHABET};
pub use classify::{classify, Classification};
pub use codec::{decode, encode};
pub use error::CodecError;
pub use grid::{Grid, GridPreset, GridSize};
