// # Capture Module
//
// FrameSource implementations feeding the receive session.

pub mod image_files;
pub mod nv21;

pub use image_files::ImageSequenceSource;
pub use nv21::Nv21FileSource;
