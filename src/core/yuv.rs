//! NV21 camera frame conversion.
//!
//! NV21 stores a full-resolution luma plane followed by one interleaved `V,U` pair
//! per 2×2 block. Conversion uses full-range BT.601, the same transform a JPEG
//! encoder applies, so colours match what a phone camera pipeline hands over as a
//! bitmap.

use grid_codec::sampling::PixelLayout;

use crate::core::frame::Frame;
use crate::error::{ShareError, ShareResult};

/// Bytes of an NV21 frame of the given size. Odd dimensions round the chroma
/// plane up.
pub fn nv21_len(width: u32, height: u32) -> usize {
    let (w, h) = (width as usize, height as usize);
    let chroma_rows = h.div_ceil(2);
    let chroma_row_bytes = w.div_ceil(2) * 2;
    w * h + chroma_rows * chroma_row_bytes
}

/// Convert one NV21 frame into an RGBA [`Frame`].
pub fn nv21_to_rgba(data: &[u8], width: u32, height: u32) -> ShareResult<Frame> {
    let expected = nv21_len(width, height);
    if data.len() < expected {
        return Err(ShareError::frame_source(
            "nv21",
            format!(
                "{}x{} frame needs {} bytes, buffer holds {}",
                width,
                height,
                expected,
                data.len()
            ),
        ));
    }

    let (w, h) = (width as usize, height as usize);
    let chroma_stride = w.div_ceil(2) * 2;
    let (luma, chroma) = data.split_at(w * h);

    let mut rgba = Vec::with_capacity(w * h * 4);
    for y in 0..h {
        let chroma_row = &chroma[(y / 2) * chroma_stride..];
        for x in 0..w {
            let pair = (x / 2) * 2;
            let v = chroma_row[pair];
            let u = chroma_row[pair + 1];
            let [r, g, b] = ycbcr_to_rgb(luma[y * w + x], u, v);
            rgba.extend_from_slice(&[r, g, b, 255]);
        }
    }

    Frame::new(rgba, width, height, PixelLayout::Rgba)
}

/// Full-range BT.601 YCbCr → RGB.
fn ycbcr_to_rgb(y: u8, cb: u8, cr: u8) -> [u8; 3] {
    let y = f32::from(y);
    let cb = f32::from(cb) - 128.0;
    let cr = f32::from(cr) - 128.0;

    let r = y + 1.402 * cr;
    let g = y - 0.344_136 * cb - 0.714_136 * cr;
    let b = y + 1.772 * cb;
    [clamp_channel(r), clamp_channel(g), clamp_channel(b)]
}

fn clamp_channel(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

/// Full-range BT.601 RGB → NV21. Chroma is taken from the top-left pixel of each
/// 2×2 block. Used to synthesise camera frames.
pub fn rgba_to_nv21(rgba: &[u8], width: u32, height: u32) -> ShareResult<Vec<u8>> {
    let (w, h) = (width as usize, height as usize);
    if rgba.len() < w * h * 4 {
        return Err(ShareError::validation(
            "rgba",
            format!("at least {} bytes", w * h * 4),
            rgba.len().to_string(),
        ));
    }

    let chroma_stride = w.div_ceil(2) * 2;
    let mut out = vec![0u8; nv21_len(width, height)];
    let (luma, chroma) = out.split_at_mut(w * h);
    for y in 0..h {
        for x in 0..w {
            let p = &rgba[(y * w + x) * 4..];
            let (r, g, b) = (f32::from(p[0]), f32::from(p[1]), f32::from(p[2]));
            luma[y * w + x] = clamp_channel(0.299 * r + 0.587 * g + 0.114 * b);
            if x % 2 == 0 && y % 2 == 0 {
                let cb = 128.0 - 0.168_736 * r - 0.331_264 * g + 0.5 * b;
                let cr = 128.0 + 0.5 * r - 0.418_688 * g - 0.081_312 * b;
                let at = (y / 2) * chroma_stride + x;
                chroma[at] = clamp_channel(cr);
                chroma[at + 1] = clamp_channel(cb);
            }
        }
    }
    Ok(out)
}
