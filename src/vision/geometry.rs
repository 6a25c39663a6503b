//! Geometric frame transforms
//!
//! Camera sensors deliver frames rotated relative to how the user holds the
//! device. These transforms normalize orientation before a frame reaches the
//! classifier or the OCR upload. All of them are pure pixel moves; resize is
//! bilinear.

use crate::capture::frame::{PixelBuffer, CHANNELS};

/// Rotate a frame 90 degrees clockwise. Output dimensions are swapped:
/// the source pixel at (x, y) lands at (y, width - 1 - x).
pub fn rotate_clockwise_90(src: &PixelBuffer) -> PixelBuffer {
    let (w, h) = (src.width as usize, src.height as usize);
    let (new_w, new_h) = (h, w);
    let mut out = vec![0u8; new_w * new_h * CHANNELS];

    for y in 0..h {
        for x in 0..w {
            let src_idx = (y * w + x) * CHANNELS;
            let new_x = y;
            let new_y = w - 1 - x;
            let dst_idx = (new_y * new_w + new_x) * CHANNELS;
            out[dst_idx..dst_idx + CHANNELS].copy_from_slice(&src.data[src_idx..src_idx + CHANNELS]);
        }
    }

    PixelBuffer::new(out, new_w as u32, new_h as u32)
}

/// Mirror a frame left-right in place
pub fn mirror_horizontal(buf: &mut PixelBuffer) {
    let (w, h) = (buf.width as usize, buf.height as usize);
    for y in 0..h {
        for x in 0..w / 2 {
            let left = (y * w + x) * CHANNELS;
            let right = (y * w + (w - 1 - x)) * CHANNELS;
            for c in 0..CHANNELS {
                buf.data.swap(left + c, right + c);
            }
        }
    }
}

/// Mirror a frame top-bottom in place
pub fn mirror_vertical(buf: &mut PixelBuffer) {
    let (w, h) = (buf.width as usize, buf.height as usize);
    for y in 0..h / 2 {
        for x in 0..w {
            let top = (y * w + x) * CHANNELS;
            let bottom = ((h - 1 - y) * w + x) * CHANNELS;
            for c in 0..CHANNELS {
                buf.data.swap(top + c, bottom + c);
            }
        }
    }
}

/// Resize a frame to exact target dimensions using bilinear interpolation
pub fn resize(src: &PixelBuffer, target_w: u32, target_h: u32) -> PixelBuffer {
    let (w, h) = (src.width as usize, src.height as usize);
    let (tw, th) = (target_w as usize, target_h as usize);
    let mut out = vec![0u8; tw * th * CHANNELS];

    let x_ratio = w as f32 / tw as f32;
    let y_ratio = h as f32 / th as f32;

    for ty in 0..th {
        for tx in 0..tw {
            let src_x = (tx as f32 * x_ratio).min(w as f32 - 1.0);
            let src_y = (ty as f32 * y_ratio).min(h as f32 - 1.0);

            let x0 = src_x.floor() as usize;
            let y0 = src_y.floor() as usize;
            let x1 = (x0 + 1).min(w - 1);
            let y1 = (y0 + 1).min(h - 1);

            let fx = src_x - x0 as f32;
            let fy = src_y - y0 as f32;

            let dst_idx = (ty * tw + tx) * CHANNELS;
            for c in 0..CHANNELS {
                let v00 = src.data[(y0 * w + x0) * CHANNELS + c] as f32;
                let v01 = src.data[(y0 * w + x1) * CHANNELS + c] as f32;
                let v10 = src.data[(y1 * w + x0) * CHANNELS + c] as f32;
                let v11 = src.data[(y1 * w + x1) * CHANNELS + c] as f32;

                let top = v00 * (1.0 - fx) + v01 * fx;
                let bottom = v10 * (1.0 - fx) + v11 * fx;
                out[dst_idx + c] = (top * (1.0 - fy) + bottom * fy).clamp(0.0, 255.0) as u8;
            }
        }
    }

    PixelBuffer::new(out, target_w, target_h)
}

/// Orientation fix for the classification path: sensor frames arrive rotated
/// a quarter turn counter-clockwise.
pub fn normalize_for_classification(src: &PixelBuffer, resolution: u32) -> PixelBuffer {
    let rotated = rotate_clockwise_90(src);
    resize(&rotated, resolution, resolution)
}

/// Orientation fix for bin-label snapshots: rotate a quarter turn, then
/// undo the sensor's vertical and horizontal flips.
pub fn normalize_label_snapshot(src: &PixelBuffer) -> PixelBuffer {
    let mut out = rotate_clockwise_90(src);
    mirror_vertical(&mut out);
    mirror_horizontal(&mut out);
    out
}
