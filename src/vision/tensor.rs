//! Tensor construction for the material classifier
//!
//! The model takes a single square RGB frame as a `[1, R, R, 3]` float
//! tensor with channel values mapped from [0, 255] to [-1, 1].

use ndarray::Array4;
use thiserror::Error;

use crate::capture::frame::{PixelBuffer, CHANNELS};

/// Input dimensions did not match the model resolution
#[derive(Debug, Error)]
#[error("expected a {expected}x{expected} frame, got {width}x{height}")]
pub struct ShapeMismatch {
    pub expected: u32,
    pub width: u32,
    pub height: u32,
}

/// Encode a square RGB frame into the model input tensor.
/// Pixel order is row-major R-G-B, matching the training pipeline.
pub fn encode(frame: &PixelBuffer, resolution: u32) -> Result<Array4<f32>, ShapeMismatch> {
    if frame.width != resolution || frame.height != resolution {
        return Err(ShapeMismatch {
            expected: resolution,
            width: frame.width,
            height: frame.height,
        });
    }

    let r = resolution as usize;
    let mut tensor = Array4::<f32>::zeros((1, r, r, CHANNELS));

    for y in 0..r {
        for x in 0..r {
            let idx = frame.offset(x as u32, y as u32);
            for c in 0..CHANNELS {
                let value = frame.data[idx + c] as f32 / 255.0;
                tensor[[0, y, x, c]] = value * 2.0 - 1.0;
            }
        }
    }

    Ok(tensor)
}
