//! Frame data for captured camera content

/// Number of channels in a frame (RGB)
pub const CHANNELS: usize = 3;

/// A raw RGB frame from a capture source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    /// Row-major RGB pixel data, `width * height * 3` bytes
    pub data: Vec<u8>,
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
}

impl PixelBuffer {
    /// Create a new frame. `data` must hold exactly `width * height * 3` bytes.
    pub fn new(data: Vec<u8>, width: u32, height: u32) -> Self {
        debug_assert_eq!(data.len(), width as usize * height as usize * CHANNELS);
        Self {
            data,
            width,
            height,
        }
    }

    /// Create a frame filled with a single gray level
    pub fn filled(width: u32, height: u32, value: u8) -> Self {
        Self::new(
            vec![value; width as usize * height as usize * CHANNELS],
            width,
            height,
        )
    }

    /// Get frame dimensions as (width, height)
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Byte offset of the pixel at (x, y)
    pub fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * CHANNELS
    }

    /// Convert into an `image` buffer for encoding. Returns `None` if the
    /// length invariant was broken by the producer.
    pub fn to_image(&self) -> Option<image::RgbImage> {
        image::RgbImage::from_raw(self.width, self.height, self.data.clone())
    }

    /// Build a frame from a decoded image
    pub fn from_image(img: &image::RgbImage) -> Self {
        Self::new(img.as_raw().clone(), img.width(), img.height())
    }
}
