//! Capture Layer
//!
//! Abstracts camera devices behind a frame source interface. The pipeline
//! never talks to a device directly; it asks a source for the next frame
//! and stops the source before leaving a screen.

pub mod frame;

use std::path::PathBuf;

use thiserror::Error;
use tracing::info;

pub use frame::PixelBuffer;

/// Errors from capture sources
#[derive(Debug, Error)]
pub enum CaptureError {
    /// No usable capture device, or permission denied
    #[error("no capture device available: {0}")]
    DeviceUnavailable(String),
}

/// A source of camera frames
pub trait FrameSource {
    /// Return the next available frame, or fail if no device can deliver one.
    /// No retry happens here; the caller decides whether to trigger again.
    fn next_frame(&mut self) -> Result<PixelBuffer, CaptureError>;

    /// Stop the underlying device. Must be called before leaving the screen
    /// that owns the source; a stopped source fails on `next_frame`.
    fn stop(&mut self);
}

/// Frame source backed by an image file on disk (snapshots taken outside
/// the pipeline, or fixtures during development)
pub struct FileFrameSource {
    path: PathBuf,
    stopped: bool,
}

impl FileFrameSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            stopped: false,
        }
    }
}

impl FrameSource for FileFrameSource {
    fn next_frame(&mut self) -> Result<PixelBuffer, CaptureError> {
        if self.stopped {
            return Err(CaptureError::DeviceUnavailable(
                "frame source is stopped".to_string(),
            ));
        }

        let img = image::open(&self.path)
            .map_err(|e| {
                CaptureError::DeviceUnavailable(format!("{}: {}", self.path.display(), e))
            })?
            .to_rgb8();

        info!(
            "Read {}x{} frame from {}",
            img.width(),
            img.height(),
            self.path.display()
        );
        Ok(PixelBuffer::from_image(&img))
    }

    fn stop(&mut self) {
        self.stopped = true;
    }
}

/// Fixed in-memory source that hands out one frame
pub struct StaticFrameSource {
    frame: Option<PixelBuffer>,
}

impl StaticFrameSource {
    pub fn new(frame: PixelBuffer) -> Self {
        Self { frame: Some(frame) }
    }
}

impl FrameSource for StaticFrameSource {
    fn next_frame(&mut self) -> Result<PixelBuffer, CaptureError> {
        self.frame
            .take()
            .ok_or_else(|| CaptureError::DeviceUnavailable("no frame left".to_string()))
    }

    fn stop(&mut self) {
        self.frame = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_device_unavailable() {
        let mut source = FileFrameSource::new("/nonexistent/frame.png");
        assert!(matches!(
            source.next_frame(),
            Err(CaptureError::DeviceUnavailable(_))
        ));
    }

    #[test]
    fn test_stopped_source_fails() {
        let mut source = StaticFrameSource::new(PixelBuffer::filled(2, 2, 0));
        source.stop();
        assert!(source.next_frame().is_err());
    }

    #[test]
    fn test_static_source_hands_out_frame_once() {
        let mut source = StaticFrameSource::new(PixelBuffer::filled(2, 2, 7));
        assert!(source.next_frame().is_ok());
        assert!(source.next_frame().is_err());
    }
}
