use std::time::Instant;

use image::{GrayImage, RgbImage};

/// A single captured frame from the camera.
///
/// The pixel buffer is exclusively owned: frames move from the acquisition
/// loop into the handler, and the only long-lived copy (the processor's
/// pick-point frame) is cloned out explicitly. Dropping a `Frame` releases
/// the buffer.
pub struct Frame {
    /// Raw RGB pixels.
    pub image: RgbImage,
    /// Capture timestamp.
    pub timestamp: Instant,
    /// Instantaneous capture rate measured at the source.
    pub fps: f64,
}

impl Frame {
    /// Wrap an owned pixel buffer with its capture metadata.
    pub fn new(image: RgbImage, timestamp: Instant, fps: f64) -> Self {
        Self {
            image,
            timestamp,
            fps,
        }
    }

    /// Frame width in pixels.
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Frame height in pixels.
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Grayscale copy of the frame, as consumed by the tracker.
    pub fn to_luma(&self) -> GrayImage {
        image::imageops::grayscale(&self.image)
    }
}
