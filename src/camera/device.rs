use image::{Rgb, RgbImage};

use crate::camera::error::Result;

/// Abstraction over a single opened capture device.
///
/// Implementations block until a frame is available or the read fails.
/// `Ok(None)` signals a transient empty read; the acquisition loop retries
/// after a short backoff instead of surfacing it.
pub trait CaptureDevice: Send {
    /// Read the next frame from the device.
    fn read_frame(&mut self) -> Result<Option<RgbImage>>;
}

/// Open the capture device for the given index.
///
/// When `HEADMOUSE_TEST_PATTERN=1` is set, a simulated camera is used
/// instead of real hardware. Real webcam capture requires the
/// `opencv-camera` feature.
pub fn open_device(index: u32) -> Result<Box<dyn CaptureDevice>> {
    if TestPatternDevice::is_enabled() {
        return Ok(Box::new(TestPatternDevice::new()));
    }

    #[cfg(feature = "opencv-camera")]
    {
        Ok(Box::new(opencv_backend::OpenCvDevice::open(index)?))
    }

    #[cfg(not(feature = "opencv-camera"))]
    {
        Err(crate::camera::error::CameraError::NoBackend(format!(
            "device {index}: build with the `opencv-camera` feature or set HEADMOUSE_TEST_PATTERN=1"
        )))
    }
}

const PATTERN_WIDTH: u32 = 640;
const PATTERN_HEIGHT: u32 = 480;
const PATTERN_MARKER_SIZE: u32 = 40;
const PATTERN_FRAME_INTERVAL: std::time::Duration = std::time::Duration::from_millis(33);

/// A fake capture device for running without real hardware.
///
/// Produces frames with a high-contrast marker drifting over a gradient
/// background, so the full tracking pipeline can be exercised end to end.
/// Enable via the `HEADMOUSE_TEST_PATTERN=1` environment variable.
pub struct TestPatternDevice {
    frame_index: u64,
    interval: std::time::Duration,
}

impl TestPatternDevice {
    /// Create a device paced at roughly 30 fps.
    pub fn new() -> Self {
        Self {
            frame_index: 0,
            interval: PATTERN_FRAME_INTERVAL,
        }
    }

    /// Create a device with a custom inter-frame pacing interval.
    pub fn with_frame_interval(interval: std::time::Duration) -> Self {
        Self {
            frame_index: 0,
            interval,
        }
    }

    /// Whether the test pattern is enabled via environment variable.
    pub fn is_enabled() -> bool {
        std::env::var("HEADMOUSE_TEST_PATTERN").is_ok_and(|v| v == "1" || v == "true")
    }

    fn render(&self) -> RgbImage {
        let mut image = RgbImage::from_fn(PATTERN_WIDTH, PATTERN_HEIGHT, |x, y| {
            let shade = ((x / 4 + y / 4) % 64 + 96) as u8;
            Rgb([shade, shade, shade])
        });

        // Marker drifts on a slow diagonal sweep, wrapping at the borders.
        let span_x = PATTERN_WIDTH - PATTERN_MARKER_SIZE;
        let span_y = PATTERN_HEIGHT - PATTERN_MARKER_SIZE;
        let left = (self.frame_index * 2 % u64::from(span_x)) as u32;
        let top = (self.frame_index % u64::from(span_y)) as u32;

        for dy in 0..PATTERN_MARKER_SIZE {
            for dx in 0..PATTERN_MARKER_SIZE {
                let value = if (dx / 8 + dy / 8) % 2 == 0 { 255 } else { 0 };
                image.put_pixel(left + dx, top + dy, Rgb([value, value, value]));
            }
        }

        image
    }
}

impl Default for TestPatternDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureDevice for TestPatternDevice {
    fn read_frame(&mut self) -> Result<Option<RgbImage>> {
        if !self.interval.is_zero() {
            std::thread::sleep(self.interval);
        }
        let image = self.render();
        self.frame_index += 1;
        Ok(Some(image))
    }
}

#[cfg(feature = "opencv-camera")]
mod opencv_backend {
    use image::RgbImage;
    use opencv::core::Mat;
    use opencv::prelude::*;
    use opencv::videoio::{self, VideoCapture};

    use crate::camera::error::{CameraError, Result};

    /// Webcam capture through OpenCV's videoio.
    pub struct OpenCvDevice {
        capture: VideoCapture,
        buffer: Mat,
    }

    impl OpenCvDevice {
        /// Open the device at the given index with the default backend.
        pub fn open(index: u32) -> Result<Self> {
            let capture = VideoCapture::new(index as i32, videoio::CAP_ANY)
                .map_err(|e| CameraError::DeviceOpen(e.to_string()))?;
            let opened = capture
                .is_opened()
                .map_err(|e| CameraError::DeviceOpen(e.to_string()))?;
            if !opened {
                return Err(CameraError::DeviceOpen(format!(
                    "device {index} could not be opened"
                )));
            }
            Ok(Self {
                capture,
                buffer: Mat::default(),
            })
        }
    }

    impl super::CaptureDevice for OpenCvDevice {
        fn read_frame(&mut self) -> Result<Option<RgbImage>> {
            let ok = self
                .capture
                .read(&mut self.buffer)
                .map_err(|e| CameraError::FrameRead(e.to_string()))?;
            if !ok || self.buffer.empty() {
                return Ok(None);
            }

            let width = self.buffer.cols();
            let height = self.buffer.rows();
            let data = self
                .buffer
                .data_bytes()
                .map_err(|e| CameraError::FrameRead(e.to_string()))?;
            if width <= 0 || height <= 0 || data.len() != (width * height * 3) as usize {
                return Ok(None);
            }

            // OpenCV delivers BGR; swap to RGB while copying out of the Mat.
            let mut rgb = Vec::with_capacity(data.len());
            for pixel in data.chunks_exact(3) {
                rgb.extend_from_slice(&[pixel[2], pixel[1], pixel[0]]);
            }
            Ok(RgbImage::from_raw(width as u32, height as u32, rgb))
        }
    }
}
