use std::time::{Duration, Instant};

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use image::codecs::jpeg::JpegEncoder;
use image::RgbImage;
use tracing::warn;

/// Default JPEG quality for preview stills.
const PREVIEW_QUALITY: u8 = 80;

/// A throttled, compressed still of the display frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewFrame {
    /// Base64-encoded JPEG bytes.
    pub data: String,
    pub width: u32,
    pub height: u32,
    pub timestamp: Instant,
}

/// Rate-limited JPEG encoder for the preview path.
///
/// Throttling is wall-clock based: frames arriving inside the interval are
/// silently dropped from the preview path (they still feed tracking and
/// telemetry). Optionally downscales to a maximum width before encoding.
pub struct PreviewEncoder {
    interval: Duration,
    last_send: Option<Instant>,
    max_width: Option<u32>,
    quality: u8,
}

impl PreviewEncoder {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_send: None,
            max_width: None,
            quality: PREVIEW_QUALITY,
        }
    }

    /// Downscale frames wider than `width` before encoding.
    pub fn with_max_width(mut self, width: u32) -> Self {
        self.max_width = Some(width);
        self
    }

    /// Encode a preview still, or `None` when throttled or on encoder
    /// failure.
    pub fn encode(&mut self, image: &RgbImage) -> Option<PreviewFrame> {
        let now = Instant::now();
        if !self.interval.is_zero() {
            if let Some(last) = self.last_send {
                if now.duration_since(last) < self.interval {
                    return None;
                }
            }
        }

        let (data, width, height) = match self.max_width {
            Some(max) if image.width() > max => {
                let scaled_height =
                    (u64::from(image.height()) * u64::from(max) / u64::from(image.width())) as u32;
                match downscale(image, max, scaled_height.max(1)) {
                    Some(scaled) => (scaled, max, scaled_height.max(1)),
                    None => (image.as_raw().clone(), image.width(), image.height()),
                }
            }
            _ => (image.as_raw().clone(), image.width(), image.height()),
        };

        let jpeg = encode_jpeg(&data, width, height, self.quality)?;
        self.last_send = Some(now);

        Some(PreviewFrame {
            data: STANDARD.encode(jpeg),
            width,
            height,
            timestamp: now,
        })
    }
}

/// Compress raw RGB pixels to JPEG at the given quality.
fn encode_jpeg(data: &[u8], width: u32, height: u32, quality: u8) -> Option<Vec<u8>> {
    let mut buf = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut buf, quality);
    match encoder.encode(data, width, height, image::ExtendedColorType::Rgb8) {
        Ok(()) => Some(buf),
        Err(e) => {
            warn!("preview JPEG encoding failed: {e}");
            None
        }
    }
}

/// SIMD-accelerated downscale of raw RGB data.
fn downscale(image: &RgbImage, width: u32, height: u32) -> Option<Vec<u8>> {
    use fast_image_resize as fr;
    use fr::images::Image;

    let src = Image::from_vec_u8(
        image.width(),
        image.height(),
        image.as_raw().clone(),
        fr::PixelType::U8x3,
    )
    .ok()?;
    let mut dst = Image::new(width, height, fr::PixelType::U8x3);

    let mut resizer = fr::Resizer::new();
    match resizer.resize(&src, &mut dst, None) {
        Ok(()) => Some(dst.into_vec()),
        Err(e) => {
            warn!("preview downscale failed: {e}");
            None
        }
    }
}
