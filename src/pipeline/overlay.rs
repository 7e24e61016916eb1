use image::{Rgb, RgbImage};

use crate::config::MarkerShape;
use crate::tracking::Point;

/// Marker drawn green while tracked.
pub const COLOR_TRACKED: Rgb<u8> = Rgb([0, 255, 0]);
/// Marker drawn red while lost.
pub const COLOR_LOST: Rgb<u8> = Rgb([255, 0, 0]);
/// Marker drawn white while tracking is disabled.
pub const COLOR_DISABLED: Rgb<u8> = Rgb([255, 255, 255]);

const OUTLINE_THICKNESS: u32 = 2;
const SCORE_BAR_ORIGIN: (u32, u32) = (10, 10);
const SCORE_BAR_WIDTH: u32 = 80;
const SCORE_BAR_HEIGHT: u32 = 4;

/// Marker overlay description for one display frame.
pub struct Marker {
    /// Marker center in display (mirrored) coordinates.
    pub point: Point,
    pub shape: MarkerShape,
    pub color: Rgb<u8>,
    /// Marker footprint — matches the template size so the outline frames
    /// the tracked patch.
    pub size: u32,
    /// Last match score, rendered as a filled bar.
    pub score: f32,
}

/// Draw the marker and score bar onto the display frame. All drawing is
/// clipped to the frame bounds.
pub fn draw(image: &mut RgbImage, marker: &Marker) {
    if image.width() == 0 || image.height() == 0 {
        return;
    }

    match marker.shape {
        MarkerShape::Circle => draw_circle(image, marker),
        MarkerShape::Square => draw_square(image, marker),
    }

    draw_score_bar(image, marker);
}

/// Circle outline via squared-distance test over the bounding box.
fn draw_circle(image: &mut RgbImage, marker: &Marker) {
    let radius = (marker.size / 2) as i32;
    if radius <= 0 {
        return;
    }
    let inner = radius - OUTLINE_THICKNESS as i32;
    let (cx, cy) = (marker.point.x, marker.point.y);

    for dy in -radius..=radius {
        for dx in -radius..=radius {
            let dist_sq = dx * dx + dy * dy;
            if dist_sq <= radius * radius && dist_sq > inner.max(0) * inner.max(0) {
                put_pixel_checked(image, cx + dx, cy + dy, marker.color);
            }
        }
    }
}

fn draw_square(image: &mut RgbImage, marker: &Marker) {
    let half = (marker.size / 2) as i32;
    if half <= 0 {
        return;
    }
    let thickness = OUTLINE_THICKNESS as i32;
    let (cx, cy) = (marker.point.x, marker.point.y);

    for dy in -half..=half {
        for dx in -half..=half {
            let on_border = dx.abs() > half - thickness || dy.abs() > half - thickness;
            if on_border {
                put_pixel_checked(image, cx + dx, cy + dy, marker.color);
            }
        }
    }
}

/// Filled bar in the top-left corner, width proportional to the score.
fn draw_score_bar(image: &mut RgbImage, marker: &Marker) {
    let filled = (marker.score.clamp(0.0, 1.0) * SCORE_BAR_WIDTH as f32) as u32;
    let (left, top) = SCORE_BAR_ORIGIN;
    for dy in 0..SCORE_BAR_HEIGHT {
        for dx in 0..filled {
            put_pixel_checked(image, (left + dx) as i32, (top + dy) as i32, marker.color);
        }
    }
}

fn put_pixel_checked(image: &mut RgbImage, x: i32, y: i32, color: Rgb<u8>) {
    if x >= 0 && y >= 0 && (x as u32) < image.width() && (y as u32) < image.height() {
        image.put_pixel(x as u32, y as u32, color);
    }
}
