use std::time::Instant;

use image::{GrayImage, Luma};

use crate::tracking::error::{Result, TrackError};
use crate::tracking::matcher;
use crate::tracking::types::{Point, Rect};

/// Tracker configuration, replaced atomically per update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackerParams {
    /// Side length of the square template window.
    pub template_size: u32,
    /// Pixels added around the last known point to form the search window.
    pub search_margin: u32,
    /// Correlation score below which the match is rejected as lost.
    pub score_threshold: f32,
    /// Blend newly matched content into the template after each match.
    pub adaptive_template: bool,
    /// EMA blend factor for adaptive updates, in [0, 1].
    pub template_alpha: f32,
}

impl Default for TrackerParams {
    fn default() -> Self {
        Self {
            template_size: 30,
            search_margin: 30,
            score_threshold: 0.6,
            adaptive_template: true,
            template_alpha: 0.2,
        }
    }
}

/// Per-frame tracking outcome. `lost` carries the primary loss signal:
/// a sub-threshold match is not an error, and `point` then holds the
/// reference point so the caller sees no movement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackResult {
    pub point: Point,
    pub score: f32,
    pub lost: bool,
    pub timestamp: Instant,
}

/// Reference patch plus the frame-coordinate point it was extracted around.
struct Template {
    image: GrayImage,
    point: Point,
}

/// Single-marker template tracker.
///
/// Holds exactly one template at a time; a new pick or recenter replaces
/// it wholesale. Matching runs over a bounded window around the last known
/// point, which both caps per-frame cost and rejects spurious matches
/// elsewhere in the frame.
pub struct TemplateTracker {
    params: TrackerParams,
    template: Option<Template>,
    lost: bool,
}

impl TemplateTracker {
    pub fn new(params: TrackerParams) -> Self {
        Self {
            params,
            template: None,
            lost: false,
        }
    }

    /// Replace the tracker configuration. Takes effect on the next update;
    /// the stored template is kept.
    pub fn set_params(&mut self, params: TrackerParams) {
        self.params = params;
    }

    /// Whether the last update failed to find the template.
    pub fn lost(&self) -> bool {
        self.lost
    }

    /// Extract a new template centered on `point`, clamped so the window
    /// stays inside the frame. The window center becomes the tracker's
    /// sole reference point and the lost state is cleared.
    pub fn set_template(&mut self, frame: &GrayImage, point: Point) -> Result<()> {
        let size = self.params.template_size;
        let (width, height) = frame.dimensions();
        if size == 0 || width < size || height < size {
            return Err(TrackError::InvalidPick);
        }

        let half = (size / 2) as i32;
        let x = (point.x - half).clamp(0, (width - size) as i32) as u32;
        let y = (point.y - half).clamp(0, (height - size) as i32) as u32;

        let image = image::imageops::crop_imm(frame, x, y, size, size).to_image();
        self.template = Some(Template {
            image,
            point: Point::new(x as i32 + half, y as i32 + half),
        });
        self.lost = false;
        Ok(())
    }

    /// Locate the template in `frame` within the bounded search window.
    ///
    /// Hard failures (`NoTemplate`, `EmptySearchRegion`) surface to the
    /// caller; a sub-threshold score returns `Ok` with `lost = true`.
    pub fn update(&mut self, frame: &GrayImage, timestamp: Instant) -> Result<TrackResult> {
        let Some(template) = self.template.as_mut() else {
            return Err(TrackError::NoTemplate);
        };

        let size = template.image.width();
        let (width, height) = frame.dimensions();
        if width < size || height < size {
            self.lost = true;
            return Err(TrackError::EmptySearchRegion);
        }

        let region = search_rect(&self.params, template.point, size, width, height);
        if region.width < size || region.height < size {
            self.lost = true;
            return Err(TrackError::EmptySearchRegion);
        }

        let Some(found) = matcher::match_template(frame, region, &template.image) else {
            self.lost = true;
            return Err(TrackError::EmptySearchRegion);
        };

        if found.score < self.params.score_threshold {
            self.lost = true;
            return Ok(TrackResult {
                point: template.point,
                score: found.score,
                lost: true,
                timestamp,
            });
        }

        let half = (size / 2) as i32;
        let center = Point::new(found.top_left.x + half, found.top_left.y + half);

        if self.params.adaptive_template {
            blend_template(
                &mut template.image,
                frame,
                found.top_left,
                self.params.template_alpha,
            );
        }

        template.point = center;
        self.lost = false;

        Ok(TrackResult {
            point: center,
            score: found.score,
            lost: false,
            timestamp,
        })
    }

    #[cfg(test)]
    pub(crate) fn template_image(&self) -> Option<&GrayImage> {
        self.template.as_ref().map(|t| &t.image)
    }

    #[cfg(test)]
    pub(crate) fn reference_point(&self) -> Option<Point> {
        self.template.as_ref().map(|t| t.point)
    }
}

/// Search window: the last known point expanded by the margin on each
/// side, clamped so a template-sized window can still fit where possible.
fn search_rect(params: &TrackerParams, point: Point, size: u32, width: u32, height: u32) -> Rect {
    let margin = params.search_margin as i32;
    let size_i = size as i32;
    let w = width as i32;
    let h = height as i32;

    let x1 = (point.x - margin).clamp(0, w - size_i);
    let y1 = (point.y - margin).clamp(0, h - size_i);
    let x2 = (point.x + margin).clamp(size_i, w);
    let y2 = (point.y + margin).clamp(size_i, h);

    Rect::new(
        x1 as u32,
        y1 as u32,
        (x2 - x1).max(0) as u32,
        (y2 - y1).max(0) as u32,
    )
}

/// Exponential moving average of the matched window into the template:
/// `new = alpha * observed + (1 - alpha) * old`. Tolerates gradual drift
/// without adopting single-frame outliers outright.
fn blend_template(template: &mut GrayImage, frame: &GrayImage, top_left: Point, alpha: f32) {
    let alpha = alpha.clamp(0.0, 1.0);
    if alpha <= 0.0 {
        return;
    }

    let (tw, th) = template.dimensions();
    let left = top_left.x.max(0) as u32;
    let top = top_left.y.max(0) as u32;
    if left + tw > frame.width() || top + th > frame.height() {
        return;
    }

    for y in 0..th {
        for x in 0..tw {
            let observed = f32::from(frame.get_pixel(left + x, top + y)[0]);
            let old = f32::from(template.get_pixel(x, y)[0]);
            let blended = alpha * observed + (1.0 - alpha) * old;
            template.put_pixel(x, y, Luma([blended.round().clamp(0.0, 255.0) as u8]));
        }
    }
}
