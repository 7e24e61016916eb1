use image::GrayImage;

use crate::tracking::types::{Point, Rect};

/// Denominators below this are treated as zero variance; such windows
/// cannot be meaningfully correlated and score 0.
const MIN_DENOMINATOR: f64 = 1e-6;

/// Best-scoring placement of a template within a search region.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Match {
    /// Top-left of the matched window, in frame coordinates.
    pub top_left: Point,
    /// Normalized correlation score in [-1, 1].
    pub score: f32,
}

/// Normalized cross-correlation template matching (mean-subtracted,
/// variance-normalized — TM_CCOEFF_NORMED semantics).
///
/// Slides `template` over every offset of `region` within `frame` and
/// returns the global maximum. Single pass per window: the correlation is
/// computed from the raw sums `Σs`, `Σs²` and `Σst` together with the
/// precomputed template statistics. Returns `None` when the region cannot
/// fit the template.
pub fn match_template(frame: &GrayImage, region: Rect, template: &GrayImage) -> Option<Match> {
    let (tw, th) = template.dimensions();
    if tw == 0 || th == 0 || region.width < tw || region.height < th {
        return None;
    }
    if region.x + region.width > frame.width() || region.y + region.height > frame.height() {
        return None;
    }

    let n = f64::from(tw) * f64::from(th);
    let tmpl = template.as_raw();

    let mut t_sum = 0u64;
    let mut t_sq_sum = 0u64;
    for &value in tmpl.iter() {
        t_sum += u64::from(value);
        t_sq_sum += u64::from(value) * u64::from(value);
    }
    let t_sum = t_sum as f64;
    let t_dev = t_sq_sum as f64 - t_sum * t_sum / n;

    let stride = frame.width() as usize;
    let pixels = frame.as_raw();

    let mut best: Option<Match> = None;
    let mut best_score = f32::MIN;
    for dy in 0..=(region.height - th) {
        for dx in 0..=(region.width - tw) {
            let origin = (region.y + dy) as usize * stride + (region.x + dx) as usize;

            let mut s_sum = 0u64;
            let mut s_sq_sum = 0u64;
            let mut st_sum = 0u64;
            for row in 0..th as usize {
                let window = &pixels[origin + row * stride..origin + row * stride + tw as usize];
                let tmpl_row = &tmpl[row * tw as usize..(row + 1) * tw as usize];
                for (&s, &t) in window.iter().zip(tmpl_row) {
                    s_sum += u64::from(s);
                    s_sq_sum += u64::from(s) * u64::from(s);
                    st_sum += u64::from(s) * u64::from(t);
                }
            }

            let s_sum = s_sum as f64;
            let s_dev = s_sq_sum as f64 - s_sum * s_sum / n;
            let numerator = st_sum as f64 - s_sum * t_sum / n;
            let denominator = (s_dev * t_dev).sqrt();

            let score = if denominator > MIN_DENOMINATOR {
                (numerator / denominator).clamp(-1.0, 1.0) as f32
            } else {
                0.0
            };

            if best.is_none() || score > best_score {
                best_score = score;
                best = Some(Match {
                    top_left: Point::new((region.x + dx) as i32, (region.y + dy) as i32),
                    score,
                });
            }
        }
    }

    best
}
