/// Displacement-to-pointer mapping configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MappingParams {
    /// UI-facing sensitivity (1-100) the gains were derived from.
    pub sensitivity: f64,
    pub gain_x: f64,
    pub gain_y: f64,
    /// Low-pass factor in (0, 1]; smaller is smoother.
    pub smoothing: f64,
    /// Displacement magnitude below which an axis is treated as jitter.
    pub deadzone_px: f64,
    /// Per-frame cap on the raw displacement, bounding worst-case jumps.
    pub max_speed_px: f64,
}

/// Stateful per-axis low-pass filter over tracked-point displacement.
///
/// Order per update: deadzone, clamp, gain, exponential smoothing against
/// the previous output. The first update after a reset adopts its target
/// unsmoothed, so stale state never damps a fresh acquisition.
pub struct Mapper {
    params: MappingParams,
    prev: Option<(f64, f64)>,
}

impl Mapper {
    pub fn new(params: MappingParams) -> Self {
        Self { params, prev: None }
    }

    /// Replace the mapping configuration; filter state is kept.
    pub fn set_params(&mut self, params: MappingParams) {
        self.params = params;
    }

    /// Clear filter state. Required whenever tracking is lost or
    /// (re)acquired.
    pub fn reset(&mut self) {
        self.prev = None;
    }

    /// Map a raw displacement to the smoothed delta to apply to the
    /// current pointer position.
    pub fn update(&mut self, dx: f64, dy: f64) -> (f64, f64) {
        let p = self.params;

        let dx = if dx.abs() < p.deadzone_px { 0.0 } else { dx };
        let dy = if dy.abs() < p.deadzone_px { 0.0 } else { dy };

        let dx = dx.clamp(-p.max_speed_px, p.max_speed_px);
        let dy = dy.clamp(-p.max_speed_px, p.max_speed_px);

        let target = (dx * p.gain_x, dy * p.gain_y);
        let (prev_x, prev_y) = self.prev.unwrap_or(target);

        let smoothed = (
            lerp(prev_x, target.0, p.smoothing),
            lerp(prev_y, target.1, p.smoothing),
        );
        self.prev = Some(smoothed);
        smoothed
    }
}

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}
