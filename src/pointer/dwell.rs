use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::warn;

use crate::pointer::controller::{ClickButton, PointerController};

/// Dwell-click configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DwellParams {
    pub enabled: bool,
    /// Time the pointer must stay within the radius before a click fires.
    pub dwell_time: Duration,
    /// Capture radius around the reference point, in pixels.
    pub radius_px: f64,
    pub button: ClickButton,
}

/// Two-state dwell machine: idle/moving vs dwelling.
///
/// Issues a click through the pointer capability when the pointer stays
/// within the capture radius for the dwell duration, then restarts the
/// timer so a stationary pointer keeps clicking once per period. Movement
/// beyond the radius re-references and restarts the timer; movement within
/// it does not rearm.
pub struct DwellEngine {
    controller: Arc<dyn PointerController>,
    params: DwellParams,
    reference: Option<(i32, i32)>,
    dwell_start: Instant,
}

impl DwellEngine {
    pub fn new(controller: Arc<dyn PointerController>, params: DwellParams) -> Self {
        Self {
            controller,
            params,
            reference: None,
            dwell_start: Instant::now(),
        }
    }

    /// Replace the dwell configuration and drop the reference point.
    pub fn set_params(&mut self, params: DwellParams) {
        self.params = params;
        self.reference = None;
    }

    /// Feed the live pointer position. Returns whether a click fired this
    /// cycle.
    ///
    /// Disabled dwell or lost tracking drops the reference point, so the
    /// timer restarts from scratch once conditions recover.
    pub fn update(&mut self, x: i32, y: i32, tracking_lost: bool) -> bool {
        if !self.params.enabled || tracking_lost {
            self.reference = None;
            return false;
        }

        let Some((ref_x, ref_y)) = self.reference else {
            self.reference = Some((x, y));
            self.dwell_start = Instant::now();
            return false;
        };

        if distance(x, y, ref_x, ref_y) > self.params.radius_px {
            self.reference = Some((x, y));
            self.dwell_start = Instant::now();
            return false;
        }

        if self.dwell_start.elapsed() >= self.params.dwell_time {
            if let Err(e) = self.controller.click(self.params.button) {
                warn!("dwell click skipped: {e}");
            }
            self.dwell_start = Instant::now();
            return true;
        }

        false
    }
}

fn distance(x1: i32, y1: i32, x2: i32, y2: i32) -> f64 {
    f64::from(x1 - x2).hypot(f64::from(y1 - y2))
}
