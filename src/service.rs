use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::camera::{self, CaptureDevice, Frame, FrameSource};
use crate::config::{
    AllParams, ClickType, ClickingParams, ParamsStore, PointerParams, TrackingParams,
};
use crate::pipeline::error::{PipelineError, Result};
use crate::pipeline::{DisplayParams, FrameProcessor};
use crate::pointer::{
    ClickButton, DwellEngine, DwellParams, Mapper, MappingParams, PointerController,
};
use crate::stream::Broker;
use crate::tracking::{Point, TrackerParams};

/// Preview emission interval (~15 fps regardless of camera rate).
const PREVIEW_INTERVAL: Duration = Duration::from_millis(66);

const DEFAULT_DEVICE_INDEX: u32 = 0;

/// Listener invoked (asynchronously) after every parameter change.
pub type ParamsListener = Arc<dyn Fn(AllParams) + Send + Sync>;

/// Pointer-motion state fed from the frame-handling path.
struct MotionState {
    mapper: Mapper,
    dwell: DwellEngine,
    /// Previous tracked point, the base for the next displacement. Cleared
    /// on loss so re-acquisition never produces a jump.
    anchor: Option<Point>,
}

/// Orchestrating service: wires the frame source into the processor and
/// feeds tracked points to the pointer mapper and dwell engine.
///
/// Frame handling runs synchronously on the acquisition thread; parameter
/// updates and pick-point requests arrive concurrently from the caller and
/// synchronize through the internal locks.
pub struct Service {
    store: ParamsStore,
    listener: Option<ParamsListener>,
    params: RwLock<AllParams>,

    source: Mutex<FrameSource>,
    processor: Arc<FrameProcessor>,
    controller: Arc<dyn PointerController>,
    motion: Mutex<MotionState>,
    broker: Arc<Broker>,

    device_index: u32,
}

impl Service {
    /// Build a service from persisted parameters. A corrupt or unreadable
    /// store falls back to defaults.
    pub fn new(
        store: ParamsStore,
        controller: Arc<dyn PointerController>,
        listener: Option<ParamsListener>,
    ) -> Self {
        let params = store.load().unwrap_or_else(|e| {
            warn!("failed to load saved parameters, using defaults: {e}");
            AllParams::default()
        });

        let broker = Arc::new(Broker::new());
        let processor = Arc::new(FrameProcessor::new(
            tracker_params(&params.tracking),
            display_params(&params.tracking),
            PREVIEW_INTERVAL,
            Arc::clone(&broker),
        ));

        let motion = MotionState {
            mapper: Mapper::new(mapping_params(&params.pointer)),
            dwell: DwellEngine::new(Arc::clone(&controller), dwell_params(&params.clicking)),
            anchor: None,
        };

        Self {
            store,
            listener,
            params: RwLock::new(params),
            source: Mutex::new(FrameSource::new()),
            processor,
            controller,
            motion: Mutex::new(motion),
            broker,
            device_index: DEFAULT_DEVICE_INDEX,
        }
    }

    /// Use a different camera device index for subsequent starts.
    pub fn with_device_index(mut self, index: u32) -> Self {
        self.device_index = index;
        self
    }

    /// The broker carrying preview and telemetry events.
    pub fn broker(&self) -> Arc<Broker> {
        Arc::clone(&self.broker)
    }

    /// Current parameter snapshot.
    pub fn params(&self) -> AllParams {
        self.params.read().clone()
    }

    /// Whether capture is running.
    pub fn is_running(&self) -> bool {
        self.source.lock().is_running()
    }

    /// Open the configured capture device and start the frame loop.
    pub fn start(self: &Arc<Self>) -> Result<()> {
        let device = camera::open_device(self.device_index)?;
        self.start_with_device(device)
    }

    /// Start the frame loop on an already-opened capture device.
    pub fn start_with_device(self: &Arc<Self>, device: Box<dyn CaptureDevice>) -> Result<()> {
        let service = Arc::downgrade(self);
        self.source.lock().start(device, move |frame| {
            if let Some(service) = service.upgrade() {
                service.handle_frame(&frame);
            }
        })?;
        info!("capture started");
        Ok(())
    }

    /// Stop capture, wait for the acquisition thread to quiesce, and drop
    /// the stored pick-point frame.
    pub fn stop(&self) -> Result<()> {
        self.source.lock().stop()?;
        self.processor.release_frame();
        info!("capture stopped");
        Ok(())
    }

    /// One full frame cycle: processing, pointer motion, dwell clicking.
    fn handle_frame(&self, frame: &Frame) {
        let processed = self.processor.process(frame);

        let clicked = {
            let mut motion = self.motion.lock();

            if processed.lost {
                motion.mapper.reset();
                motion.anchor = None;
            } else {
                if let Some(anchor) = motion.anchor {
                    // X is inverted: the camera mirrors the user, so moving
                    // left in the frame should move the pointer left on
                    // screen.
                    let dx = f64::from(anchor.x - processed.point.x);
                    let dy = f64::from(processed.point.y - anchor.y);
                    let (move_x, move_y) = motion.mapper.update(dx, dy);
                    if move_x != 0.0 || move_y != 0.0 {
                        self.apply_pointer_delta(move_x, move_y);
                    }
                } else {
                    motion.mapper.reset();
                }
                motion.anchor = Some(processed.point);
            }

            match self.controller.position() {
                Ok((x, y)) => motion.dwell.update(x, y, processed.lost),
                Err(e) => {
                    debug!("pointer position unavailable, skipping dwell: {e}");
                    false
                }
            }
        };

        if clicked {
            self.after_dwell_click();
        }
    }

    /// Move the pointer relative to its current position. Capability
    /// failures skip this frame's motion.
    fn apply_pointer_delta(&self, move_x: f64, move_y: f64) {
        let (x, y) = match self.controller.position() {
            Ok(position) => position,
            Err(e) => {
                debug!("pointer position unavailable, skipping move: {e}");
                return;
            }
        };
        let target_x = x + move_x.round() as i32;
        let target_y = y + move_y.round() as i32;
        if let Err(e) = self.controller.move_to(target_x, target_y) {
            debug!("pointer move skipped: {e}");
        }
    }

    /// Clear the one-shot right-click toggle after a dwell click fired.
    fn after_dwell_click(&self) {
        let updated = {
            let mut params = self.params.write();
            if !params.clicking.right_click_toggle {
                return;
            }
            params.clicking.right_click_toggle = false;
            params.clone()
        };
        self.apply_runtime_params(&updated);
        self.notify_listener(updated);
    }

    /// Pick a new template at a point in mirrored display coordinates.
    pub fn set_pick_point(&self, display_point: Point) -> Result<()> {
        self.processor.set_pick_point(display_point)?;
        self.reset_motion();
        Ok(())
    }

    /// Re-pick the template at the frame center and park the pointer at
    /// the screen center.
    pub fn recenter(&self) -> Result<()> {
        self.processor.recenter()?;
        self.reset_motion();

        if let Ok((width, height)) = self.controller.screen_size() {
            if let Err(e) = self.controller.move_to(width / 2, height / 2) {
                debug!("cursor centering skipped: {e}");
            }
        }
        Ok(())
    }

    /// Enable or disable tracking. The template is kept either way.
    pub fn set_tracking_enabled(&self, enabled: bool) {
        self.processor.set_tracking_enabled(enabled);
        if !enabled {
            self.reset_motion();
        }
    }

    /// Replace the parameter snapshot and re-derive all runtime state.
    pub fn update_params(&self, next: AllParams) {
        *self.params.write() = next.clone();
        self.apply_runtime_params(&next);
        self.notify_listener(next);
    }

    /// Replace the parameter snapshot and persist it.
    pub fn save_params(&self, next: AllParams) -> Result<()> {
        self.update_params(next.clone());
        self.store.save(&next).map_err(PipelineError::Store)
    }

    fn reset_motion(&self) {
        let mut motion = self.motion.lock();
        motion.mapper.reset();
        motion.anchor = None;
    }

    fn apply_runtime_params(&self, params: &AllParams) {
        self.processor
            .set_tracker_params(tracker_params(&params.tracking));
        self.processor
            .set_display_params(display_params(&params.tracking));

        let mut motion = self.motion.lock();
        motion.mapper.set_params(mapping_params(&params.pointer));
        motion.dwell.set_params(dwell_params(&params.clicking));
    }

    /// Hand the changed snapshot to the listener without blocking the
    /// update path.
    fn notify_listener(&self, params: AllParams) {
        if let Some(listener) = &self.listener {
            let listener = Arc::clone(listener);
            std::thread::spawn(move || listener(params));
        }
    }
}

fn tracker_params(tracking: &TrackingParams) -> TrackerParams {
    TrackerParams {
        template_size: tracking.template_size_px,
        search_margin: tracking.search_margin_px,
        score_threshold: tracking.score_threshold as f32,
        adaptive_template: tracking.adaptive_template,
        template_alpha: tracking.template_update_alpha as f32,
    }
}

fn display_params(tracking: &TrackingParams) -> DisplayParams {
    DisplayParams {
        marker_shape: tracking.marker_shape,
        marker_size: tracking.template_size_px,
    }
}

/// Derive gain and smoothing from the UI sensitivity: gain rises linearly
/// with sensitivity while smoothing relaxes, and explicit advanced
/// overrides take precedence.
fn mapping_params(pointer: &PointerParams) -> MappingParams {
    let sensitivity = f64::from(pointer.sensitivity);
    let gain = map_range(sensitivity, 1.0, 100.0, 1.2, 5.0) * 4.0;
    let mut gain_x = gain;
    let mut gain_y = gain;
    let mut smoothing = map_range(sensitivity, 1.0, 100.0, 0.35, 0.15);

    if let Some(advanced) = &pointer.advanced {
        if advanced.gain_x != 0.0 {
            gain_x = advanced.gain_x;
        }
        if advanced.gain_y != 0.0 {
            gain_y = advanced.gain_y;
        }
        if advanced.smoothing != 0.0 {
            smoothing = advanced.smoothing;
        }
    }

    MappingParams {
        sensitivity,
        gain_x,
        gain_y,
        smoothing,
        deadzone_px: f64::from(pointer.deadzone_px),
        max_speed_px: f64::from(pointer.max_speed_px).max(1.0),
    }
}

fn dwell_params(clicking: &ClickingParams) -> DwellParams {
    DwellParams {
        enabled: clicking.dwell_enabled,
        dwell_time: Duration::from_millis(clicking.dwell_time_ms),
        radius_px: f64::from(clicking.dwell_radius_px),
        button: click_button(clicking.click_type, clicking.right_click_toggle),
    }
}

fn click_button(click: ClickType, right_toggle: bool) -> ClickButton {
    if right_toggle {
        return ClickButton::Right;
    }
    match click {
        ClickType::Left => ClickButton::Left,
        ClickType::Right => ClickButton::Right,
        ClickType::Double => {
            warn!("double-click is not implemented; falling back to a left click");
            ClickButton::Left
        }
    }
}

fn map_range(value: f64, in_min: f64, in_max: f64, out_min: f64, out_max: f64) -> f64 {
    if (in_max - in_min).abs() < f64::EPSILON {
        return out_min;
    }
    let value = value.clamp(in_min, in_max);
    (value - in_min) * (out_max - out_min) / (in_max - in_min) + out_min
}
