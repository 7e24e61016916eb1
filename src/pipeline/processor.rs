use std::sync::Arc;
use std::time::{Duration, Instant};

use image::RgbImage;
use parking_lot::{Mutex, RwLock};
use tracing::debug;

use crate::camera::Frame;
use crate::config::MarkerShape;
use crate::pipeline::error::{PipelineError, Result};
use crate::pipeline::overlay::{self, Marker, COLOR_DISABLED, COLOR_LOST, COLOR_TRACKED};
use crate::stream::{Broker, PreviewEncoder, Telemetry};
use crate::tracking::{Point, TemplateTracker, TrackerParams};

/// Display-facing processor parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayParams {
    pub marker_shape: MarkerShape,
    /// Marker footprint, kept equal to the template size.
    pub marker_size: u32,
}

/// Outcome of processing one camera frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProcessedFrame {
    /// Tracked point, or the last known marker while lost.
    pub point: Point,
    pub score: f32,
    pub lost: bool,
    pub timestamp: Instant,
}

/// State shared between the frame-handling path and caller-side updates.
///
/// Readers copy out under the read lock before doing any expensive work;
/// writers replace values atomically. The stored frame is the single
/// "current" frame for pick-point operations: replacing it drops the
/// superseded buffer under the same lock.
struct ProcessorState {
    display: DisplayParams,
    marker: Option<Point>,
    last_frame: Option<RgbImage>,
    tracking_enabled: bool,
}

/// Per-frame orchestration: tracking, overlay rendering, throttled preview
/// encoding, and telemetry assembly.
pub struct FrameProcessor {
    state: RwLock<ProcessorState>,
    tracker: Mutex<TemplateTracker>,
    preview: Mutex<PreviewEncoder>,
    broker: Arc<Broker>,
}

impl FrameProcessor {
    pub fn new(
        tracker_params: TrackerParams,
        display: DisplayParams,
        preview_interval: Duration,
        broker: Arc<Broker>,
    ) -> Self {
        Self {
            state: RwLock::new(ProcessorState {
                display,
                marker: None,
                last_frame: None,
                tracking_enabled: true,
            }),
            tracker: Mutex::new(TemplateTracker::new(tracker_params)),
            preview: Mutex::new(PreviewEncoder::new(preview_interval)),
            broker,
        }
    }

    /// Handle a single camera frame.
    ///
    /// Runs on the acquisition thread. Tracking loss (or a tracker error)
    /// keeps the last known marker on screen rather than snapping to the
    /// origin, so a momentary dropout does not glitch the display.
    pub fn process(&self, frame: &Frame) -> ProcessedFrame {
        let (enabled, saved_marker, display) = {
            let mut state = self.state.write();
            state.last_frame = Some(frame.image.clone());
            (state.tracking_enabled, state.marker, state.display)
        };

        let mut point = saved_marker.unwrap_or_default();
        let mut score = 0.0f32;
        let mut lost = true;

        if enabled {
            let gray = frame.to_luma();
            match self.tracker.lock().update(&gray, frame.timestamp) {
                Ok(result) => {
                    score = result.score;
                    if !result.lost {
                        point = result.point;
                        lost = false;
                    }
                }
                Err(e) => debug!("tracking unavailable this frame: {e}"),
            }
        }

        if !lost {
            self.state.write().marker = Some(point);
        }

        self.render_and_emit(frame, point, score, lost, enabled, display);

        self.broker.emit_telemetry(&Telemetry {
            fps: frame.fps,
            score,
            lost,
            tracking: enabled,
            pos_x: point.x,
            pos_y: point.y,
        });

        ProcessedFrame {
            point,
            score,
            lost,
            timestamp: frame.timestamp,
        }
    }

    /// Mirror the frame for display, draw the marker, and offer the result
    /// to the throttled preview path.
    fn render_and_emit(
        &self,
        frame: &Frame,
        point: Point,
        score: f32,
        lost: bool,
        enabled: bool,
        display: DisplayParams,
    ) {
        let color = if !enabled {
            COLOR_DISABLED
        } else if lost {
            COLOR_LOST
        } else {
            COLOR_TRACKED
        };

        // Mirroring matches what a user sees of themselves.
        let mut display_image = image::imageops::flip_horizontal(&frame.image);
        let mirrored = Point::new(frame.width() as i32 - point.x, point.y);

        overlay::draw(
            &mut display_image,
            &Marker {
                point: mirrored,
                shape: display.marker_shape,
                color,
                size: display.marker_size,
                score,
            },
        );

        if let Some(preview) = self.preview.lock().encode(&display_image) {
            self.broker.emit_preview(&preview);
        }
    }

    /// Pick a new tracking template at a point given in mirrored display
    /// coordinates. Fails with `NoFrame` before the first captured frame.
    /// Returns the un-mirrored frame-coordinate point that became the
    /// marker.
    pub fn set_pick_point(&self, display_point: Point) -> Result<Point> {
        let frame = self
            .state
            .read()
            .last_frame
            .clone()
            .ok_or(PipelineError::NoFrame)?;

        let point = Point::new(frame.width() as i32 - display_point.x, display_point.y);
        self.pick(&frame, point)
    }

    /// Re-pick the template at the geometric center of the current frame.
    pub fn recenter(&self) -> Result<Point> {
        let frame = self
            .state
            .read()
            .last_frame
            .clone()
            .ok_or(PipelineError::NoFrame)?;

        let point = Point::new(frame.width() as i32 / 2, frame.height() as i32 / 2);
        self.pick(&frame, point)
    }

    fn pick(&self, frame: &RgbImage, point: Point) -> Result<Point> {
        let gray = image::imageops::grayscale(frame);
        self.tracker.lock().set_template(&gray, point)?;
        self.state.write().marker = Some(point);
        Ok(point)
    }

    /// Enable or disable tracking. Disabling reports every frame as lost
    /// but keeps the template, so re-enabling resumes from the same
    /// reference.
    pub fn set_tracking_enabled(&self, enabled: bool) {
        self.state.write().tracking_enabled = enabled;
    }

    pub fn is_tracking_enabled(&self) -> bool {
        self.state.read().tracking_enabled
    }

    /// Replace the tracker configuration.
    pub fn set_tracker_params(&self, params: TrackerParams) {
        self.tracker.lock().set_params(params);
    }

    /// Replace the display configuration.
    pub fn set_display_params(&self, params: DisplayParams) {
        self.state.write().display = params;
    }

    /// Last known marker point in frame coordinates.
    pub fn marker(&self) -> Option<Point> {
        self.state.read().marker
    }

    /// Drop the stored pick-point frame, e.g. after capture stops.
    pub fn release_frame(&self) {
        self.state.write().last_frame = None;
    }

    /// The broker this processor emits through.
    pub fn broker(&self) -> &Arc<Broker> {
        &self.broker
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn display() -> DisplayParams {
        DisplayParams {
            marker_shape: MarkerShape::Circle,
            marker_size: 30,
        }
    }

    fn processor(broker: Arc<Broker>) -> FrameProcessor {
        FrameProcessor::new(
            TrackerParams::default(),
            display(),
            Duration::from_secs(3600),
            broker,
        )
    }

    /// Deterministic high-variance patch pixel (grayscale-stable since all
    /// channels are equal).
    fn patch_pixel(dx: u32, dy: u32) -> u8 {
        ((dx * 31 + dy * 17) * 97 % 251) as u8
    }

    /// Uniform 320x240 frame with a 30x30 patch centered at `(cx, cy)`.
    fn frame_with_patch(cx: u32, cy: u32) -> Frame {
        let mut image = RgbImage::from_pixel(320, 240, Rgb([128, 128, 128]));
        for dy in 0..30 {
            for dx in 0..30 {
                let v = patch_pixel(dx, dy);
                image.put_pixel(cx - 15 + dx, cy - 15 + dy, Rgb([v, v, v]));
            }
        }
        Frame::new(image, Instant::now(), 30.0)
    }

    fn blank_frame() -> Frame {
        Frame::new(
            RgbImage::from_pixel(320, 240, Rgb([128, 128, 128])),
            Instant::now(),
            30.0,
        )
    }

    #[test]
    fn set_pick_point_before_any_frame_fails_with_no_frame() {
        let processor = processor(Arc::new(Broker::new()));
        let result = processor.set_pick_point(Point::new(100, 100));
        assert!(matches!(result, Err(PipelineError::NoFrame)));
    }

    #[test]
    fn recenter_before_any_frame_fails_with_no_frame() {
        let processor = processor(Arc::new(Broker::new()));
        assert!(matches!(processor.recenter(), Err(PipelineError::NoFrame)));
    }

    #[test]
    fn pick_point_round_trips_through_unmirroring() {
        let processor = processor(Arc::new(Broker::new()));
        processor.process(&frame_with_patch(100, 100));

        // Frame is 320 wide: display x 220 un-mirrors to frame x 100.
        let point = processor.set_pick_point(Point::new(220, 100)).unwrap();
        assert_eq!(point, Point::new(100, 100));
        assert_eq!(processor.marker(), Some(Point::new(100, 100)));
    }

    #[test]
    fn recenter_targets_the_frame_center() {
        let processor = processor(Arc::new(Broker::new()));
        processor.process(&blank_frame());
        let point = processor.recenter().unwrap();
        assert_eq!(point, Point::new(160, 120));
        assert_eq!(processor.marker(), Some(Point::new(160, 120)));
    }

    #[test]
    fn invalid_pick_surfaces_without_changing_the_marker() {
        let processor = processor(Arc::new(Broker::new()));
        processor.set_tracker_params(TrackerParams {
            template_size: 0,
            ..TrackerParams::default()
        });
        processor.process(&frame_with_patch(100, 100));

        let result = processor.set_pick_point(Point::new(220, 100));
        assert!(matches!(
            result,
            Err(PipelineError::Track(crate::tracking::TrackError::InvalidPick))
        ));
        assert_eq!(processor.marker(), None);
    }

    #[test]
    fn successful_tracking_updates_the_marker() {
        let processor = processor(Arc::new(Broker::new()));
        processor.process(&frame_with_patch(100, 100));
        processor.set_pick_point(Point::new(220, 100)).unwrap();

        let result = processor.process(&frame_with_patch(110, 100));
        assert!(!result.lost);
        assert_eq!(result.point, Point::new(110, 100));
        assert_eq!(processor.marker(), Some(Point::new(110, 100)));
    }

    #[test]
    fn loss_retains_the_last_known_marker() {
        let processor = processor(Arc::new(Broker::new()));
        processor.process(&frame_with_patch(100, 100));
        processor.set_pick_point(Point::new(220, 100)).unwrap();
        processor.process(&frame_with_patch(110, 100));

        let result = processor.process(&blank_frame());
        assert!(result.lost);
        assert_eq!(result.point, Point::new(110, 100));
        assert_eq!(processor.marker(), Some(Point::new(110, 100)));
    }

    #[test]
    fn disabled_tracking_reports_every_frame_lost() {
        let broker = Arc::new(Broker::new());
        let lost_flags = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let tracking_flags = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let (lost_sink, tracking_sink) = (Arc::clone(&lost_flags), Arc::clone(&tracking_flags));
        broker.subscribe_telemetry(move |t| {
            lost_sink.lock().push(t.lost);
            tracking_sink.lock().push(t.tracking);
        });

        let processor = processor(broker);
        processor.process(&frame_with_patch(100, 100));
        processor.set_pick_point(Point::new(220, 100)).unwrap();
        processor.set_tracking_enabled(false);

        processor.process(&frame_with_patch(100, 100));
        processor.process(&frame_with_patch(105, 100));

        assert_eq!(lost_flags.lock().as_slice(), [true, true, true]);
        assert_eq!(tracking_flags.lock().as_slice(), [true, false, false]);
    }

    #[test]
    fn re_enabling_resumes_from_the_kept_template() {
        let processor = processor(Arc::new(Broker::new()));
        processor.process(&frame_with_patch(100, 100));
        processor.set_pick_point(Point::new(220, 100)).unwrap();

        processor.set_tracking_enabled(false);
        assert!(processor.process(&frame_with_patch(100, 100)).lost);

        processor.set_tracking_enabled(true);
        let result = processor.process(&frame_with_patch(108, 104));
        assert!(!result.lost);
        assert_eq!(result.point, Point::new(108, 104));
    }

    #[test]
    fn telemetry_is_emitted_every_frame_unthrottled() {
        let broker = Arc::new(Broker::new());
        let telemetry_count = Arc::new(AtomicUsize::new(0));
        let preview_count = Arc::new(AtomicUsize::new(0));
        let (t_sink, p_sink) = (Arc::clone(&telemetry_count), Arc::clone(&preview_count));
        broker.subscribe_telemetry(move |_| {
            t_sink.fetch_add(1, Ordering::Relaxed);
        });
        broker.subscribe_preview(move |_| {
            p_sink.fetch_add(1, Ordering::Relaxed);
        });

        // Hour-long preview interval: only the first frame may emit one.
        let processor = processor(broker);
        for _ in 0..5 {
            processor.process(&blank_frame());
        }

        assert_eq!(telemetry_count.load(Ordering::Relaxed), 5);
        assert_eq!(preview_count.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn preview_frames_are_mirrored() {
        let broker = Arc::new(Broker::new());
        let seen = Arc::new(parking_lot::Mutex::new(None));
        let sink = Arc::clone(&seen);
        broker.subscribe_preview(move |frame| {
            *sink.lock() = Some((frame.width, frame.height, frame.data.clone()));
        });

        let processor = FrameProcessor::new(
            TrackerParams::default(),
            display(),
            Duration::ZERO,
            broker,
        );

        // Left half dark, right half bright.
        let image = RgbImage::from_fn(64, 32, |x, _| {
            if x < 32 {
                Rgb([10, 10, 10])
            } else {
                Rgb([240, 240, 240])
            }
        });
        processor.process(&Frame::new(image, Instant::now(), 30.0));

        let (width, height, data) = seen.lock().clone().unwrap();
        assert_eq!((width, height), (64, 32));

        use base64::engine::general_purpose::STANDARD;
        use base64::Engine as _;
        let jpeg = STANDARD.decode(data).unwrap();
        let decoded = image::load_from_memory(&jpeg).unwrap().to_luma8();
        // Mirrored: bright half now on the left.
        assert!(decoded.get_pixel(4, 16)[0] > 128);
        assert!(decoded.get_pixel(60, 16)[0] < 128);
    }

    #[test]
    fn release_frame_requires_a_new_capture_before_picking() {
        let processor = processor(Arc::new(Broker::new()));
        processor.process(&frame_with_patch(100, 100));
        processor.release_frame();
        assert!(matches!(
            processor.set_pick_point(Point::new(220, 100)),
            Err(PipelineError::NoFrame)
        ));
    }

    #[test]
    fn grayscale_conversion_feeds_the_tracker() {
        // A color frame whose channels differ still tracks correctly after
        // luma conversion.
        let mut image = RgbImage::from_pixel(320, 240, Rgb([120, 130, 140]));
        for dy in 0..30u32 {
            for dx in 0..30u32 {
                let v = patch_pixel(dx, dy);
                image.put_pixel(85 + dx, 85 + dy, Rgb([v, v, v]));
            }
        }
        let frame = Frame::new(image, Instant::now(), 30.0);

        let processor = processor(Arc::new(Broker::new()));
        processor.process(&frame);
        let picked = processor.set_pick_point(Point::new(220, 100)).unwrap();
        assert_eq!(picked, Point::new(100, 100));

        let result = processor.process(&frame);
        assert!(!result.lost);
        assert!(result.score > 0.9, "score {}", result.score);
    }
}
