use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::camera::device::CaptureDevice;
use crate::camera::error::{CameraError, Result};
use crate::camera::frame::Frame;

/// Backoff applied after a failed or empty read. Camera hiccups are
/// expected and transient; they are retried, never surfaced.
const READ_RETRY_DELAY: Duration = Duration::from_millis(10);

/// Continuous frame acquisition on a dedicated thread.
///
/// The opened device moves into the acquisition thread and is released
/// when the loop exits, so `stop` returning guarantees the device handle
/// is gone and no further handler invocation can happen.
pub struct FrameSource {
    running: Arc<AtomicBool>,
    fps: Arc<Mutex<f64>>,
    thread: Option<JoinHandle<()>>,
}

impl FrameSource {
    /// Create an idle source.
    pub fn new() -> Self {
        Self {
            running: Arc::new(AtomicBool::new(false)),
            fps: Arc::new(Mutex::new(0.0)),
            thread: None,
        }
    }

    /// Start the acquisition loop, delivering frames to `handler`.
    ///
    /// The handler runs on the acquisition thread; its cost directly
    /// throttles the effective capture rate.
    pub fn start<F>(&mut self, device: Box<dyn CaptureDevice>, handler: F) -> Result<()>
    where
        F: FnMut(Frame) + Send + 'static,
    {
        if self.running.load(Ordering::Acquire) {
            return Err(CameraError::AlreadyRunning);
        }

        self.running.store(true, Ordering::Release);
        let running = Arc::clone(&self.running);
        let fps = Arc::clone(&self.fps);

        let thread = std::thread::Builder::new()
            .name("frame-capture".to_string())
            .spawn(move || {
                info!("capture thread starting");
                run_capture_loop(device, &running, &fps, handler);
                info!("capture thread exiting");
            })
            .map_err(|e| CameraError::DeviceOpen(e.to_string()))?;

        self.thread = Some(thread);
        Ok(())
    }

    /// Signal cancellation and block until the acquisition thread exits.
    ///
    /// No handler invocation fires after this returns.
    pub fn stop(&mut self) -> Result<()> {
        if !self.running.swap(false, Ordering::AcqRel) {
            return Err(CameraError::NotRunning);
        }
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
        *self.fps.lock() = 0.0;
        Ok(())
    }

    /// Whether the acquisition loop is active.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Latest instantaneous FPS estimate, 0.0 while idle.
    pub fn fps(&self) -> f64 {
        *self.fps.lock()
    }
}

impl Default for FrameSource {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for FrameSource {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

fn run_capture_loop<F>(
    mut device: Box<dyn CaptureDevice>,
    running: &AtomicBool,
    fps: &Mutex<f64>,
    mut handler: F,
) where
    F: FnMut(Frame),
{
    let mut last = Instant::now();
    while running.load(Ordering::Acquire) {
        match device.read_frame() {
            Ok(Some(image)) => {
                let now = Instant::now();
                let delta = now.duration_since(last);
                last = now;

                let instant_fps = if delta > Duration::ZERO {
                    1.0 / delta.as_secs_f64()
                } else {
                    0.0
                };
                *fps.lock() = instant_fps;

                handler(Frame::new(image, now, instant_fps));
            }
            Ok(None) => std::thread::sleep(READ_RETRY_DELAY),
            Err(e) => {
                debug!("transient frame read failure: {e}");
                std::thread::sleep(READ_RETRY_DELAY);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;
    use std::collections::VecDeque;
    use std::time::Duration;

    /// Scripted device: plays back a fixed sequence of read outcomes, then
    /// reports empty reads forever.
    struct ScriptedDevice {
        script: VecDeque<Result<Option<RgbImage>>>,
    }

    impl ScriptedDevice {
        fn new(script: Vec<Result<Option<RgbImage>>>) -> Self {
            Self {
                script: script.into(),
            }
        }

        fn frames(count: usize) -> Self {
            Self::new(
                (0..count)
                    .map(|_| Ok(Some(RgbImage::new(8, 8))))
                    .collect(),
            )
        }
    }

    impl CaptureDevice for ScriptedDevice {
        fn read_frame(&mut self) -> Result<Option<RgbImage>> {
            let next = self.script.pop_front().unwrap_or(Ok(None));
            if matches!(next, Ok(Some(_))) {
                // Pace successful reads so per-frame deltas are measurable.
                std::thread::sleep(Duration::from_millis(1));
            }
            next
        }
    }

    fn collecting_handler() -> (Arc<Mutex<Vec<f64>>>, impl FnMut(Frame) + Send + 'static) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        (seen, move |frame: Frame| sink.lock().push(frame.fps))
    }

    fn wait_for<P: Fn() -> bool>(predicate: P) {
        let deadline = Instant::now() + Duration::from_secs(2);
        while !predicate() {
            assert!(Instant::now() < deadline, "timed out waiting for condition");
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn start_delivers_frames_to_handler() {
        let mut source = FrameSource::new();
        let (seen, handler) = collecting_handler();
        source
            .start(Box::new(ScriptedDevice::frames(3)), handler)
            .unwrap();

        wait_for(|| seen.lock().len() >= 3);
        source.stop().unwrap();
        assert!(seen.lock().len() >= 3);
    }

    #[test]
    fn start_twice_fails_with_already_running() {
        let mut source = FrameSource::new();
        let (_seen, handler) = collecting_handler();
        source
            .start(Box::new(ScriptedDevice::frames(1)), handler)
            .unwrap();

        let second = source.start(Box::new(ScriptedDevice::frames(1)), |_| {});
        assert!(matches!(second, Err(CameraError::AlreadyRunning)));
        source.stop().unwrap();
    }

    #[test]
    fn stop_without_start_fails_with_not_running() {
        let mut source = FrameSource::new();
        assert!(matches!(source.stop(), Err(CameraError::NotRunning)));
    }

    #[test]
    fn stop_quiesces_before_returning() {
        let mut source = FrameSource::new();
        let (seen, handler) = collecting_handler();
        source
            .start(Box::new(ScriptedDevice::frames(1000)), handler)
            .unwrap();

        wait_for(|| !seen.lock().is_empty());
        source.stop().unwrap();

        let count = seen.lock().len();
        std::thread::sleep(Duration::from_millis(50));
        assert_eq!(seen.lock().len(), count, "handler fired after stop returned");
    }

    #[test]
    fn source_can_restart_after_stop() {
        let mut source = FrameSource::new();
        let (seen, handler) = collecting_handler();
        source
            .start(Box::new(ScriptedDevice::frames(2)), handler)
            .unwrap();
        wait_for(|| seen.lock().len() >= 2);
        source.stop().unwrap();

        let (seen2, handler2) = collecting_handler();
        source
            .start(Box::new(ScriptedDevice::frames(2)), handler2)
            .unwrap();
        wait_for(|| seen2.lock().len() >= 2);
        source.stop().unwrap();
    }

    #[test]
    fn transient_read_failures_are_retried() {
        let mut source = FrameSource::new();
        let (seen, handler) = collecting_handler();
        let script = vec![
            Err(CameraError::FrameRead("hiccup".to_string())),
            Ok(None),
            Ok(Some(RgbImage::new(8, 8))),
        ];
        source
            .start(Box::new(ScriptedDevice::new(script)), handler)
            .unwrap();

        wait_for(|| !seen.lock().is_empty());
        source.stop().unwrap();
        assert_eq!(seen.lock().len(), 1);
    }

    #[test]
    fn fps_is_positive_while_frames_flow() {
        let mut source = FrameSource::new();
        let (seen, handler) = collecting_handler();
        source
            .start(Box::new(ScriptedDevice::frames(10)), handler)
            .unwrap();

        wait_for(|| seen.lock().len() >= 5);
        let fps = source.fps();
        source.stop().unwrap();
        assert!(fps > 0.0, "expected positive fps, got {fps}");
        assert_eq!(source.fps(), 0.0);
    }
}
