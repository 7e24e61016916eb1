//! headmouse: hands-free pointer control driven by webcam marker tracking.
//!
//! A camera frame loop feeds a template tracker; the tracked marker's
//! frame-to-frame displacement is mapped to smoothed pointer motion, and a
//! dwell engine clicks when the pointer rests in place. Preview stills and
//! per-frame telemetry fan out to subscribers through a broker.
//!
//! The crate is UI-agnostic: presentation layers, global hotkeys, and the
//! per-platform pointer backend live outside and connect through
//! [`pointer::PointerController`], the [`stream::Broker`], and the
//! [`service::Service`] API.

pub mod camera;
pub mod config;
pub mod pipeline;
pub mod pointer;
pub mod service;
pub mod stream;
pub mod tracking;

// Re-export common types at crate root
pub use camera::{CaptureDevice, Frame, FrameSource};
pub use config::{AllParams, ParamsStore};
pub use pipeline::{FrameProcessor, PipelineError};
pub use pointer::{ClickButton, PointerController};
pub use service::{ParamsListener, Service};
pub use stream::{Broker, PreviewFrame, Telemetry};
pub use tracking::{Point, TemplateTracker, TrackError, TrackResult, TrackerParams};
