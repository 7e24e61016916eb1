// Tracking domain — template extraction and bounded-window matching.

pub mod error;
pub mod matcher;
pub mod tracker;
pub mod types;

pub use error::{Result, TrackError};
pub use tracker::{TemplateTracker, TrackResult, TrackerParams};
pub use types::{Point, Rect};
