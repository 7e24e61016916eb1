// Pipeline domain — per-frame orchestration and overlay rendering.

pub mod error;
pub mod overlay;
pub mod processor;

pub use error::{PipelineError, Result};
pub use processor::{DisplayParams, FrameProcessor, ProcessedFrame};
