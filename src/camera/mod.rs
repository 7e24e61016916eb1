// Camera domain — capture devices, frames, and the acquisition loop.

pub mod device;
pub mod error;
pub mod frame;
pub mod source;

pub use device::{open_device, CaptureDevice, TestPatternDevice};
pub use error::{CameraError, Result};
pub use frame::Frame;
pub use source::FrameSource;
