use thiserror::Error;

/// Camera subsystem errors.
#[derive(Debug, Error)]
pub enum CameraError {
    #[error("capture already running")]
    AlreadyRunning,

    #[error("capture not running")]
    NotRunning,

    #[error("no capture backend available: {0}")]
    NoBackend(String),

    #[error("device open failed: {0}")]
    DeviceOpen(String),

    #[error("frame read failed: {0}")]
    FrameRead(String),
}

/// Convenience Result alias.
pub type Result<T> = std::result::Result<T, CameraError>;
