use thiserror::Error;

use crate::camera::CameraError;
use crate::tracking::TrackError;

/// Pipeline and service errors.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("no frame captured yet")]
    NoFrame,

    #[error(transparent)]
    Track(#[from] TrackError),

    #[error(transparent)]
    Camera(#[from] CameraError),

    #[error("config store: {0}")]
    Store(String),
}

/// Convenience Result alias.
pub type Result<T> = std::result::Result<T, PipelineError>;
