use thiserror::Error;

/// Tracker errors — configuration failures surfaced to the caller of the
/// triggering operation. Tracking loss is not an error; see
/// [`TrackResult::lost`](crate::tracking::TrackResult).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TrackError {
    #[error("template not set")]
    NoTemplate,

    #[error("invalid pick point")]
    InvalidPick,

    #[error("search region empty")]
    EmptySearchRegion,
}

/// Convenience Result alias.
pub type Result<T> = std::result::Result<T, TrackError>;
