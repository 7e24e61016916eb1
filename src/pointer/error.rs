use thiserror::Error;

/// Pointer capability errors. Failures are treated as "skip this frame's
/// pointer action" by the pipeline, never as fatal.
#[derive(Debug, Error)]
pub enum PointerError {
    #[error("pointer backend failure: {0}")]
    Backend(String),
}

/// Convenience Result alias.
pub type Result<T> = std::result::Result<T, PointerError>;
