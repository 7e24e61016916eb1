use serde::{Deserialize, Serialize};

use crate::pointer::error::Result;

/// Mouse button selection for injected clicks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClickButton {
    Left,
    Right,
    Middle,
}

/// OS pointer-control capability.
///
/// Implemented per platform outside this crate; the pipeline depends only
/// on this trait. Every operation may fail, and callers skip the current
/// frame's pointer action on failure rather than aborting.
pub trait PointerController: Send + Sync {
    /// Move the pointer to absolute screen coordinates.
    fn move_to(&self, x: i32, y: i32) -> Result<()>;

    /// Issue a single click with the given button.
    fn click(&self, button: ClickButton) -> Result<()>;

    /// Current pointer position in screen coordinates.
    fn position(&self) -> Result<(i32, i32)>;

    /// Primary screen dimensions.
    fn screen_size(&self) -> Result<(i32, i32)>;
}
