// Pointer domain — the OS capability trait, displacement mapping, and
// dwell clicking.

pub mod controller;
pub mod dwell;
pub mod error;
pub mod mapper;

pub use controller::{ClickButton, PointerController};
pub use dwell::{DwellEngine, DwellParams};
pub use error::{PointerError, Result};
pub use mapper::{Mapper, MappingParams};
