// Configuration domain — the parameter snapshot and its JSON store.

pub mod params;
pub mod store;

pub use params::{
    AllParams, ClickType, ClickingParams, MarkerShape, PointerAdvancedParams, PointerParams,
    TrackingParams,
};
pub use store::ParamsStore;
