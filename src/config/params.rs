use serde::{Deserialize, Serialize};

/// Overlay marker shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkerShape {
    #[default]
    Circle,
    Square,
}

/// Click kind requested by the user.
///
/// `Double` is accepted in configuration but not implemented; the runtime
/// falls back to a plain left click and logs the gap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClickType {
    #[default]
    Left,
    Right,
    Double,
}

/// Marker-tracking parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingParams {
    pub template_size_px: u32,
    pub search_margin_px: u32,
    pub score_threshold: f64,
    pub adaptive_template: bool,
    pub template_update_alpha: f64,
    pub marker_shape: MarkerShape,
}

impl Default for TrackingParams {
    fn default() -> Self {
        Self {
            template_size_px: 30,
            search_margin_px: 30,
            score_threshold: 0.60,
            adaptive_template: true,
            template_update_alpha: 0.20,
            marker_shape: MarkerShape::Circle,
        }
    }
}

/// Expert overrides for the derived pointer mapping.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointerAdvancedParams {
    pub gain_x: f64,
    pub gain_y: f64,
    pub smoothing: f64,
}

/// Pointer-motion parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointerParams {
    /// UI-facing sensitivity, 1-100.
    pub sensitivity: u32,
    pub deadzone_px: u32,
    pub max_speed_px: u32,
    /// When present, non-zero fields take precedence over the values
    /// derived from `sensitivity`.
    pub advanced: Option<PointerAdvancedParams>,
}

impl Default for PointerParams {
    fn default() -> Self {
        Self {
            sensitivity: 50,
            deadzone_px: 1,
            max_speed_px: 25,
            advanced: None,
        }
    }
}

/// Dwell-click parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClickingParams {
    pub dwell_enabled: bool,
    pub dwell_time_ms: u64,
    pub dwell_radius_px: u32,
    pub click_type: ClickType,
    /// One-shot: the next dwell click is a right click, then the flag
    /// clears itself.
    pub right_click_toggle: bool,
}

impl Default for ClickingParams {
    fn default() -> Self {
        Self {
            dwell_enabled: false,
            dwell_time_ms: 500,
            dwell_radius_px: 30,
            click_type: ClickType::Left,
            right_click_toggle: false,
        }
    }
}

/// The full parameter snapshot exchanged with configuration storage and
/// any UI listener.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllParams {
    pub tracking: TrackingParams,
    pub pointer: PointerParams,
    pub clicking: ClickingParams,
}
