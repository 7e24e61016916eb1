use serde::Serialize;

/// Per-frame status snapshot for external observers.
///
/// A plain value with no identity — rebuilt on every frame, emitted
/// unthrottled.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Telemetry {
    /// Instantaneous capture rate.
    pub fps: f64,
    /// Best correlation score of the frame, 0.0 when unavailable.
    pub score: f32,
    /// Whether the marker was lost this frame.
    pub lost: bool,
    /// Whether tracking is currently enabled.
    pub tracking: bool,
    /// Marker position in frame coordinates.
    pub pos_x: i32,
    pub pos_y: i32,
}
