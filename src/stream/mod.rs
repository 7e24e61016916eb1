// Stream domain — preview encoding, telemetry snapshots, and subscriber
// fan-out.

pub mod broker;
pub mod preview;
pub mod telemetry;

pub use broker::Broker;
pub use preview::{PreviewEncoder, PreviewFrame};
pub use telemetry::Telemetry;
