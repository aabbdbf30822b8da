//! Domain types and pure logic for the CareWatch monitor.
//!
//! Nothing in this crate performs I/O: sensor types, the threshold
//! evaluator, the bounded history buffer and the fail-closed payload decoder
//! are all testable in isolation.

pub mod alert;
pub mod decode;
pub mod error;
pub mod evaluator;
pub mod history;
pub mod paths;
pub mod sensor;
pub mod types;

pub use alert::{Alert, AlertSeverity, Anomaly};
pub use error::CoreError;
pub use history::HistoryBuffer;
pub use sensor::{DeviceSnapshot, HeartbeatSample, KnockSample, MotionSample, SensorKind};
