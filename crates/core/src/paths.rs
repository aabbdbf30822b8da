//! Well-known realtime store paths and sensor names.
//!
//! The device writes one entry per reading under [`DEVICE_HISTORY_PATH`];
//! alert records live under [`ALERTS_PATH`]. Both are read-only from the
//! monitor's point of view.

/// Keyed, append-only collection of device readings.
pub const DEVICE_HISTORY_PATH: &str = "elderlyDevice1/history";

/// Keyed collection of externally generated alert records.
pub const ALERTS_PATH: &str = "alerts";

/// Wire key of the heart-rate sub-object inside a device entry.
pub const SENSOR_HEARTBEAT: &str = "heartbeat";

/// Wire key of the motion sub-object (the device firmware calls it `gyro`).
pub const SENSOR_MOTION: &str = "gyro";

/// Alternate wire key accepted for the motion sub-object.
pub const SENSOR_MOTION_ALIAS: &str = "motion";

/// Wire key of the knock sub-object.
pub const SENSOR_KNOCK: &str = "knock";
