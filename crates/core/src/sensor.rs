//! Sensor sample types and the device snapshot.
//!
//! Field names follow the device firmware's camelCase wire format; the
//! heart-rate raw value is written as `filtered` by the device.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize};

use crate::types::EpochMillis;

/// The three sensor streams reported by the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorKind {
    Heartbeat,
    Motion,
    Knock,
}

impl SensorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SensorKind::Heartbeat => "heartbeat",
            SensorKind::Motion => "motion",
            SensorKind::Knock => "knock",
        }
    }
}

impl fmt::Display for SensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One KY-039 heart-rate reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeartbeatSample {
    /// Filtered ADC value, nominally 2500 (idle) to 4000.
    #[serde(rename = "filtered", deserialize_with = "integral")]
    pub raw_value: i64,
    #[serde(deserialize_with = "integral")]
    pub timestamp: EpochMillis,
}

/// One accelerometer + gyroscope reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MotionSample {
    pub accel_x: f64,
    pub accel_y: f64,
    pub accel_z: f64,
    pub gyro_x: f64,
    pub gyro_y: f64,
    pub gyro_z: f64,
    #[serde(deserialize_with = "integral")]
    pub timestamp: EpochMillis,
}

/// Knock / fall sensor state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnockSample {
    /// Running knock counter maintained by the device.
    pub count: u64,
    pub detected: bool,
    #[serde(deserialize_with = "integral")]
    pub timestamp: EpochMillis,
}

/// The most recent entry written under the device history collection.
///
/// Samples are reference-counted so that consumers can tell a freshly
/// decoded sample apart from one they have already observed
/// (`Arc::ptr_eq`). Any sensor may be absent.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceSnapshot {
    /// Feed key of the entry this snapshot was decoded from.
    pub key: String,
    pub heartbeat: Option<Arc<HeartbeatSample>>,
    pub motion: Option<Arc<MotionSample>>,
    pub knock: Option<Arc<KnockSample>>,
    pub last_updated: EpochMillis,
}

/// Accept a JSON integer, or a float that is rounded to the nearest integer.
///
/// The firmware serialises some counters through a float path, so `2950.0`
/// shows up on the wire as often as `2950`.
fn integral<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Number::deserialize(deserializer)?;
    if let Some(v) = value.as_i64() {
        return Ok(v);
    }
    match value.as_f64() {
        Some(v) if v.is_finite() && v.abs() < i64::MAX as f64 => Ok(v.round() as i64),
        _ => Err(serde::de::Error::custom(format!(
            "expected an integral number, got {value}"
        ))),
    }
}
