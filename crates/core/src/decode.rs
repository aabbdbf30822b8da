//! Schema-validated decoding of feed payloads.
//!
//! Feed payloads are untyped JSON trees. Decoding fails closed: a record or
//! sensor sub-object that does not match its schema is treated as absent and
//! logged, never propagated as an error and never trusted structurally.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::alert::Alert;
use crate::error::CoreError;
use crate::paths::{SENSOR_HEARTBEAT, SENSOR_KNOCK, SENSOR_MOTION, SENSOR_MOTION_ALIAS};
use crate::sensor::{DeviceSnapshot, HeartbeatSample, KnockSample, MotionSample};

/// Return the entry stored under the last key of a keyed collection.
///
/// The device history collection is append-only, so the final key in
/// insertion order is the most recent entry. `None` for absent, `null`,
/// empty, or non-object payloads.
pub fn latest_entry(payload: Option<&Value>) -> Option<(&str, &Value)> {
    match payload? {
        Value::Object(map) => map.iter().next_back().map(|(k, v)| (k.as_str(), v)),
        Value::Null => None,
        other => {
            tracing::warn!(kind = json_kind(other), "Device payload is not a keyed collection");
            None
        }
    }
}

/// Decode the latest device entry from a full device-history payload.
pub fn decode_device_payload(payload: Option<&Value>) -> Option<DeviceSnapshot> {
    let (key, entry) = latest_entry(payload)?;
    match decode_device_entry(key, entry) {
        Ok(snapshot) => Some(snapshot),
        Err(e) => {
            tracing::warn!(key, error = %e, "Discarding malformed device entry");
            None
        }
    }
}

/// Decode a single device entry.
///
/// The entry itself must be an object; each sensor sub-object is decoded
/// independently and dropped on mismatch. A missing `lastUpdated` falls back
/// to the newest sample timestamp.
pub fn decode_device_entry(key: &str, entry: &Value) -> Result<DeviceSnapshot, CoreError> {
    let fields = entry.as_object().ok_or_else(|| {
        CoreError::Decode(format!("entry {key} is {}, expected object", json_kind(entry)))
    })?;

    let heartbeat: Option<Arc<HeartbeatSample>> =
        decode_field(key, fields, SENSOR_HEARTBEAT).map(Arc::new);
    let motion: Option<Arc<MotionSample>> = decode_field(key, fields, SENSOR_MOTION)
        .or_else(|| decode_field(key, fields, SENSOR_MOTION_ALIAS))
        .map(Arc::new);
    let knock: Option<Arc<KnockSample>> = decode_field(key, fields, SENSOR_KNOCK).map(Arc::new);

    let last_updated = fields
        .get("lastUpdated")
        .and_then(Value::as_f64)
        .map(|v| v.round() as i64)
        .or_else(|| {
            [
                heartbeat.as_ref().map(|s| s.timestamp),
                motion.as_ref().map(|s| s.timestamp),
                knock.as_ref().map(|s| s.timestamp),
            ]
            .into_iter()
            .flatten()
            .max()
        })
        .unwrap_or(0);

    Ok(DeviceSnapshot {
        key: key.to_string(),
        heartbeat,
        motion,
        knock,
        last_updated,
    })
}

/// Decode every record of the alerts collection, using each key as the id.
///
/// Records that do not match the [`Alert`] schema are skipped.
pub fn decode_alerts_payload(payload: Option<&Value>) -> Vec<Alert> {
    let map = match payload {
        Some(Value::Object(map)) => map,
        Some(Value::Null) | None => return Vec::new(),
        Some(other) => {
            tracing::warn!(kind = json_kind(other), "Alerts payload is not a keyed collection");
            return Vec::new();
        }
    };

    map.iter()
        .filter_map(|(id, record)| match Alert::deserialize_record(record) {
            Ok(alert) => Some(Alert {
                id: id.clone(),
                ..alert
            }),
            Err(e) => {
                tracing::warn!(id = %id, error = %e, "Skipping malformed alert record");
                None
            }
        })
        .collect()
}

impl Alert {
    fn deserialize_record(record: &Value) -> Result<Self, CoreError> {
        Self::deserialize(record).map_err(|e| CoreError::Decode(e.to_string()))
    }
}

fn decode_field<T: DeserializeOwned>(
    key: &str,
    fields: &Map<String, Value>,
    name: &str,
) -> Option<T> {
    let raw = fields.get(name)?;
    if raw.is_null() {
        return None;
    }
    match T::deserialize(raw) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(key, sensor = name, error = %e, "Dropping malformed sensor reading");
            None
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
