//! Alert records read from the external alerts collection, and the
//! locally derived [`Anomaly`] verdict.

use serde::{Deserialize, Serialize};

use crate::sensor::SensorKind;

/// Severity shared by stored alerts and local anomalies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Low,
    Medium,
    High,
}

/// An alert record as stored under the alerts path.
///
/// `id` is the record's feed key; every other field is taken verbatim from
/// the stored value. These records are never written by the monitor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type")]
    pub kind: SensorKind,
    pub message: String,
    pub severity: AlertSeverity,
    pub timestamp: String,
    pub acknowledged: bool,
}

/// The evaluator's verdict that a single sample crossed a threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Anomaly {
    pub sensor: SensorKind,
    pub severity: AlertSeverity,
    pub message: String,
}
