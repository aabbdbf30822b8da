//! Transient user-facing notifications.

use std::time::Duration;

use carewatch_core::types::Timestamp;
use carewatch_core::{AlertSeverity, Anomaly, SensorKind};
use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

/// How long a notification stays on screen.
pub const NOTIFICATION_DURATION: Duration = Duration::from_millis(5000);

/// A one-shot, time-limited notification raised for a single anomaly.
///
/// Notifications are never queued or persisted; several may be visible at
/// once when different sensors fire together.
#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub id: Uuid,
    pub sensor: SensorKind,
    pub severity: AlertSeverity,
    pub message: String,
    pub raised_at: Timestamp,
    #[serde(serialize_with = "serialize_duration_ms")]
    pub duration: Duration,
}

impl Notification {
    /// Build a notification for `anomaly`, raised now.
    pub fn from_anomaly(anomaly: Anomaly) -> Self {
        Self::raised_at(anomaly, Utc::now())
    }

    /// Build a notification for `anomaly` with an explicit raise time.
    pub fn raised_at(anomaly: Anomaly, raised_at: Timestamp) -> Self {
        Self {
            id: Uuid::new_v4(),
            sensor: anomaly.sensor,
            severity: anomaly.severity,
            message: anomaly.message,
            raised_at,
            duration: NOTIFICATION_DURATION,
        }
    }

    /// The instant after which the notification should no longer be shown.
    pub fn expires_at(&self) -> Timestamp {
        // NOTIFICATION_DURATION is a small constant, always representable.
        self.raised_at
            + chrono::Duration::from_std(self.duration).unwrap_or(chrono::Duration::zero())
    }

    pub fn is_expired(&self, now: Timestamp) -> bool {
        now >= self.expires_at()
    }
}

fn serialize_duration_ms<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_u64(duration.as_millis() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn anomaly() -> Anomaly {
        Anomaly {
            sensor: SensorKind::Motion,
            severity: AlertSeverity::High,
            message: "Dramatic movement detected".into(),
        }
    }

    #[test]
    fn expires_five_seconds_after_raise() {
        let raised = Utc::now();
        let notification = Notification::raised_at(anomaly(), raised);

        assert_eq!(
            notification.expires_at() - raised,
            chrono::Duration::milliseconds(5000)
        );
        assert!(!notification.is_expired(raised + chrono::Duration::milliseconds(4999)));
        assert!(notification.is_expired(raised + chrono::Duration::milliseconds(5000)));
    }

    #[test]
    fn serializes_duration_as_millis() {
        let notification = Notification::from_anomaly(anomaly());
        let json = serde_json::to_value(&notification).expect("serializable");

        assert_eq!(json["duration"], 5000);
        assert_eq!(json["sensor"], "motion");
        assert_eq!(json["severity"], "high");
    }

    #[test]
    fn every_notification_gets_a_fresh_id() {
        let a = Notification::from_anomaly(anomaly());
        let b = Notification::from_anomaly(anomaly());
        assert_ne!(a.id, b.id);
    }
}
