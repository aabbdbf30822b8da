//! Anomaly-to-notification dispatch with an optional per-sensor debounce.
//!
//! By default every anomaly handed to [`NotificationDispatcher::dispatch`]
//! raises a notification, so consecutive qualifying samples each fire. A
//! [`NotificationPolicy`] with a debounce window suppresses repeats for the
//! same sensor inside that window. Sensors never suppress each other.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use carewatch_core::types::Timestamp;
use carewatch_core::{Anomaly, SensorKind};
use chrono::Utc;

use crate::bus::NotificationBus;
use crate::notification::Notification;

/// How repeated anomalies from one sensor are treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NotificationPolicy {
    /// Minimum interval between notifications for the same sensor.
    /// `None` fires on every qualifying sample.
    pub debounce: Option<Duration>,
}

impl NotificationPolicy {
    pub fn with_debounce(debounce: Duration) -> Self {
        Self {
            debounce: Some(debounce).filter(|d| !d.is_zero()),
        }
    }
}

/// Tracks when each sensor last fired to enforce the debounce window.
#[derive(Debug, Default)]
struct DebounceTracker {
    last_fired: HashMap<SensorKind, Timestamp>,
}

impl DebounceTracker {
    /// Returns `true` (and records `now`) if `sensor` may fire.
    fn should_fire(&mut self, sensor: SensorKind, window: Duration, now: Timestamp) -> bool {
        if let Some(last) = self.last_fired.get(&sensor) {
            let window = chrono::Duration::from_std(window).unwrap_or(chrono::Duration::MAX);
            if now.signed_duration_since(*last) < window {
                return false;
            }
        }
        self.last_fired.insert(sensor, now);
        true
    }
}

/// Turns anomalies into notifications and publishes them on the bus.
pub struct NotificationDispatcher {
    bus: Arc<NotificationBus>,
    policy: NotificationPolicy,
    debounce: DebounceTracker,
}

impl NotificationDispatcher {
    pub fn new(bus: Arc<NotificationBus>, policy: NotificationPolicy) -> Self {
        Self {
            bus,
            policy,
            debounce: DebounceTracker::default(),
        }
    }

    /// Dispatch an anomaly observed now.
    pub fn dispatch(&mut self, anomaly: Anomaly) -> Option<Notification> {
        self.dispatch_at(anomaly, Utc::now())
    }

    /// Dispatch an anomaly observed at `now`.
    ///
    /// Returns the published notification, or `None` when the debounce
    /// window suppressed it.
    pub fn dispatch_at(&mut self, anomaly: Anomaly, now: Timestamp) -> Option<Notification> {
        if let Some(window) = self.policy.debounce {
            if !self.debounce.should_fire(anomaly.sensor, window, now) {
                tracing::debug!(
                    sensor = %anomaly.sensor,
                    window_ms = window.as_millis() as u64,
                    "Notification suppressed by debounce window",
                );
                return None;
            }
        }

        let notification = Notification::raised_at(anomaly, now);
        let receivers = self.bus.publish(notification.clone());
        tracing::debug!(
            sensor = %notification.sensor,
            id = %notification.id,
            receivers,
            "Notification published",
        );
        Some(notification)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
