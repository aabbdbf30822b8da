//! Session-scoped dashboard state.
//!
//! [`DashboardSession`] owns everything the views read: the current device
//! snapshot, one rolling history per sensor, the alert list, and the
//! loading/error flags. It is mutated only through [`DashboardSession::apply`]
//! from the single task that drains the feed adapter.
//!
//! A sample is "new" when its `Arc` differs from the last one appended to
//! that sensor's history. Only new samples are appended and evaluated, so a
//! repeated snapshot never re-fires a notification.

use std::sync::Arc;

use carewatch_core::evaluator::{evaluate_heartbeat, evaluate_knock, evaluate_motion};
use carewatch_core::{
    Alert, Anomaly, DeviceSnapshot, HeartbeatSample, HistoryBuffer, KnockSample, MotionSample,
};
use carewatch_events::{Notification, NotificationDispatcher};

use crate::adapter::AdapterUpdate;

/// Dashboard state: latest snapshot, per-sensor histories, alerts, loading
/// and error flags. Fresh samples are evaluated and dispatched on arrival.
pub struct DashboardSession {
    snapshot: Option<Arc<DeviceSnapshot>>,
    heartbeat_history: HistoryBuffer<Arc<HeartbeatSample>>,
    motion_history: HistoryBuffer<Arc<MotionSample>>,
    knock_history: HistoryBuffer<Arc<KnockSample>>,
    alerts: Vec<Alert>,
    loading: bool,
    error: Option<String>,
    dispatcher: NotificationDispatcher,
}

impl DashboardSession {
    /// Fresh session: no snapshot, empty histories, loading.
    pub fn new(dispatcher: NotificationDispatcher) -> Self {
        Self {
            snapshot: None,
            heartbeat_history: HistoryBuffer::new(),
            motion_history: HistoryBuffer::new(),
            knock_history: HistoryBuffer::new(),
            alerts: Vec::new(),
            loading: true,
            error: None,
            dispatcher,
        }
    }

    /// Apply one adapter update, returning any notifications it raised.
    pub fn apply(&mut self, update: AdapterUpdate) -> Vec<Notification> {
        match update {
            AdapterUpdate::Device(snapshot) => self.apply_snapshot(snapshot.map(Arc::new)),
            AdapterUpdate::DeviceError(message) => {
                self.apply_device_error(message);
                Vec::new()
            }
            AdapterUpdate::Alerts(alerts) => {
                self.alerts = alerts;
                Vec::new()
            }
        }
    }

    /// Replace the current snapshot. `None` means the feed holds no data.
    pub fn apply_snapshot(&mut self, snapshot: Option<Arc<DeviceSnapshot>>) -> Vec<Notification> {
        self.loading = false;
        self.snapshot = snapshot;

        let Some(snapshot) = self.snapshot.clone() else {
            return Vec::new();
        };

        let mut anomalies: Vec<Anomaly> = Vec::new();

        if let Some(sample) = &snapshot.heartbeat {
            if observe(&mut self.heartbeat_history, sample) {
                anomalies.extend(evaluate_heartbeat(sample));
            }
        }
        if let Some(sample) = &snapshot.motion {
            if observe(&mut self.motion_history, sample) {
                anomalies.extend(evaluate_motion(sample));
            }
        }
        if let Some(sample) = &snapshot.knock {
            if observe(&mut self.knock_history, sample) {
                anomalies.extend(evaluate_knock(sample));
            }
        }

        anomalies
            .into_iter()
            .filter_map(|anomaly| {
                tracing::debug!(
                    sensor = %anomaly.sensor,
                    severity = ?anomaly.severity,
                    key = %snapshot.key,
                    "Anomaly detected",
                );
                self.dispatcher.dispatch(anomaly)
            })
            .collect()
    }

    /// Record a device feed failure. Previously received data is kept.
    pub fn apply_device_error(&mut self, message: String) {
        self.loading = false;
        self.error = Some(message);
    }

    pub fn snapshot(&self) -> Option<&Arc<DeviceSnapshot>> {
        self.snapshot.as_ref()
    }

    pub fn heartbeat_history(&self) -> &HistoryBuffer<Arc<HeartbeatSample>> {
        &self.heartbeat_history
    }

    pub fn motion_history(&self) -> &HistoryBuffer<Arc<MotionSample>> {
        &self.motion_history
    }

    pub fn knock_history(&self) -> &HistoryBuffer<Arc<KnockSample>> {
        &self.knock_history
    }

    pub fn alerts(&self) -> &[Alert] {
        &self.alerts
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

/// Append `sample` unless it is the reference already at the back.
///
/// Returns `true` when the sample was new.
fn observe<T>(history: &mut HistoryBuffer<Arc<T>>, sample: &Arc<T>) -> bool {
    if history.latest().is_some_and(|last| Arc::ptr_eq(last, sample)) {
        return false;
    }
    history.push(Arc::clone(sample));
    true
}
