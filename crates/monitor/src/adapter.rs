//! Live subscription adapter.
//!
//! Bridges the device-history and alerts feeds into typed updates for the
//! session. The device feed yields the latest keyed entry (or "no data");
//! the alerts feed yields the full decoded alert list. A delivery error on
//! the device feed is surfaced to the session, while alerts-feed errors are
//! only logged and the previous list stays in place.
//!
//! Retry is not handled here: transports reconnect on their own.

use std::sync::Arc;

use carewatch_core::decode::{decode_alerts_payload, decode_device_payload};
use carewatch_core::{Alert, DeviceSnapshot};
use carewatch_feed::{FeedError, FeedEvent, FeedTransport, Subscription, SubscriptionRegistry};

/// A typed change produced by one feed emission.
#[derive(Debug, Clone, PartialEq)]
pub enum AdapterUpdate {
    /// Latest device entry; `None` when the collection is empty.
    Device(Option<DeviceSnapshot>),
    /// The device feed reported a delivery failure.
    DeviceError(String),
    /// Full alert list.
    Alerts(Vec<Alert>),
}

#[derive(Debug, Clone, Copy)]
enum Source {
    Device,
    Alerts,
}

/// Owns the device and alerts subscriptions and turns their events into
/// [`AdapterUpdate`]s.
pub struct LiveFeedAdapter {
    registry: SubscriptionRegistry,
    device_path: String,
    alerts_path: String,
    device: Option<Subscription>,
    alerts: Option<Subscription>,
}

impl LiveFeedAdapter {
    pub fn new(
        transport: Arc<dyn FeedTransport>,
        device_path: impl Into<String>,
        alerts_path: impl Into<String>,
    ) -> Self {
        Self {
            registry: SubscriptionRegistry::new(transport),
            device_path: device_path.into(),
            alerts_path: alerts_path.into(),
            device: None,
            alerts: None,
        }
    }

    /// Path of the device history collection.
    pub fn device_path(&self) -> &str {
        &self.device_path
    }

    /// Path of the alerts collection.
    pub fn alerts_path(&self) -> &str {
        &self.alerts_path
    }

    /// Subscribe to both feeds.
    ///
    /// Calling `start` again while running fails with
    /// [`FeedError::AlreadySubscribed`]. If the alerts subscription fails the
    /// device subscription is torn down again.
    pub async fn start(&mut self) -> Result<(), FeedError> {
        let device = self.registry.subscribe(&self.device_path).await?;
        let alerts = match self.registry.subscribe(&self.alerts_path).await {
            Ok(alerts) => alerts,
            Err(e) => {
                self.registry.unsubscribe(&self.device_path);
                return Err(e);
            }
        };

        self.device = Some(device);
        self.alerts = Some(alerts);
        tracing::info!(
            device_path = %self.device_path,
            alerts_path = %self.alerts_path,
            "Live feed adapter started",
        );
        Ok(())
    }

    /// Wait for the next update from either feed.
    ///
    /// Returns `None` once both subscriptions have ended (after
    /// [`shutdown`](Self::shutdown), or when the transport closes them).
    pub async fn next_update(&mut self) -> Option<AdapterUpdate> {
        loop {
            let (source, event) = tokio::select! {
                event = next_event(&mut self.device), if self.device.is_some() => {
                    (Source::Device, event)
                }
                event = next_event(&mut self.alerts), if self.alerts.is_some() => {
                    (Source::Alerts, event)
                }
                else => return None,
            };

            match (source, event) {
                (Source::Device, Some(FeedEvent::Snapshot(payload))) => {
                    return Some(AdapterUpdate::Device(decode_device_payload(
                        payload.as_ref(),
                    )));
                }
                (Source::Device, Some(FeedEvent::Error(message))) => {
                    tracing::error!(path = %self.device_path, error = %message, "Device feed error");
                    return Some(AdapterUpdate::DeviceError(message));
                }
                (Source::Alerts, Some(FeedEvent::Snapshot(payload))) => {
                    return Some(AdapterUpdate::Alerts(decode_alerts_payload(payload.as_ref())));
                }
                (Source::Alerts, Some(FeedEvent::Error(message))) => {
                    tracing::error!(path = %self.alerts_path, error = %message, "Alerts feed error");
                }
                (Source::Device, None) => {
                    tracing::debug!(path = %self.device_path, "Device feed ended");
                    self.device = None;
                }
                (Source::Alerts, None) => {
                    tracing::debug!(path = %self.alerts_path, "Alerts feed ended");
                    self.alerts = None;
                }
            }
        }
    }

    /// Unsubscribe from both feeds. Idempotent.
    pub fn shutdown(&mut self) {
        self.registry.unsubscribe_all();
        self.device = None;
        self.alerts = None;
    }

    /// Whether either feed is still subscribed.
    pub fn is_running(&self) -> bool {
        self.registry.active_count() > 0
    }
}

async fn next_event(subscription: &mut Option<Subscription>) -> Option<FeedEvent> {
    match subscription {
        Some(sub) => sub.next().await,
        None => None,
    }
}
