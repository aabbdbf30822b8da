//! In-process notification bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`NotificationBus`] fans every published [`Notification`] out to all
//! current subscribers (the console presenter, tests, a future UI bridge).

use tokio::sync::broadcast;

use crate::notification::Notification;

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 256;

/// In-process fan-out bus for notifications.
///
/// # Usage
///
/// ```rust
/// use carewatch_core::{AlertSeverity, Anomaly, SensorKind};
/// use carewatch_events::{Notification, NotificationBus};
///
/// let bus = NotificationBus::default();
/// let mut rx = bus.subscribe();
///
/// bus.publish(Notification::from_anomaly(Anomaly {
///     sensor: SensorKind::Knock,
///     severity: AlertSeverity::Medium,
///     message: "Patient fall detected".into(),
/// }));
/// assert!(rx.try_recv().is_ok());
/// ```
pub struct NotificationBus {
    sender: broadcast::Sender<Notification>,
}

impl NotificationBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full the oldest unread notifications are dropped
    /// and slow receivers observe `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish a notification to all current subscribers.
    ///
    /// Returns the number of subscribers that received it. With no
    /// subscribers the notification is dropped.
    pub fn publish(&self, notification: Notification) -> usize {
        // A SendError only means there are zero receivers.
        self.sender.send(notification).unwrap_or(0)
    }

    /// Create a receiver for notifications published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for NotificationBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
