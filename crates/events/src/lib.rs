//! CareWatch notification infrastructure.
//!
//! - [`NotificationBus`]: in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`Notification`]: a transient, 5-second user-facing notification.
//! - [`NotificationDispatcher`]: turns evaluator anomalies into published
//!   notifications, applying the configured [`NotificationPolicy`].

pub mod bus;
pub mod dispatch;
pub mod notification;

pub use bus::NotificationBus;
pub use dispatch::{NotificationDispatcher, NotificationPolicy};
pub use notification::{Notification, NOTIFICATION_DURATION};
