//! `carewatch-monitor` -- realtime elderly-care dashboard.
//!
//! Streams the device history and alerts collections from a Firebase
//! Realtime Database, keeps per-sensor histories, raises notifications when
//! a fresh sample crosses a clinical threshold, and logs the rendered
//! dashboard on every change.
//!
//! # Environment variables
//!
//! | Variable                   | Required | Default                  | Description                         |
//! |----------------------------|----------|--------------------------|-------------------------------------|
//! | `RTDB_URL`                 | yes      | --                       | Database URL                        |
//! | `RTDB_AUTH`                | no       | --                       | Database secret or ID token         |
//! | `DEVICE_PATH`              | no       | `elderlyDevice1/history` | Device history collection           |
//! | `ALERTS_PATH`              | no       | `alerts`                 | Alerts collection                   |
//! | `NOTIFY_DEBOUNCE_SECS`     | no       | `0`                      | Per-sensor debounce, `0` = off      |
//! | `RECONNECT_MAX_DELAY_SECS` | no       | `30`                     | Reconnect backoff ceiling           |
//! | `LOG_FORMAT`               | no       | `text`                   | `text` or `json`                    |

use std::sync::Arc;

use carewatch_events::{Notification, NotificationBus, NotificationDispatcher};
use carewatch_feed::{FeedTransport, RtdbClient, RtdbTransport};
use carewatch_monitor::{DashboardScreen, DashboardSession, LiveFeedAdapter, LogFormat, MonitorConfig};
use tokio::sync::broadcast;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let log_format: LogFormat = std::env::var("LOG_FORMAT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or_default();
    init_tracing(log_format);

    let config = MonitorConfig::from_env().unwrap_or_else(|e| {
        tracing::error!(error = %e, "Invalid configuration");
        std::process::exit(1);
    });

    tracing::info!(
        rtdb_url = %config.rtdb_url,
        device_path = %config.device_path,
        alerts_path = %config.alerts_path,
        debounce_secs = config.notify_debounce_secs,
        "Starting carewatch-monitor",
    );

    let bus = Arc::new(NotificationBus::default());
    let presenter = tokio::spawn(present_notifications(bus.subscribe()));

    let dispatcher = NotificationDispatcher::new(Arc::clone(&bus), config.notification_policy());
    let mut session = DashboardSession::new(dispatcher);

    let client = RtdbClient::new(config.rtdb_url.clone(), config.rtdb_auth.clone());
    let transport: Arc<dyn FeedTransport> =
        Arc::new(RtdbTransport::new(client, config.reconnect_config()));
    let mut adapter = LiveFeedAdapter::new(transport, &config.device_path, &config.alerts_path);

    if let Err(e) = adapter.start().await {
        tracing::error!(error = %e, "Failed to subscribe to feeds");
        std::process::exit(1);
    }

    tracing::info!(
        device_path = %adapter.device_path(),
        alerts_path = %adapter.alerts_path(),
        "Subscribed to feeds",
    );
    tracing::info!("\n{}", DashboardScreen::build(&session, adapter.device_path()));

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            biased;
            _ = &mut shutdown => {
                tracing::info!("Shutdown requested");
                break;
            }
            update = adapter.next_update() => {
                let Some(update) = update else {
                    tracing::warn!("Feeds closed");
                    break;
                };
                session.apply(update);
                tracing::info!("\n{}", DashboardScreen::build(&session, adapter.device_path()));
            }
        }
    }

    adapter.shutdown();

    // Dropping the last bus handle closes the presenter's receiver.
    drop(session);
    drop(bus);
    let _ = presenter.await;

    tracing::info!("carewatch-monitor stopped");
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "carewatch_monitor=info,carewatch_feed=info".into());

    let json = (format == LogFormat::Json).then(|| tracing_subscriber::fmt::layer().json());
    let text = (format == LogFormat::Text).then(tracing_subscriber::fmt::layer);

    tracing_subscriber::registry()
        .with(filter)
        .with(json)
        .with(text)
        .init();
}

/// Log each notification for its display lifetime.
async fn present_notifications(mut rx: broadcast::Receiver<Notification>) {
    loop {
        match rx.recv().await {
            Ok(notification) => {
                tracing::warn!(
                    id = %notification.id,
                    sensor = %notification.sensor,
                    severity = ?notification.severity,
                    expires_at = %notification.expires_at(),
                    "{}",
                    notification.message,
                );
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Notification presenter lagged");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
