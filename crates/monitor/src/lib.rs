//! `carewatch-monitor` library crate.
//!
//! Wires the feed transports, the session state and the text views
//! together. The binary entrypoint lives in `main.rs`; the modules are
//! exported for integration testing.

pub mod adapter;
pub mod config;
pub mod session;
pub mod views;

pub use adapter::{AdapterUpdate, LiveFeedAdapter};
pub use config::{ConfigError, LogFormat, MonitorConfig};
pub use session::DashboardSession;
pub use views::DashboardScreen;
