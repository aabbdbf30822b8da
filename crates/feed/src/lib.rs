//! Realtime feed transports for the CareWatch monitor.
//!
//! - [`FeedTransport`]: subscribe to a path and
//!   receive full snapshots and delivery errors.
//! - [`SubscriptionRegistry`]: one active subscription per path, with
//!   idempotent teardown.
//! - [`MemoryFeed`]: in-process store for tests and replays.
//! - [`RtdbTransport`]: Firebase Realtime Database REST event stream with
//!   reconnection.

pub mod client;
pub mod memory;
pub mod messages;
pub mod mirror;
pub mod reconnect;
pub mod registry;
pub mod rtdb;
pub mod transport;

pub use client::RtdbClient;
pub use memory::MemoryFeed;
pub use reconnect::{Backoff, ReconnectConfig};
pub use registry::SubscriptionRegistry;
pub use rtdb::RtdbTransport;
pub use transport::{FeedError, FeedEvent, FeedTransport, Subscription};
