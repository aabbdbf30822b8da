//! In-memory feed transport.
//!
//! [`MemoryFeed`] holds one JSON value per path and pushes the full value to
//! every subscriber of that path whenever it is replaced, mirroring the
//! snapshot-on-change behaviour of the hosted store. It backs the test
//! suites and local replays.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::transport::{FeedError, FeedEvent, FeedSender, FeedTransport, Subscription};

struct Subscriber {
    sender: FeedSender,
    cancel: CancellationToken,
}

impl Subscriber {
    fn is_live(&self) -> bool {
        !self.cancel.is_cancelled() && !self.sender.is_closed()
    }
}

#[derive(Default)]
struct PathState {
    value: Option<Value>,
    subscribers: Vec<Subscriber>,
}

/// A process-local realtime store.
#[derive(Default)]
pub struct MemoryFeed {
    paths: Mutex<HashMap<String, PathState>>,
}

impl MemoryFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the value at `path` and push it to live subscribers.
    ///
    /// `None`, `null` and `{}` all mean "no data".
    pub async fn set(&self, path: &str, value: Option<Value>) {
        let value = value.filter(|v| !is_empty(v));
        let mut paths = self.paths.lock().await;
        let state = paths.entry(path.to_string()).or_default();
        state.value = value;
        let event = FeedEvent::Snapshot(state.value.clone());
        Self::broadcast(state, event);
    }

    /// Append `entry` under `key` in the keyed collection at `path`.
    pub async fn push_entry(&self, path: &str, key: &str, entry: Value) {
        let mut paths = self.paths.lock().await;
        let state = paths.entry(path.to_string()).or_default();

        let mut map = match state.value.take() {
            Some(Value::Object(map)) => map,
            _ => serde_json::Map::new(),
        };
        map.insert(key.to_string(), entry);
        state.value = Some(Value::Object(map));

        let event = FeedEvent::Snapshot(state.value.clone());
        Self::broadcast(state, event);
    }

    /// Report a delivery error to every subscriber of `path`.
    pub async fn fail(&self, path: &str, message: impl Into<String>) {
        let mut paths = self.paths.lock().await;
        let state = paths.entry(path.to_string()).or_default();
        Self::broadcast(state, FeedEvent::Error(message.into()));
    }

    /// Number of live subscriptions on `path`.
    pub async fn subscriber_count(&self, path: &str) -> usize {
        let mut paths = self.paths.lock().await;
        match paths.get_mut(path) {
            Some(state) => {
                state.subscribers.retain(Subscriber::is_live);
                state.subscribers.len()
            }
            None => 0,
        }
    }

    fn broadcast(state: &mut PathState, event: FeedEvent) {
        state.subscribers.retain(Subscriber::is_live);
        for subscriber in &state.subscribers {
            let _ = subscriber.sender.send(event.clone());
        }
    }
}

#[async_trait]
impl FeedTransport for MemoryFeed {
    async fn subscribe(&self, path: &str) -> Result<Subscription, FeedError> {
        let (subscription, sender) = Subscription::channel(path);

        let mut paths = self.paths.lock().await;
        let state = paths.entry(path.to_string()).or_default();

        // Deliver the current value first, as the hosted store does.
        sender
            .send(FeedEvent::Snapshot(state.value.clone()))
            .map_err(|_| FeedError::Closed)?;

        state.subscribers.push(Subscriber {
            sender,
            cancel: subscription.cancel_token(),
        });

        Ok(subscription)
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}
