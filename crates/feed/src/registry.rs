//! Session-scoped subscription registry.
//!
//! [`SubscriptionRegistry`] guarantees at most one active subscription per
//! path and gives teardown a single place to cancel everything. It keeps a
//! clone of each subscription's cancellation token; the [`Subscription`]
//! itself is handed to the caller to drain.

use std::collections::HashMap;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::transport::{FeedError, FeedTransport, Subscription};

/// Tracks at most one live [`Subscription`] per path on a transport.
///
/// Subscribing to a path that is already active fails with
/// [`FeedError::AlreadySubscribed`]; an ended or dropped subscription frees
/// its path again.
pub struct SubscriptionRegistry {
    transport: Arc<dyn FeedTransport>,
    active: HashMap<String, CancellationToken>,
}

impl SubscriptionRegistry {
    pub fn new(transport: Arc<dyn FeedTransport>) -> Self {
        Self {
            transport,
            active: HashMap::new(),
        }
    }

    /// Subscribe to `path`.
    ///
    /// Fails with [`FeedError::AlreadySubscribed`] while a previous
    /// subscription to the same path is still active.
    pub async fn subscribe(&mut self, path: &str) -> Result<Subscription, FeedError> {
        if self.is_active(path) {
            return Err(FeedError::AlreadySubscribed(path.to_string()));
        }

        let subscription = self.transport.subscribe(path).await?;
        self.active
            .insert(path.to_string(), subscription.cancel_token());
        tracing::info!(path = %path, "Feed subscribed");
        Ok(subscription)
    }

    /// Cancel the subscription to `path`, if any. Idempotent.
    pub fn unsubscribe(&mut self, path: &str) {
        if let Some(token) = self.active.remove(path) {
            if !token.is_cancelled() {
                token.cancel();
                tracing::info!(path = %path, "Feed unsubscribed");
            }
        }
    }

    /// Cancel every subscription. Idempotent.
    pub fn unsubscribe_all(&mut self) {
        let paths: Vec<String> = self.active.keys().cloned().collect();
        for path in paths {
            self.unsubscribe(&path);
        }
    }

    pub fn is_active(&self, path: &str) -> bool {
        self.active
            .get(path)
            .is_some_and(|token| !token.is_cancelled())
    }

    pub fn active_count(&self) -> usize {
        self.active
            .values()
            .filter(|token| !token.is_cancelled())
            .count()
    }
}

impl Drop for SubscriptionRegistry {
    fn drop(&mut self) {
        self.unsubscribe_all();
    }
}
