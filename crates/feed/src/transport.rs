//! The feed capability interface.
//!
//! A [`FeedTransport`] turns a logical store path into a [`Subscription`]:
//! a stream of full-path snapshots plus delivery errors. Transports own
//! their I/O (and any reconnection); consumers only ever see
//! [`FeedEvent`]s and decide what they mean.

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// One delivery from a feed subscription.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    /// The full current value at the subscribed path. `None` when the path
    /// holds no data.
    Snapshot(Option<Value>),
    /// The transport failed to deliver. Previously delivered data is still
    /// valid; the transport may recover on its own.
    Error(String),
}

/// Sending half handed to transport tasks.
pub type FeedSender = mpsc::UnboundedSender<FeedEvent>;

/// Errors raised while establishing or managing subscriptions.
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("Path already has an active subscription: {0}")]
    AlreadySubscribed(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Transport closed")]
    Closed,
}

/// A realtime store that can stream snapshots of a path.
#[async_trait]
pub trait FeedTransport: Send + Sync {
    /// Start streaming `path`. The first event is normally the path's
    /// current value.
    async fn subscribe(&self, path: &str) -> Result<Subscription, FeedError>;
}

/// An active subscription to one path.
///
/// Cancelling (via [`unsubscribe`](Self::unsubscribe) or by dropping the
/// subscription) stops the transport task; [`next`](Self::next) then
/// returns `None`.
#[derive(Debug)]
pub struct Subscription {
    path: String,
    receiver: mpsc::UnboundedReceiver<FeedEvent>,
    cancel: CancellationToken,
}

impl Subscription {
    /// Create a subscription and the sender its transport task feeds.
    pub fn channel(path: impl Into<String>) -> (Self, FeedSender) {
        let (tx, rx) = mpsc::unbounded_channel();
        let subscription = Self {
            path: path.into(),
            receiver: rx,
            cancel: CancellationToken::new(),
        };
        (subscription, tx)
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Token observed by the transport task; cancelled on unsubscribe.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Wait for the next event. `None` once unsubscribed or when the
    /// transport has shut down.
    pub async fn next(&mut self) -> Option<FeedEvent> {
        if self.cancel.is_cancelled() {
            return None;
        }
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            event = self.receiver.recv() => event,
        }
    }

    /// Stop the subscription. Calling this more than once is a no-op.
    pub fn unsubscribe(&self) {
        if !self.cancel.is_cancelled() {
            tracing::debug!(path = %self.path, "Unsubscribing feed");
            self.cancel.cancel();
        }
    }

    pub fn is_active(&self) -> bool {
        !self.cancel.is_cancelled()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
