//! Realtime Database streaming transport.
//!
//! Each subscription runs its own task: open the event stream, mirror
//! `put`/`patch` deltas into a full snapshot, push the snapshot after every
//! change, and reconnect with exponential backoff when the stream drops.
//! A snapshot equal to the last one pushed is not pushed again, including
//! the full tree the server re-sends after a reconnect.
//! Every failed connect or dropped stream is also reported to the
//! subscriber as a [`FeedEvent::Error`]. The task exits when the
//! subscription is cancelled or its receiver is gone.

use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::client::RtdbClient;
use crate::messages::{parse_frame, SseDecoder, SseFrame, StreamMessage};
use crate::mirror::DataMirror;
use crate::reconnect::{Backoff, ReconnectConfig};
use crate::transport::{FeedError, FeedEvent, FeedSender, FeedTransport, Subscription};

/// [`FeedTransport`] over the Realtime Database REST event stream.
///
/// Every [`subscribe`](FeedTransport::subscribe) call spawns an independent
/// stream task that lives until the returned [`Subscription`] is cancelled.
pub struct RtdbTransport {
    client: Arc<RtdbClient>,
    reconnect: ReconnectConfig,
}

impl RtdbTransport {
    pub fn new(client: RtdbClient, reconnect: ReconnectConfig) -> Self {
        Self {
            client: Arc::new(client),
            reconnect,
        }
    }
}

#[async_trait]
impl FeedTransport for RtdbTransport {
    async fn subscribe(&self, path: &str) -> Result<Subscription, FeedError> {
        let (subscription, sender) = Subscription::channel(path);

        tokio::spawn(run_stream(
            Arc::clone(&self.client),
            path.to_string(),
            self.reconnect.clone(),
            sender,
            subscription.cancel_token(),
        ));

        Ok(subscription)
    }
}

/// Why a single stream session ended.
#[derive(Debug, PartialEq)]
enum StreamEnd {
    Cancelled,
    ReceiverGone,
    Failed(String),
}

/// Effect of one frame on the mirror.
#[derive(Debug, PartialEq)]
enum FrameOutcome {
    Changed,
    Unchanged,
    Closed(String),
}

/// Last snapshot pushed to the subscriber, kept across reconnects.
#[derive(Debug, Default)]
struct LastEmitted(Option<Option<Value>>);

impl LastEmitted {
    /// Returns `snapshot` when it differs from the last one pushed.
    fn admit(&mut self, snapshot: Option<Value>) -> Option<Option<Value>> {
        if self.0.as_ref() == Some(&snapshot) {
            return None;
        }
        self.0 = Some(snapshot.clone());
        Some(snapshot)
    }
}

/// Connect → process → reconnect loop for one path.
async fn run_stream(
    client: Arc<RtdbClient>,
    path: String,
    config: ReconnectConfig,
    tx: FeedSender,
    cancel: CancellationToken,
) {
    let mut backoff = Backoff::new(config);
    let mut last = LastEmitted::default();
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        tracing::info!(path = %path, attempt, "Opening event stream");

        let opened = tokio::select! {
            _ = cancel.cancelled() => break,
            result = client.open_stream(&path) => result,
        };

        let failure = match opened {
            Ok(response) => {
                tracing::info!(path = %path, attempt, "Event stream connected");
                backoff.reset();
                attempt = 0;

                match process_stream(response, &path, &tx, &cancel, &mut last).await {
                    StreamEnd::Cancelled | StreamEnd::ReceiverGone => break,
                    StreamEnd::Failed(reason) => reason,
                }
            }
            Err(e) => e.to_string(),
        };

        let delay = backoff.next_delay();
        tracing::warn!(
            path = %path,
            error = %failure,
            retry_in_ms = delay.as_millis() as u64,
            "Event stream unavailable",
        );
        if tx.send(FeedEvent::Error(failure)).is_err() {
            break;
        }

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(delay) => {}
        }
    }

    tracing::info!(path = %path, "Event stream task stopped");
}

/// Drive one connected stream until it ends.
async fn process_stream(
    response: reqwest::Response,
    path: &str,
    tx: &FeedSender,
    cancel: &CancellationToken,
    last: &mut LastEmitted,
) -> StreamEnd {
    let mut body = response.bytes_stream();
    let mut decoder = SseDecoder::new();
    let mut mirror = DataMirror::new();

    loop {
        let chunk = tokio::select! {
            biased;
            _ = cancel.cancelled() => return StreamEnd::Cancelled,
            chunk = body.next() => chunk,
        };

        let bytes = match chunk {
            Some(Ok(bytes)) => bytes,
            Some(Err(e)) => return StreamEnd::Failed(format!("Stream read failed: {e}")),
            None => return StreamEnd::Failed("Event stream ended".to_string()),
        };

        for frame in decoder.feed(&bytes) {
            match apply_frame(&frame, &mut mirror, path) {
                FrameOutcome::Changed => {
                    let Some(snapshot) = last.admit(mirror.snapshot()) else {
                        tracing::debug!(path = %path, "Snapshot unchanged, not pushed");
                        continue;
                    };
                    if tx.send(FeedEvent::Snapshot(snapshot)).is_err() {
                        return StreamEnd::ReceiverGone;
                    }
                }
                FrameOutcome::Unchanged => {}
                FrameOutcome::Closed(reason) => return StreamEnd::Failed(reason),
            }
        }
    }
}

/// Apply a single frame to the mirror.
fn apply_frame(frame: &SseFrame, mirror: &mut DataMirror, path: &str) -> FrameOutcome {
    match parse_frame(frame) {
        Ok(StreamMessage::Put(update)) => {
            tracing::trace!(path = %path, at = %update.path, "put");
            mirror.put(&update.path, update.data);
            FrameOutcome::Changed
        }
        Ok(StreamMessage::Patch(update)) => {
            tracing::trace!(path = %path, at = %update.path, "patch");
            match mirror.patch(&update.path, update.data) {
                Ok(()) => FrameOutcome::Changed,
                Err(e) => {
                    tracing::warn!(path = %path, error = %e, "Ignoring malformed patch");
                    FrameOutcome::Unchanged
                }
            }
        }
        Ok(StreamMessage::KeepAlive) => FrameOutcome::Unchanged,
        Ok(StreamMessage::Cancel(reason)) => {
            FrameOutcome::Closed(format!("Stream cancelled by server: {reason}"))
        }
        Ok(StreamMessage::AuthRevoked) => {
            FrameOutcome::Closed("Stream auth revoked".to_string())
        }
        Err(e) => {
            tracing::warn!(path = %path, error = %e, event = %frame.event, "Ignoring unparseable frame");
            FrameOutcome::Unchanged
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    use super::*;

    fn frame(event: &str, data: &str) -> SseFrame {
        SseFrame {
            event: event.into(),
            data: data.into(),
        }
    }

    #[test]
    fn put_and_patch_change_the_mirror() {
        let mut mirror = DataMirror::new();

        let outcome = apply_frame(
            &frame("put", r#"{"path":"/","data":{"k1":{"lastUpdated":1}}}"#),
            &mut mirror,
            "p",
        );
        assert_eq!(outcome, FrameOutcome::Changed);

        let outcome = apply_frame(
            &frame("patch", r#"{"path":"/k1","data":{"lastUpdated":2}}"#),
            &mut mirror,
            "p",
        );
        assert_eq!(outcome, FrameOutcome::Changed);
        assert_eq!(mirror.snapshot(), Some(json!({"k1": {"lastUpdated": 2}})));
    }

    #[test]
    fn keep_alive_and_garbage_leave_mirror_alone() {
        let mut mirror = DataMirror::new();
        assert_eq!(
            apply_frame(&frame("keep-alive", "null"), &mut mirror, "p"),
            FrameOutcome::Unchanged
        );
        assert_eq!(
            apply_frame(&frame("put", "{oops"), &mut mirror, "p"),
            FrameOutcome::Unchanged
        );
        assert_eq!(
            apply_frame(&frame("patch", r#"{"path":"/","data":3}"#), &mut mirror, "p"),
            FrameOutcome::Unchanged
        );
        assert_eq!(mirror.snapshot(), None);
    }

    #[test]
    fn cancel_and_auth_revoked_close_the_stream() {
        let mut mirror = DataMirror::new();
        assert_eq!(
            apply_frame(&frame("cancel", "\"Permission denied\""), &mut mirror, "p"),
            FrameOutcome::Closed("Stream cancelled by server: Permission denied".into())
        );
        assert!(matches!(
            apply_frame(&frame("auth_revoked", ""), &mut mirror, "p"),
            FrameOutcome::Closed(_)
        ));
    }

    #[test]
    fn identical_snapshot_is_admitted_once() {
        let mut last = LastEmitted::default();
        let tree = Some(json!({"k1": {"knock": {"detected": true, "timestamp": 5}}}));

        assert_eq!(last.admit(tree.clone()), Some(tree.clone()));
        assert_eq!(last.admit(tree.clone()), None);

        // A fresh mirror after a reconnect rebuilds the same tree.
        let mut mirror = DataMirror::new();
        let outcome = apply_frame(
            &frame("put", r#"{"path":"/","data":{"k1":{"knock":{"detected":true,"timestamp":5}}}}"#),
            &mut mirror,
            "p",
        );
        assert_eq!(outcome, FrameOutcome::Changed);
        assert_eq!(last.admit(mirror.snapshot()), None);

        assert_eq!(last.admit(None), Some(None));
        assert_eq!(last.admit(tree.clone()), Some(tree));
    }

    #[test]
    fn empty_tree_is_pushed_first_time() {
        let mut last = LastEmitted::default();
        assert_eq!(last.admit(None), Some(None));
        assert_eq!(last.admit(None), None);
    }

    /// Serve one event-stream response per accepted connection, then close it.
    async fn serve_sessions(listener: TcpListener, sessions: Vec<String>) {
        for body in sessions {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };
            read_request_head(&mut socket).await;
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: text/event-stream\r\nConnection: close\r\n\r\n{body}"
            );
            socket.write_all(response.as_bytes()).await.expect("write response");
            socket.shutdown().await.ok();
        }
    }

    async fn read_request_head(socket: &mut TcpStream) {
        let mut head = Vec::new();
        let mut buf = [0u8; 1024];
        while !head.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = socket.read(&mut buf).await.expect("read request");
            if n == 0 {
                return;
            }
            head.extend_from_slice(&buf[..n]);
        }
    }

    fn sse(event: &str, data: &str) -> String {
        format!("event: {event}\ndata: {data}\n\n")
    }

    async fn next_event(sub: &mut Subscription) -> FeedEvent {
        tokio::time::timeout(Duration::from_secs(10), sub.next())
            .await
            .expect("event before timeout")
            .expect("subscription open")
    }

    #[tokio::test]
    async fn stream_pushes_changes_and_skips_resent_tree_after_reconnect() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");

        let first = [
            sse("put", r#"{"path":"/","data":{"k1":{"lastUpdated":1}}}"#),
            sse("keep-alive", "null"),
            sse("patch", r#"{"path":"/","data":{"k2":{"lastUpdated":2}}}"#),
        ]
        .concat();
        let second = [
            sse("put", r#"{"path":"/","data":{"k1":{"lastUpdated":1},"k2":{"lastUpdated":2}}}"#),
            sse("put", r#"{"path":"/k3","data":{"lastUpdated":3}}"#),
        ]
        .concat();
        let server = tokio::spawn(serve_sessions(listener, vec![first, second]));

        let transport = RtdbTransport::new(
            RtdbClient::new(format!("http://{addr}"), None),
            ReconnectConfig::with_max_delay(Duration::from_millis(50)),
        );
        let mut sub = transport.subscribe("history").await.expect("subscribe");

        assert_eq!(
            next_event(&mut sub).await,
            FeedEvent::Snapshot(Some(json!({"k1": {"lastUpdated": 1}})))
        );
        assert_eq!(
            next_event(&mut sub).await,
            FeedEvent::Snapshot(Some(json!({"k1": {"lastUpdated": 1}, "k2": {"lastUpdated": 2}})))
        );
        assert!(matches!(next_event(&mut sub).await, FeedEvent::Error(_)));

        // The re-sent tree is skipped; the next event is the real change.
        assert_eq!(
            next_event(&mut sub).await,
            FeedEvent::Snapshot(Some(json!({
                "k1": {"lastUpdated": 1},
                "k2": {"lastUpdated": 2},
                "k3": {"lastUpdated": 3},
            })))
        );
        assert!(matches!(next_event(&mut sub).await, FeedEvent::Error(_)));

        sub.unsubscribe();
        assert_eq!(sub.next().await, None);
        server.abort();
    }

    #[tokio::test]
    async fn unreachable_database_reports_error_and_stops_on_unsubscribe() {
        let transport = RtdbTransport::new(
            RtdbClient::new("http://127.0.0.1:1", None),
            ReconnectConfig::with_max_delay(Duration::from_millis(50)),
        );

        let mut sub = transport.subscribe("alerts").await.expect("subscribe");
        let event = tokio::time::timeout(Duration::from_secs(10), sub.next())
            .await
            .expect("error reported before timeout");
        assert!(matches!(event, Some(FeedEvent::Error(_))));

        sub.unsubscribe();
        assert_eq!(sub.next().await, None);
    }
}
