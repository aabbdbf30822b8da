//! Realtime Database event-stream framing and message types.
//!
//! The REST streaming endpoint speaks Server-Sent Events. Each event has an
//! `event:` name and a JSON `data:` line:
//!
//! ```text
//! event: put
//! data: {"path": "/", "data": {"-Nabc": {...}}}
//! ```
//!
//! [`SseDecoder`] reassembles frames from arbitrary byte chunks and
//! [`parse_frame`] turns a frame into a typed [`StreamMessage`].

use serde::Deserialize;
use serde_json::Value;

use crate::transport::FeedError;

/// One raw SSE event.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SseFrame {
    pub event: String,
    pub data: String,
}

/// Incremental SSE decoder.
///
/// Bytes are buffered until a full line is available, so frames split across
/// network chunks (even mid UTF-8 sequence) decode correctly.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    event: Option<String>,
    data: Vec<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume a chunk and return every frame it completed.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        self.buffer.extend_from_slice(chunk);

        let mut frames = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let mut line: Vec<u8> = self.buffer.drain(..=pos).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            let line = String::from_utf8_lossy(&line);
            if let Some(frame) = self.process_line(&line) {
                frames.push(frame);
            }
        }
        frames
    }

    fn process_line(&mut self, line: &str) -> Option<SseFrame> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        match field {
            "event" => self.event = Some(value.to_string()),
            "data" => self.data.push(value.to_string()),
            // `id` and `retry` are not used by the Realtime Database.
            _ => {}
        }
        None
    }

    fn dispatch(&mut self) -> Option<SseFrame> {
        if self.event.is_none() && self.data.is_empty() {
            return None;
        }
        let frame = SseFrame {
            event: self.event.take().unwrap_or_else(|| "message".to_string()),
            data: self.data.join("\n"),
        };
        self.data.clear();
        Some(frame)
    }
}

/// Payload of `put` and `patch` events.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PathData {
    /// Location relative to the subscribed path; `/` is the path itself.
    pub path: String,
    pub data: Value,
}

/// All event-stream messages the Realtime Database sends.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamMessage {
    /// Replace the value at `path`.
    Put(PathData),
    /// Merge each child of `data` into the value at `path`.
    Patch(PathData),
    KeepAlive,
    /// The server stopped the stream, usually because security rules no
    /// longer allow the read.
    Cancel(String),
    /// The auth credential expired or was revoked.
    AuthRevoked,
}

/// Parse a raw frame into a [`StreamMessage`].
///
/// Returns [`FeedError::Protocol`] for unknown events and malformed data.
pub fn parse_frame(frame: &SseFrame) -> Result<StreamMessage, FeedError> {
    match frame.event.as_str() {
        "put" => parse_path_data(&frame.data).map(StreamMessage::Put),
        "patch" => parse_path_data(&frame.data).map(StreamMessage::Patch),
        "keep-alive" => Ok(StreamMessage::KeepAlive),
        "cancel" => Ok(StreamMessage::Cancel(reason_text(&frame.data))),
        "auth_revoked" => Ok(StreamMessage::AuthRevoked),
        other => Err(FeedError::Protocol(format!("unknown event type: {other}"))),
    }
}

fn parse_path_data(data: &str) -> Result<PathData, FeedError> {
    serde_json::from_str(data)
        .map_err(|e| FeedError::Protocol(format!("malformed event data: {e}")))
}

/// `cancel` data is usually a JSON string, sometimes `null`.
fn reason_text(data: &str) -> String {
    match serde_json::from_str::<Value>(data) {
        Ok(Value::String(reason)) => reason,
        Ok(Value::Null) => "no reason given".to_string(),
        _ if data.trim().is_empty() => "no reason given".to_string(),
        _ => data.to_string(),
    }
}
