//! Server-Sent Events client for the chat stream.
//!
//! Streams are long-lived, so this client carries no request timeout; every
//! other bound is hard. Lines are capped at 64 KiB (overflow terminates the
//! stream), a single event's accumulated data at 1 MiB. An oversized event
//! is swallowed without killing the stream: its buffered data is discarded,
//! parsing continues, and the next event is delivered normally.

use bytes::Bytes;
use futures::StreamExt;
use reqwest::Client;
use reqwest::header::{ACCEPT, AUTHORIZATION, CACHE_CONTROL};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::http::{collect_truncated, status_error};
use crate::ApiError;

/// Per-line buffer bound. A server that never sends a newline is cut off
/// here rather than growing the buffer without limit.
pub const MAX_LINE_BYTES: usize = 64 * 1024;

/// Bound on one event's accumulated `data`, including the `\n` joins.
pub const MAX_EVENT_BYTES: usize = 1024 * 1024;

/// Emit channel depth: absorbs bursts without blocking the reader.
pub const CHANNEL_CAPACITY: usize = 100;

/// Error bodies on a failed connect are truncated to this size.
const ERROR_BODY_CAP: usize = 1024;

/// One parsed event. `event_type` defaults to `"message"` when the server
/// sent no `event` field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    pub event_type: String,
    pub data: String,
    pub id: Option<String>,
}

/// Stream protocol violations that terminate parsing.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SseParseError {
    #[error("SSE line exceeded {MAX_LINE_BYTES} bytes")]
    LineTooLong,
}

/// Client for `text/event-stream` endpoints.
#[derive(Clone)]
pub struct SseClient {
    http: Client,
    api_key: Option<String>,
}

impl SseClient {
    /// Build a streaming client. No request timeout: the stream is expected
    /// to stay open until cancelled.
    pub fn new(api_key: Option<String>) -> Result<Self, ApiError> {
        let http = Client::builder()
            .use_rustls_tls()
            .build()
            .map_err(|e| ApiError::Url(format!("failed to build SSE client: {e}")))?;
        Ok(Self { http, api_key })
    }

    /// Open `url` and return the lazily-consumed event sequence.
    ///
    /// The channel closes on EOF, on a transport or protocol error, and when
    /// `cancel` fires; the consumer observes all three as end-of-stream.
    pub async fn connect(
        &self,
        url: &str,
        cancel: CancellationToken,
    ) -> Result<mpsc::Receiver<SseEvent>, ApiError> {
        let mut builder = self
            .http
            .get(url)
            .header(ACCEPT, "text/event-stream")
            .header(CACHE_CONTROL, "no-cache");
        if let Some(key) = &self.api_key {
            builder = builder.header(AUTHORIZATION, format!("Bearer {key}"));
        }

        let response = builder.send().await.map_err(ApiError::from_reqwest)?;
        let status = response.status();
        if !status.is_success() {
            let body = collect_truncated(response.bytes_stream(), ERROR_BODY_CAP).await;
            return Err(status_error(status, &body));
        }

        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        tokio::spawn(read_stream(response, tx, cancel));
        Ok(rx)
    }
}

async fn read_stream(
    response: reqwest::Response,
    tx: mpsc::Sender<SseEvent>,
    cancel: CancellationToken,
) {
    let mut stream = response.bytes_stream();
    let mut parser = SseParser::new();

    loop {
        let chunk: Option<Result<Bytes, reqwest::Error>> = tokio::select! {
            () = cancel.cancelled() => {
                debug!("SSE stream cancelled");
                return;
            }
            chunk = stream.next() => chunk,
        };

        match chunk {
            Some(Ok(bytes)) => match parser.push(&bytes) {
                Ok(events) => {
                    for event in events {
                        if tx.send(event).await.is_err() {
                            return;
                        }
                    }
                }
                Err(err) => {
                    debug!(error = %err, "SSE stream terminated by parse error");
                    return;
                }
            },
            Some(Err(err)) => {
                debug!(error = %err, "SSE stream transport error");
                return;
            }
            // EOF. The event-stream format discards an incomplete event.
            None => return,
        }
    }
}

/// Incremental `text/event-stream` parser, fed raw chunks.
#[derive(Debug, Default)]
pub struct SseParser {
    line_buf: Vec<u8>,
    event_type: String,
    data: String,
    data_len: usize,
    has_data: bool,
    id: Option<String>,
    oversized: bool,
}

impl SseParser {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume a chunk, returning every event completed within it.
    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<SseEvent>, SseParseError> {
        let mut events = Vec::new();
        for &byte in chunk {
            if byte == b'\n' {
                let line = std::mem::take(&mut self.line_buf);
                let line = line.strip_suffix(b"\r").unwrap_or(&line);
                if let Some(event) = self.process_line(line) {
                    events.push(event);
                }
            } else {
                if self.line_buf.len() >= MAX_LINE_BYTES {
                    return Err(SseParseError::LineTooLong);
                }
                self.line_buf.push(byte);
            }
        }
        Ok(events)
    }

    fn process_line(&mut self, line: &[u8]) -> Option<SseEvent> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line[0] == b':' {
            // Comment / keepalive.
            return None;
        }

        let (field, value) = match line.iter().position(|&b| b == b':') {
            Some(idx) => {
                let value = &line[idx + 1..];
                // One leading space after the colon is part of the syntax.
                let value = value.strip_prefix(b" ").unwrap_or(value);
                (&line[..idx], value)
            }
            None => (line, &[][..]),
        };

        match field {
            b"event" => self.event_type = String::from_utf8_lossy(value).into_owned(),
            b"data" => self.append_data(value),
            b"id" => self.id = Some(String::from_utf8_lossy(value).into_owned()),
            // `retry` and unknown fields are ignored.
            _ => {}
        }
        None
    }

    fn append_data(&mut self, value: &[u8]) {
        let join = self.has_data;
        let joined_len = value.len() + usize::from(join);
        self.has_data = true;
        if self.oversized {
            return;
        }
        if self.data_len + joined_len > MAX_EVENT_BYTES {
            self.oversized = true;
            self.data.clear();
            self.data_len = 0;
            return;
        }
        self.data_len += joined_len;
        if join {
            self.data.push('\n');
        }
        self.data.push_str(&String::from_utf8_lossy(value));
    }

    fn dispatch(&mut self) -> Option<SseEvent> {
        let oversized = std::mem::take(&mut self.oversized);
        let has_data = std::mem::take(&mut self.has_data);
        let data = std::mem::take(&mut self.data);
        self.data_len = 0;
        let event_type = std::mem::take(&mut self.event_type);
        let id = std::mem::take(&mut self.id);

        if oversized || !has_data {
            return None;
        }

        Some(SseEvent {
            event_type: if event_type.is_empty() {
                "message".to_string()
            } else {
                event_type
            },
            data,
            id,
        })
    }
}
