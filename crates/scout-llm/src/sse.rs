//! Server-sent events decoding shared by the streaming backends
//!
//! Bytes arrive from the network in arbitrary pieces; [`SseDecoder`] buffers
//! them and yields complete events. [`forward_sse`] drives a response body
//! through the decoder and pushes text chunks into a [`ChunkReceiver`].

use futures::StreamExt;
use scout_core::Error;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::provider::{ChunkReceiver, STREAM_CHANNEL_CAPACITY};

/// One dispatched event
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SseEvent {
    /// Value of the `event:` field, if any
    pub event: Option<String>,
    /// `data:` lines joined by `\n`
    pub data: String,
}

/// Incremental SSE parser
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

    /// Feed raw bytes; returns every event completed by them
    pub fn push(&mut self, bytes: &[u8]) -> Vec<SseEvent> {
        self.buffer.extend_from_slice(bytes);
        let mut events = Vec::new();

        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let mut line: Vec<u8> = self.buffer.drain(..=pos).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            let line = String::from_utf8_lossy(&line);
            if let Some(event) = self.process_line(&line) {
                events.push(event);
            }
        }

        events
    }

    /// Flush a trailing event not terminated by a blank line
    pub fn finish(&mut self) -> Option<SseEvent> {
        if !self.buffer.is_empty() {
            let rest = std::mem::take(&mut self.buffer);
            let line = String::from_utf8_lossy(&rest).trim_end_matches('\r').to_string();
            self.process_line(&line);
        }
        self.dispatch()
    }

    fn process_line(&mut self, line: &str) -> Option<SseEvent> {
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
            _ => {}
        }
        None
    }

    fn dispatch(&mut self) -> Option<SseEvent> {
        if self.data.is_empty() && self.event.is_none() {
            return None;
        }
        let event = SseEvent {
            event: self.event.take(),
            data: std::mem::take(&mut self.data).join("\n"),
        };
        Some(event)
    }
}

/// What a backend wants done with one decoded event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseAction {
    /// Forward this text to the consumer
    Chunk(String),
    /// Nothing to forward
    Skip,
    /// The stream finished normally
    Done,
    /// The provider reported an error mid-stream
    Fail(String),
}

/// Spawn a task that decodes `response` as SSE and forwards text chunks.
///
/// The task stops when the body ends, when `handle` returns `Done` or
/// `Fail`, or when the receiver is dropped.
pub fn forward_sse<F>(response: reqwest::Response, mut handle: F) -> ChunkReceiver
where
    F: FnMut(&SseEvent) -> SseAction + Send + 'static,
{
    let (tx, rx) = mpsc::channel(STREAM_CHANNEL_CAPACITY);

    tokio::spawn(async move {
        let mut body = response.bytes_stream();
        let mut decoder = SseDecoder::new();

        while let Some(piece) = body.next().await {
            let bytes = match piece {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!("Stream interrupted: {}", e);
                    let _ = tx
                        .send(Err(Error::generation_failed(format!("stream interrupted: {}", e))))
                        .await;
                    return;
                }
            };

            for event in decoder.push(&bytes) {
                if !deliver(&tx, handle(&event)).await {
                    return;
                }
            }
        }

        if let Some(event) = decoder.finish() {
            deliver(&tx, handle(&event)).await;
        }
        debug!("Stream body finished");
    });

    rx
}

/// Returns false once the stream should stop
async fn deliver(tx: &mpsc::Sender<scout_core::Result<String>>, action: SseAction) -> bool {
    match action {
        SseAction::Chunk(text) => {
            if text.is_empty() {
                return true;
            }
            if tx.send(Ok(text)).await.is_err() {
                debug!("Receiver dropped, cancelling stream");
                return false;
            }
            true
        }
        SseAction::Skip => true,
        SseAction::Done => false,
        SseAction::Fail(message) => {
            let _ = tx.send(Err(Error::generation_failed(message))).await;
            false
        }
    }
}
