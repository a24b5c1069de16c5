//! Incremental decoder for the framed event stream
//!
//! The service writes events as blocks separated by a blank line:
//!
//! ```text
//! event: delta
//! data: {"delta":"Hi"}
//!
//! ```
//!
//! Bytes are buffered as bytes and only complete blocks are turned into text,
//! so a multi-byte character split across two chunks decodes correctly.

use std::pin::Pin;

use async_stream::stream;
use futures::StreamExt;
use serde_json::Value;
use tokio_stream::Stream;

use crate::error::{Error, Result};

const SEPARATOR: &[u8] = b"\n\n";
const DEFAULT_EVENT: &str = "message";

/// One decoded event: its name and JSON payload
#[derive(Debug, Clone, PartialEq)]
pub struct EventFrame {
    pub name: String,
    pub payload: Value,
}

impl EventFrame {
    pub fn new(name: impl Into<String>, payload: Value) -> Self {
        Self {
            name: name.into(),
            payload,
        }
    }
}

/// A lazy, finite sequence of frames decoded from one response body
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<EventFrame>> + Send>>;

/// Incremental frame parser
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: Vec<u8>,
    // Bytes before this offset are known not to start a separator
    scanned: usize,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and drain every frame it completes
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<EventFrame> {
        self.buffer.extend_from_slice(chunk);
        let mut frames = Vec::new();

        while let Some(split) = find_separator(&self.buffer, self.scanned) {
            let block: Vec<u8> = self.buffer.drain(..split + SEPARATOR.len()).collect();
            self.scanned = 0;
            let block = String::from_utf8_lossy(&block[..split]);
            if let Some(frame) = parse_block(&block) {
                frames.push(frame);
            }
        }
        self.scanned = self.buffer.len().saturating_sub(SEPARATOR.len() - 1);

        frames
    }

    /// Decode a complete body in one shot
    pub fn decode_all(input: &[u8]) -> Vec<EventFrame> {
        Self::default().feed(input)
    }

    /// Bytes of an unterminated block still waiting for its separator
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Drop any dangling partial block. Returns how many bytes were discarded.
    pub fn finish(&mut self) -> usize {
        let dangling = self.buffer.len();
        if dangling > 0 {
            tracing::debug!("Discarding {} bytes of unterminated frame data", dangling);
        }
        self.buffer.clear();
        self.scanned = 0;
        dangling
    }
}

fn find_separator(buffer: &[u8], from: usize) -> Option<usize> {
    buffer
        .get(from..)?
        .windows(SEPARATOR.len())
        .position(|window| window == SEPARATOR)
        .map(|pos| from + pos)
}

fn parse_block(block: &str) -> Option<EventFrame> {
    let mut name: Option<&str> = None;
    let mut data = String::new();
    let mut saw_data = false;

    for line in block.split('\n') {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if let Some(value) = line.strip_prefix("event:") {
            name = Some(value.trim());
        } else if let Some(value) = line.strip_prefix("data:") {
            saw_data = true;
            data.push_str(value.trim());
        }
    }

    if !saw_data || data.is_empty() {
        return None;
    }

    let name = name
        .filter(|n| !n.is_empty())
        .unwrap_or(DEFAULT_EVENT)
        .to_string();

    match serde_json::from_str::<Value>(&data) {
        Ok(payload) => Some(EventFrame { name, payload }),
        Err(e) => {
            tracing::debug!("Dropping '{}' frame with unparseable payload: {}", name, e);
            None
        }
    }
}

/// Turn a byte stream into a stream of frames.
///
/// The sequence ends when the byte source ends; a trailing block without its
/// separator is discarded. A failing byte source yields one `Err` and ends.
pub fn decode_frames<S, B, E>(bytes: S) -> FrameStream
where
    S: Stream<Item = std::result::Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    Box::pin(stream! {
        let mut bytes = Box::pin(bytes);
        let mut decoder = FrameDecoder::new();

        while let Some(chunk) = bytes.next().await {
            match chunk {
                Ok(chunk) => {
                    for frame in decoder.feed(chunk.as_ref()) {
                        yield Ok(frame);
                    }
                }
                Err(e) => {
                    yield Err(Error::Stream(e.to_string()));
                    return;
                }
            }
        }

        decoder.finish();
    })
}
