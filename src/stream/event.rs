//! Server-sent event framing
//!
//! Each published frame becomes one event:
//!
//! ```text
//! data: <base64 ciphertext>|<base64 original>|<latency ms>\n\n
//! ```
//!
//! The standard base64 alphabet never contains `|`, so splitting on it is
//! unambiguous.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::{Buf, Bytes, BytesMut};

use crate::error::EventError;
use crate::slot::FrameRecord;

/// Field name prefix of every event line
const DATA_PREFIX: &str = "data:";

/// Field separator inside the data payload
const FIELD_SEPARATOR: char = '|';

/// Blank line terminating an event
const EVENT_TERMINATOR: &[u8] = b"\n\n";

/// Encode a record as one complete event, terminator included
pub fn encode_event(record: &FrameRecord) -> Bytes {
    let latency = record.encryption_latency_ms.to_string();
    let capacity = DATA_PREFIX.len()
        + 1
        + base64_len(record.encrypted.len())
        + base64_len(record.original.len())
        + latency.len()
        + 2
        + EVENT_TERMINATOR.len();

    let mut line = String::with_capacity(capacity);
    line.push_str(DATA_PREFIX);
    line.push(' ');
    STANDARD.encode_string(&record.encrypted, &mut line);
    line.push(FIELD_SEPARATOR);
    STANDARD.encode_string(&record.original, &mut line);
    line.push(FIELD_SEPARATOR);
    line.push_str(&latency);
    line.push_str("\n\n");

    Bytes::from(line)
}

fn base64_len(len: usize) -> usize {
    len.div_ceil(3) * 4
}

/// A decoded event, as a consumer sees it
#[derive(Debug, Clone, PartialEq)]
pub struct StreamEvent {
    /// Encrypted frame
    pub encrypted: Vec<u8>,
    /// Original frame
    pub original: Vec<u8>,
    /// Encryption latency reported by the server
    pub latency_ms: f64,
}

/// Parse one event block (`data: ...`, optionally followed by the blank line)
pub fn parse_event(block: &str) -> Result<StreamEvent, EventError> {
    let line = block.trim_end_matches(['\r', '\n']);
    let payload = line.strip_prefix(DATA_PREFIX).ok_or(EventError::MissingData)?;
    // A single space after the colon is part of the framing, not the value
    let payload = payload.strip_prefix(' ').unwrap_or(payload);
    parse_payload(payload)
}

/// Parse the `encrypted|original|latency` payload of an event
pub fn parse_payload(payload: &str) -> Result<StreamEvent, EventError> {
    let fields: Vec<&str> = payload.split(FIELD_SEPARATOR).collect();
    let [encrypted, original, latency] = fields.as_slice() else {
        return Err(EventError::FieldCount(fields.len()));
    };

    let encrypted = STANDARD
        .decode(encrypted)
        .map_err(|_| EventError::InvalidBase64 { field: "encrypted" })?;
    let original = STANDARD
        .decode(original)
        .map_err(|_| EventError::InvalidBase64 { field: "original" })?;
    let latency_ms = latency
        .trim()
        .parse::<f64>()
        .map_err(|_| EventError::InvalidLatency((*latency).to_string()))?;

    Ok(StreamEvent {
        encrypted,
        original,
        latency_ms,
    })
}

/// Reassembles events from an arbitrarily chunked byte stream
///
/// Chunks are pushed as they arrive from the socket; complete events are
/// pulled out one at a time.
#[derive(Debug, Default)]
pub struct EventReader {
    buffer: BytesMut,
}

impl EventReader {
    /// Create an empty reader
    pub fn new() -> Self {
        Self::default()
    }

    /// Append received bytes
    pub fn push(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
    }

    /// Bytes buffered but not yet part of a complete event
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Take the next complete raw event block, without its terminator
    pub fn next_block(&mut self) -> Option<Bytes> {
        let end = self
            .buffer
            .windows(EVENT_TERMINATOR.len())
            .position(|w| w == EVENT_TERMINATOR)?;

        let block = self.buffer.split_to(end).freeze();
        self.buffer.advance(EVENT_TERMINATOR.len());
        Some(block)
    }

    /// Take and decode the next complete event
    ///
    /// A malformed event is returned as an error and consumed, so the caller
    /// can log it and keep reading.
    pub fn next_event(&mut self) -> Option<Result<StreamEvent, EventError>> {
        let block = self.next_block()?;
        Some(parse_event(&String::from_utf8_lossy(&block)))
    }
}
