//! Error types
//!
//! Each concern has its own error enum; the crate-level [`Error`] wraps them
//! so that top-level code can use a single `Result` alias.

use std::io;

use thiserror::Error;

/// Result alias using the crate-level error
pub type Result<T> = std::result::Result<T, Error>;

/// Crate-level error
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error (bind failure, socket errors)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Frame encryption or decryption failed
    #[error("Cipher error: {0}")]
    Cipher(#[from] CipherError),

    /// The frame slot was closed
    #[error("Slot error: {0}")]
    Slot(#[from] SlotError),

    /// Frame source failed
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    /// Malformed stream event
    #[error("Event error: {0}")]
    Event(#[from] EventError),
}

/// Errors from the frame cipher and its configuration
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CipherError {
    /// Key material has the wrong length
    #[error("invalid key length: expected {expected} bytes, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    /// IV has the wrong length
    #[error("invalid IV length: expected {expected} bytes, got {actual}")]
    InvalidIvLength { expected: usize, actual: usize },

    /// Key or IV text is not valid base64
    #[error("invalid base64 key material: {0}")]
    InvalidEncoding(String),

    /// Ciphertext is not a whole number of blocks
    #[error("ciphertext length {0} is not a multiple of the block size")]
    UnalignedCiphertext(usize),

    /// PKCS#7 padding check failed after decryption
    #[error("invalid PKCS#7 padding")]
    InvalidPadding,
}

/// Errors from the frame slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SlotError {
    /// The slot was closed; no further records will be published
    #[error("frame slot closed")]
    Closed,
}

/// Errors from frame sources
#[derive(Debug, Error)]
pub enum SourceError {
    /// Underlying read failed
    #[error("read failed: {0}")]
    Io(#[from] io::Error),

    /// A single frame exceeded the configured maximum size
    #[error("frame of {size} bytes exceeds limit of {limit} bytes")]
    FrameTooLarge { size: usize, limit: usize },

    /// A directory source found nothing to play
    #[error("no frames found in {0}")]
    Empty(String),

    /// Frame rate must be positive
    #[error("invalid frame rate: {0}")]
    InvalidFrameRate(f64),
}

/// Errors decoding a stream event on the consumer side
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventError {
    /// Line does not start with the `data:` field
    #[error("missing data field")]
    MissingData,

    /// Payload did not split into exactly three pipe-delimited parts
    #[error("expected 3 fields, got {0}")]
    FieldCount(usize),

    /// A frame field was not valid base64
    #[error("invalid base64 in {field} field")]
    InvalidBase64 { field: &'static str },

    /// Latency field was not a decimal number
    #[error("invalid latency: {0}")]
    InvalidLatency(String),
}
