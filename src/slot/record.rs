//! Published frame record

use bytes::Bytes;

/// One frame as handed to subscribers
///
/// Cheap to clone: both payloads are reference-counted `Bytes`.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameRecord {
    /// Encrypted frame (PKCS#7-padded AES-256-CBC)
    pub encrypted: Bytes,
    /// Original, unencrypted frame
    pub original: Bytes,
    /// Time spent encrypting, in milliseconds
    pub encryption_latency_ms: f64,
}

impl FrameRecord {
    /// Create a new record
    pub fn new(encrypted: Bytes, original: Bytes, encryption_latency_ms: f64) -> Self {
        Self {
            encrypted,
            original,
            encryption_latency_ms,
        }
    }
}
