//! Frame producer
//!
//! Pulls frames from a [`FrameSource`], encrypts each one and publishes the
//! result to the [`FrameSlot`]. This is the slot's only writer.
//!
//! A frame that fails to encrypt is dropped; subscribers keep seeing the
//! last good record until the next frame succeeds. When the source ends or
//! fails for good the slot is closed, which ends every client stream.

use std::sync::Arc;

use bytes::Bytes;

use crate::crypto::{FrameCipher, FrameEncryptor};
use crate::error::Result;
use crate::slot::{FrameRecord, FrameSlot};
use crate::source::FrameSource;
use crate::stats::StreamStats;

/// Producer loop: source → cipher → slot
pub struct Pipeline<S, C = FrameCipher> {
    source: S,
    cipher: C,
    slot: Arc<FrameSlot>,
    stats: Arc<StreamStats>,
}

impl<S: FrameSource, C: FrameEncryptor> Pipeline<S, C> {
    /// Create a pipeline
    pub fn new(
        source: S,
        cipher: C,
        slot: Arc<FrameSlot>,
        stats: Arc<StreamStats>,
    ) -> Self {
        Self {
            source,
            cipher,
            slot,
            stats,
        }
    }

    /// Encrypt and publish one frame
    ///
    /// Returns true if the frame was published. A frame that fails to
    /// encrypt is dropped and the previously published record stays current.
    pub fn process_frame(&self, frame: Bytes) -> bool {
        let encrypted = match self.cipher.encrypt_frame(&frame) {
            Ok(encrypted) => encrypted,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    frame_len = frame.len(),
                    "Encryption error, frame dropped"
                );
                self.stats.record_dropped(frame.len());
                return false;
            }
        };

        let frame_len = frame.len();
        let latency_ms = encrypted.latency_ms;
        let record = FrameRecord::new(encrypted.ciphertext, frame, latency_ms);

        match self.slot.publish(record) {
            Ok(generation) => {
                self.stats.record_published(frame_len, latency_ms);
                tracing::trace!(
                    generation = generation,
                    frame_len = frame_len,
                    latency_ms = latency_ms,
                    "Frame published"
                );
                true
            }
            Err(e) => {
                tracing::debug!(error = %e, "Frame not published");
                false
            }
        }
    }

    /// Run until the source is exhausted, fails, or the slot is closed
    ///
    /// Always closes the slot before returning. Returns the number of frames
    /// published.
    pub async fn run(mut self) -> Result<u64> {
        let mut published = 0u64;

        let result = loop {
            if self.slot.is_closed() {
                break Ok(());
            }

            match self.source.next_frame().await {
                Ok(Some(frame)) => {
                    if self.process_frame(frame) {
                        published += 1;
                    }
                }
                Ok(None) => {
                    tracing::info!(frames = published, "Frame source ended");
                    break Ok(());
                }
                Err(e) if e.is_recoverable() => {
                    tracing::warn!(error = %e, "Skipping bad frame");
                    self.stats.record_dropped(0);
                }
                Err(e) => {
                    tracing::error!(error = %e, "Frame source failed");
                    break Err(e.into());
                }
            }
        };

        self.slot.close();
        result.map(|()| published)
    }
}
