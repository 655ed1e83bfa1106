//! MJPEG stream splitting
//!
//! An MJPEG pipe is a plain concatenation of JPEG images:
//!
//! ```text
//! FF D8 ... FF D9 FF D8 ... FF D9 ...
//! └ SOI     └ EOI └ SOI     └ EOI
//! ```
//!
//! Inside entropy-coded data every `FF` is stuffed as `FF 00`, so an `FF D9`
//! pair only occurs as a real end-of-image marker. Images that embed a JPEG
//! thumbnail (EXIF) are not supported.

use bytes::{Buf, Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};

use super::FrameSource;
use crate::error::SourceError;

/// Start-of-image marker
pub const SOI: [u8; 2] = [0xFF, 0xD8];

/// End-of-image marker
pub const EOI: [u8; 2] = [0xFF, 0xD9];

/// Default upper bound for a single frame (8 MiB)
pub const DEFAULT_MAX_FRAME_SIZE: usize = 8 * 1024 * 1024;

const READ_CHUNK: usize = 64 * 1024;

/// Splits a concatenated JPEG byte stream into frames
#[derive(Debug)]
pub struct MjpegSource<R> {
    reader: R,
    buffer: BytesMut,
    /// Offset up to which the buffer has been searched for EOI
    scanned: usize,
    max_frame_size: usize,
}

impl<R: AsyncRead + Unpin + Send> MjpegSource<R> {
    /// Create a splitter over the given reader
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buffer: BytesMut::with_capacity(READ_CHUNK),
            scanned: 0,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }

    /// Set the maximum accepted frame size
    pub fn max_frame_size(mut self, max: usize) -> Self {
        self.max_frame_size = max;
        self
    }

    /// Pull one complete frame out of the buffer, if present
    fn extract(&mut self) -> Result<Option<Bytes>, SourceError> {
        if self.scanned == 0 {
            match find(&self.buffer, &SOI, 0) {
                Some(start) => self.buffer.advance(start),
                None => {
                    // Keep a trailing FF: it may be the first half of SOI
                    let keep = usize::from(self.buffer.last() == Some(&0xFF));
                    let discard = self.buffer.len() - keep;
                    self.buffer.advance(discard);
                    return Ok(None);
                }
            }
            self.scanned = SOI.len();
        }

        // Back up one byte so a marker split across reads is found
        let from = self.scanned.saturating_sub(1).max(SOI.len());
        match find(&self.buffer, &EOI, from) {
            Some(end) => {
                let frame = self.buffer.split_to(end + EOI.len()).freeze();
                self.scanned = 0;
                if frame.len() > self.max_frame_size {
                    return Err(SourceError::FrameTooLarge {
                        size: frame.len(),
                        limit: self.max_frame_size,
                    });
                }
                Ok(Some(frame))
            }
            None if self.buffer.len() > self.max_frame_size => {
                let size = self.buffer.len();
                self.buffer.clear();
                self.scanned = 0;
                Err(SourceError::FrameTooLarge {
                    size,
                    limit: self.max_frame_size,
                })
            }
            None => {
                self.scanned = self.buffer.len();
                Ok(None)
            }
        }
    }
}

impl<R: AsyncRead + Unpin + Send> FrameSource for MjpegSource<R> {
    async fn next_frame(&mut self) -> Result<Option<Bytes>, SourceError> {
        loop {
            if let Some(frame) = self.extract()? {
                return Ok(Some(frame));
            }

            self.buffer.reserve(READ_CHUNK);
            let n = self.reader.read_buf(&mut self.buffer).await?;
            if n == 0 {
                if !self.buffer.is_empty() {
                    tracing::debug!(
                        bytes = self.buffer.len(),
                        "Discarding incomplete frame at end of stream"
                    );
                }
                return Ok(None);
            }
        }
    }
}

fn find(haystack: &[u8], needle: &[u8; 2], from: usize) -> Option<usize> {
    haystack
        .get(from..)?
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|pos| pos + from)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jpeg(body: &[u8]) -> Vec<u8> {
        let mut frame = SOI.to_vec();
        frame.extend_from_slice(body);
        frame.extend_from_slice(&EOI);
        frame
    }

    #[tokio::test]
    async fn test_split_concatenated_frames() {
        let mut stream = jpeg(&[1, 2, 3]);
        stream.extend(jpeg(&[4, 5]));
        let mut source = MjpegSource::new(stream.as_slice());

        assert_eq!(source.next_frame().await.unwrap().unwrap(), jpeg(&[1, 2, 3]));
        assert_eq!(source.next_frame().await.unwrap().unwrap(), jpeg(&[4, 5]));
        assert!(source.next_frame().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_skips_leading_garbage() {
        let mut stream = vec![0x00, 0x11, 0xFF, 0x22];
        stream.extend(jpeg(&[9]));
        let mut source = MjpegSource::new(stream.as_slice());

        assert_eq!(source.next_frame().await.unwrap().unwrap(), jpeg(&[9]));
    }

    #[tokio::test]
    async fn test_stuffed_ff_is_not_eoi() {
        let frame = jpeg(&[0xFF, 0x00, 0xD9, 0x01]);
        let mut source = MjpegSource::new(frame.as_slice());

        assert_eq!(source.next_frame().await.unwrap().unwrap(), frame);
    }

    #[tokio::test]
    async fn test_incomplete_tail_discarded() {
        let mut stream = jpeg(&[1]);
        stream.extend_from_slice(&[0xFF, 0xD8, 0x05, 0x06]);
        let mut source = MjpegSource::new(stream.as_slice());

        assert!(source.next_frame().await.unwrap().is_some());
        assert!(source.next_frame().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_frame_too_large() {
        let mut stream = jpeg(&[0u8; 64]);
        stream.extend(jpeg(&[7]));
        let mut source = MjpegSource::new(stream.as_slice()).max_frame_size(16);

        let mut frames = Vec::new();
        let mut too_large = 0;
        loop {
            match source.next_frame().await {
                Ok(Some(frame)) => frames.push(frame),
                Ok(None) => break,
                Err(SourceError::FrameTooLarge { limit, .. }) => {
                    assert_eq!(limit, 16);
                    too_large += 1;
                }
                Err(e) => panic!("unexpected error: {}", e),
            }
        }

        assert_eq!(too_large, 1);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0], jpeg(&[7]));
    }

    #[tokio::test]
    async fn test_marker_split_across_reads() {
        let frame = jpeg(&[1, 2, 3, 4]);
        let (client, mut server) = tokio::io::duplex(64);
        let mut source = MjpegSource::new(client);

        let writer = tokio::spawn(async move {
            use tokio::io::AsyncWriteExt;
            // Split right between FF and D9 of the EOI marker
            let split = frame.len() - 1;
            server.write_all(&frame[..split]).await.unwrap();
            server.flush().await.unwrap();
            tokio::task::yield_now().await;
            server.write_all(&frame[split..]).await.unwrap();
        });

        let got = source.next_frame().await.unwrap().unwrap();
        assert_eq!(got, jpeg(&[1, 2, 3, 4]));
        writer.await.unwrap();
    }

    #[test]
    fn test_find() {
        assert_eq!(find(&[0, 0xFF, 0xD8], &SOI, 0), Some(1));
        assert_eq!(find(&[0xFF, 0xD8, 0xFF, 0xD8], &SOI, 1), Some(2));
        assert_eq!(find(&[0xFF], &SOI, 0), None);
        assert_eq!(find(&[0xFF, 0xD8], &SOI, 5), None);
    }
}
