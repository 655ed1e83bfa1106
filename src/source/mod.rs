//! Frame sources
//!
//! A source hands the producer one encoded image at a time, at its own
//! cadence. Camera capture itself happens outside this crate; frames arrive
//! either as an MJPEG byte stream (e.g. piped from `ffmpeg` or a camera tool)
//! or as a directory of JPEG files replayed at a fixed rate.

use std::future::Future;

use bytes::Bytes;

use crate::error::SourceError;

pub mod directory;
pub mod mjpeg;

pub use directory::DirectorySource;
pub use mjpeg::MjpegSource;

/// Producer of raw frames
pub trait FrameSource: Send {
    /// Wait for the next frame
    ///
    /// Returns `Ok(None)` when the source is exhausted.
    fn next_frame(&mut self) -> impl Future<Output = Result<Option<Bytes>, SourceError>> + Send;
}

impl SourceError {
    /// Whether the source can keep producing after this error
    pub fn is_recoverable(&self) -> bool {
        matches!(self, SourceError::FrameTooLarge { .. })
    }
}
