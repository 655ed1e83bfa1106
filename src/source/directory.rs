//! Directory replay source
//!
//! Loads every JPEG in a directory once and replays them in name order at a
//! fixed frame rate. Useful for demos and testing without a camera.

use std::path::{Path, PathBuf};
use std::time::Duration;

use bytes::Bytes;
use tokio::time::{Interval, MissedTickBehavior};

use super::FrameSource;
use crate::error::SourceError;

/// Replays JPEG files from a directory
#[derive(Debug)]
pub struct DirectorySource {
    frames: Vec<Bytes>,
    next: usize,
    looping: bool,
    ticker: Interval,
}

impl DirectorySource {
    /// Load all `.jpg` / `.jpeg` files from `dir`
    pub async fn open(dir: impl AsRef<Path>, fps: f64) -> Result<Self, SourceError> {
        let dir = dir.as_ref();
        let period = frame_period(fps)?;

        let mut paths: Vec<PathBuf> = Vec::new();
        let mut entries = tokio::fs::read_dir(dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if is_jpeg(&path) {
                paths.push(path);
            }
        }
        paths.sort();

        let mut frames = Vec::with_capacity(paths.len());
        for path in &paths {
            frames.push(Bytes::from(tokio::fs::read(path).await?));
        }

        if frames.is_empty() {
            return Err(SourceError::Empty(dir.display().to_string()));
        }

        tracing::info!(
            dir = %dir.display(),
            frames = frames.len(),
            fps = fps,
            "Loaded frame directory"
        );

        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        Ok(Self {
            frames,
            next: 0,
            looping: true,
            ticker,
        })
    }

    /// Stop after one pass instead of looping forever
    pub fn once(mut self) -> Self {
        self.looping = false;
        self
    }

    /// Number of frames loaded
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }
}

impl FrameSource for DirectorySource {
    async fn next_frame(&mut self) -> Result<Option<Bytes>, SourceError> {
        if self.next >= self.frames.len() {
            if !self.looping {
                return Ok(None);
            }
            self.next = 0;
        }

        self.ticker.tick().await;
        let frame = self.frames[self.next].clone();
        self.next += 1;
        Ok(Some(frame))
    }
}

/// Time between frames; must be representable and non-zero
fn frame_period(fps: f64) -> Result<Duration, SourceError> {
    if !fps.is_finite() || fps <= 0.0 {
        return Err(SourceError::InvalidFrameRate(fps));
    }
    match Duration::try_from_secs_f64(1.0 / fps) {
        Ok(period) if !period.is_zero() => Ok(period),
        _ => Err(SourceError::InvalidFrameRate(fps)),
    }
}

fn is_jpeg(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("jpg") || ext.eq_ignore_ascii_case("jpeg"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_jpeg() {
        assert!(is_jpeg(Path::new("a.jpg")));
        assert!(is_jpeg(Path::new("b.JPEG")));
        assert!(!is_jpeg(Path::new("c.png")));
        assert!(!is_jpeg(Path::new("noext")));
    }

    #[tokio::test]
    async fn test_replays_in_name_order() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path();
        std::fs::write(dir.join("002.jpg"), b"second").unwrap();
        std::fs::write(dir.join("001.jpg"), b"first").unwrap();
        std::fs::write(dir.join("notes.txt"), b"ignored").unwrap();

        let mut source = DirectorySource::open(dir, 1000.0).await.unwrap().once();
        assert_eq!(source.frame_count(), 2);

        assert_eq!(source.next_frame().await.unwrap().unwrap(), &b"first"[..]);
        assert_eq!(source.next_frame().await.unwrap().unwrap(), &b"second"[..]);
        assert!(source.next_frame().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_loops_by_default() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path();
        std::fs::write(dir.join("only.jpeg"), b"frame").unwrap();

        let mut source = DirectorySource::open(dir, 1000.0).await.unwrap();
        for _ in 0..3 {
            assert_eq!(source.next_frame().await.unwrap().unwrap(), &b"frame"[..]);
        }
    }

    #[tokio::test]
    async fn test_empty_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let result = DirectorySource::open(tmp.path(), 10.0).await;
        assert!(matches!(result, Err(SourceError::Empty(_))));
    }

    #[tokio::test]
    async fn test_invalid_fps() {
        let result = DirectorySource::open(std::env::temp_dir(), 0.0).await;
        assert!(matches!(result, Err(SourceError::InvalidFrameRate(_))));
    }

    #[tokio::test]
    async fn test_invalid_fps_extremes() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("only.jpg"), b"frame").unwrap();

        // Period rounds down to zero
        let result = DirectorySource::open(tmp.path(), 1e10).await;
        assert!(matches!(result, Err(SourceError::InvalidFrameRate(_))));

        // Period overflows Duration
        let result = DirectorySource::open(tmp.path(), 1e-300).await;
        assert!(matches!(result, Err(SourceError::InvalidFrameRate(_))));

        for fps in [f64::NAN, f64::INFINITY, -5.0] {
            let result = DirectorySource::open(tmp.path(), fps).await;
            assert!(matches!(result, Err(SourceError::InvalidFrameRate(_))));
        }
    }

    #[test]
    fn test_frame_period() {
        assert_eq!(frame_period(10.0).unwrap(), Duration::from_millis(100));
        assert_eq!(frame_period(0.5).unwrap(), Duration::from_secs(2));
    }
}
