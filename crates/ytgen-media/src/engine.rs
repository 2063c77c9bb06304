//! Explicitly owned FFmpeg engine handle.
//!
//! Binary paths are resolved once at startup and the engine is injected
//! into the prober and extractor instead of living in hidden global state.
//! Lifecycle is acquire-once, release-on-shutdown (drop).

use std::path::PathBuf;

use crate::error::{MediaError, MediaResult};

/// Resolved FFmpeg/FFprobe binaries.
#[derive(Debug, Clone)]
pub struct FfmpegEngine {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
}

impl FfmpegEngine {
    /// Resolve both binaries from PATH.
    pub fn acquire() -> MediaResult<Self> {
        let ffmpeg = which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)?;
        let ffprobe = which::which("ffprobe").map_err(|_| MediaError::FfprobeNotFound)?;
        Ok(Self { ffmpeg, ffprobe })
    }

    /// Create an engine from explicit paths (used in tests).
    pub fn with_paths(ffmpeg: impl Into<PathBuf>, ffprobe: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
        }
    }

    /// Path to the ffmpeg binary.
    pub fn ffmpeg(&self) -> &PathBuf {
        &self.ffmpeg
    }

    /// Path to the ffprobe binary.
    pub fn ffprobe(&self) -> &PathBuf {
        &self.ffprobe
    }
}
