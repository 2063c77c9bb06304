//! Audio extraction for the mid-size transcription tier.
//!
//! The video stream is dropped and the audio re-encoded to AAC at a fixed
//! target bitrate. Extraction failures are final: a corrupt or
//! codec-unsupported source fails identically on retry, so the error is
//! typed as non-recoverable.

use std::path::PathBuf;
use tempfile::TempDir;
use tracing::info;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::engine::FfmpegEngine;
use crate::error::{MediaError, MediaResult};

/// Target bitrate for extracted audio.
pub const TARGET_AUDIO_BITRATE: &str = "128k";

/// An extracted audio artifact.
///
/// Holds the temp directory so the file lives as long as the handle.
#[derive(Debug)]
pub struct ExtractedAudio {
    pub path: PathBuf,
    pub file_name: String,
    pub mime_type: &'static str,
    _dir: TempDir,
}

impl ExtractedAudio {
    /// Read the artifact's bytes.
    pub async fn read(&self) -> MediaResult<Vec<u8>> {
        Ok(tokio::fs::read(&self.path).await?)
    }
}

/// Extract the audio stream from a video file.
pub async fn extract_audio(
    engine: &FfmpegEngine,
    input: impl AsRef<std::path::Path>,
) -> MediaResult<ExtractedAudio> {
    let input = input.as_ref();
    if !input.exists() {
        return Err(MediaError::FileNotFound(input.to_path_buf()));
    }

    let dir = tempfile::tempdir()?;
    let file_name = "audio.m4a".to_string();
    let out_path = dir.path().join(&file_name);

    let cmd = FfmpegCommand::new(input, &out_path)
        .no_video()
        .audio_codec("aac")
        .audio_bitrate(TARGET_AUDIO_BITRATE);

    let runner = FfmpegRunner::new(engine.clone()).with_timeout(300);
    runner.run(&cmd).await.map_err(|e| match e {
        MediaError::FfmpegFailed { stderr, .. } => MediaError::audio_extraction(format!(
            "failed to extract audio stream: {}",
            stderr.unwrap_or_default().lines().last().unwrap_or("unknown")
        )),
        other => other,
    })?;

    let size = tokio::fs::metadata(&out_path).await?.len();
    if size == 0 {
        return Err(MediaError::audio_extraction("extracted audio is empty"));
    }
    info!("Extracted audio: {} bytes at {}", size, TARGET_AUDIO_BITRATE);

    Ok(ExtractedAudio {
        path: out_path,
        file_name,
        mime_type: "audio/mp4",
        _dir: dir,
    })
}
