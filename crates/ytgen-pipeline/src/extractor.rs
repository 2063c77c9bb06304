//! Audio extraction seam for the scheduler.
//!
//! The scheduler only needs "bytes it can send to the transcription
//! service"; the FFmpeg-backed implementation lives behind a trait so the
//! state machine can be tested without media binaries.

use std::path::Path;

use ytgen_media::{extract_audio, FfmpegEngine, MediaResult};

/// An extracted, upload-ready audio artifact.
#[derive(Debug, Clone)]
pub struct AudioArtifact {
    pub bytes: Vec<u8>,
    pub file_name: String,
    pub mime_type: String,
}

/// Audio extraction seam.
#[mockall::automock]
#[async_trait::async_trait]
pub trait AudioExtractor: Send + Sync {
    /// Extract and compress the audio stream of a local video file.
    async fn extract(&self, input: &Path) -> MediaResult<AudioArtifact>;
}

/// FFmpeg-backed extractor.
#[derive(Debug, Clone)]
pub struct FfmpegAudioExtractor {
    engine: FfmpegEngine,
}

impl FfmpegAudioExtractor {
    pub fn new(engine: FfmpegEngine) -> Self {
        Self { engine }
    }
}

#[async_trait::async_trait]
impl AudioExtractor for FfmpegAudioExtractor {
    async fn extract(&self, input: &Path) -> MediaResult<AudioArtifact> {
        let extracted = extract_audio(&self.engine, input).await?;
        let bytes = extracted.read().await?;
        Ok(AudioArtifact {
            bytes,
            file_name: extracted.file_name.clone(),
            mime_type: extracted.mime_type.to_string(),
        })
    }
}
