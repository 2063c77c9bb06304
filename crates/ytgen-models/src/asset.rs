//! Video asset models.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for an uploaded video asset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct AssetId(pub String);

impl AssetId {
    /// Generate a new random asset ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for AssetId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for AssetId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for AssetId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Transcription lifecycle status for a video asset.
///
/// Only `idle` or `failed` may enter `processing`; the transition is
/// performed with a compare-and-set in the store so duplicate submissions
/// cannot race two completions into the same record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum TranscriptionStatus {
    /// No transcription has been requested yet
    #[default]
    Idle,
    /// A background transcription job is in flight
    Processing,
    /// Transcript is available
    Completed,
    /// The last transcription attempt failed
    Failed,
}

impl TranscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TranscriptionStatus::Idle => "idle",
            TranscriptionStatus::Processing => "processing",
            TranscriptionStatus::Completed => "completed",
            TranscriptionStatus::Failed => "failed",
        }
    }

    /// Check if this is a terminal state for a job.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TranscriptionStatus::Completed | TranscriptionStatus::Failed)
    }

    /// Whether a new submission may transition to `processing` from here.
    pub fn can_submit(&self) -> bool {
        matches!(self, TranscriptionStatus::Idle | TranscriptionStatus::Failed)
    }
}

impl fmt::Display for TranscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Audio stream metadata from the full probe pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AudioMetadata {
    /// Audio codec name (e.g. "aac")
    pub codec: Option<String>,
    /// Sample rate in Hz
    pub sample_rate: Option<u32>,
    /// Channel count (stereo = 2, otherwise 1)
    pub channels: Option<u32>,
    /// Bit rate in bits/second
    pub bit_rate: Option<u64>,
}

/// Probed video metadata, merged from the fast and full passes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct VideoMetadata {
    /// Duration in seconds
    pub duration: Option<f64>,
    /// Width in pixels
    pub width: Option<u32>,
    /// Height in pixels
    pub height: Option<u32>,
    /// Frame rate (fps)
    pub fps: Option<f64>,
    /// Bit rate in bits/second
    pub bit_rate: Option<u64>,
    /// Container format (e.g. "mp4")
    pub container: Option<String>,
    /// Video codec name (e.g. "h264")
    pub codec: Option<String>,
    /// First audio stream, if any
    pub audio: Option<AudioMetadata>,
}

/// Position of a node on the canvas. Persisted verbatim; layout is computed
/// by the client.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CanvasPosition {
    pub x: f64,
    pub y: f64,
}

/// One uploaded video and its derived metadata/transcript.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct VideoAsset {
    /// Unique asset ID
    pub id: AssetId,
    /// Owning user
    pub user_id: String,
    /// Optional parent project
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    /// Opaque binary storage key
    pub storage_key: String,
    /// File size in bytes
    pub size_bytes: u64,
    /// Original file name as uploaded
    pub file_name: String,
    /// Display title
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Probed metadata (patched asynchronously)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<VideoMetadata>,
    /// Transcript text; non-empty only when status is `completed`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcript: Option<String>,
    /// True when the transcript was supplied manually by the user
    #[serde(default)]
    pub transcript_manual: bool,
    /// Current transcription status
    pub transcription_status: TranscriptionStatus,
    /// Error message; set only when status is `failed`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcription_error: Option<String>,
    /// Human-readable progress label for the in-flight job
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress_label: Option<String>,
    /// When the current/last transcription job entered `processing`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcription_started_at: Option<DateTime<Utc>>,
    /// Canvas position of the video node
    pub position: CanvasPosition,
    /// When the asset was created
    pub created_at: DateTime<Utc>,
}

impl VideoAsset {
    /// Create a new asset for an uploaded file.
    pub fn new(
        user_id: impl Into<String>,
        storage_key: impl Into<String>,
        file_name: impl Into<String>,
        size_bytes: u64,
    ) -> Self {
        Self {
            id: AssetId::new(),
            user_id: user_id.into(),
            project_id: None,
            storage_key: storage_key.into(),
            size_bytes,
            file_name: file_name.into(),
            title: None,
            metadata: None,
            transcript: None,
            transcript_manual: false,
            transcription_status: TranscriptionStatus::Idle,
            transcription_error: None,
            progress_label: None,
            transcription_started_at: None,
            position: CanvasPosition::default(),
            created_at: Utc::now(),
        }
    }

    /// Mark the transcription job as completed with a transcript.
    ///
    /// Clears any prior error so the completed/failed invariants hold.
    pub fn complete_transcription(&mut self, transcript: impl Into<String>) {
        self.transcript = Some(transcript.into());
        self.transcription_status = TranscriptionStatus::Completed;
        self.transcription_error = None;
        self.progress_label = None;
    }

    /// Mark the transcription job as failed.
    ///
    /// The transcript is cleared: a non-empty transcript is only valid in
    /// the `completed` state.
    pub fn fail_transcription(&mut self, error: impl Into<String>) {
        self.transcript = None;
        self.transcription_status = TranscriptionStatus::Failed;
        self.transcription_error = Some(error.into());
        self.progress_label = None;
    }

    /// File size in whole megabytes, rounded up.
    pub fn size_mb(&self) -> u64 {
        self.size_bytes.div_ceil(1024 * 1024)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_transitions() {
        assert!(TranscriptionStatus::Idle.can_submit());
        assert!(TranscriptionStatus::Failed.can_submit());
        assert!(!TranscriptionStatus::Processing.can_submit());
        assert!(!TranscriptionStatus::Completed.can_submit());
        assert!(TranscriptionStatus::Completed.is_terminal());
        assert!(!TranscriptionStatus::Processing.is_terminal());
    }

    #[test]
    fn test_transcript_error_invariants() {
        let mut asset = VideoAsset::new("user-1", "videos/a.mp4", "a.mp4", 1024);
        assert_eq!(asset.transcription_status, TranscriptionStatus::Idle);
        assert!(asset.transcript.is_none());

        asset.complete_transcription("hello world");
        assert_eq!(asset.transcription_status, TranscriptionStatus::Completed);
        assert_eq!(asset.transcript.as_deref(), Some("hello world"));
        assert!(asset.transcription_error.is_none());

        asset.fail_transcription("network down");
        assert_eq!(asset.transcription_status, TranscriptionStatus::Failed);
        assert!(asset.transcript.is_none());
        assert_eq!(asset.transcription_error.as_deref(), Some("network down"));
    }

    #[test]
    fn test_size_mb_rounds_up() {
        let asset = VideoAsset::new("u", "k", "f.mp4", 25 * 1024 * 1024 + 1);
        assert_eq!(asset.size_mb(), 26);
    }

    #[test]
    fn test_status_wire_format_is_snake_case() {
        let json = serde_json::to_value(TranscriptionStatus::Processing).unwrap();
        assert_eq!(json, serde_json::json!("processing"));
        let parsed: TranscriptionStatus = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, TranscriptionStatus::Processing);
    }

    #[test]
    fn test_absent_optionals_are_omitted_on_the_wire() {
        let asset = VideoAsset::new("u", "k", "f.mp4", 1024);
        let json = serde_json::to_value(&asset).unwrap();
        assert!(json.get("transcript").is_none());
        assert!(json.get("transcription_error").is_none());
        assert!(json.get("metadata").is_none());
    }
}
