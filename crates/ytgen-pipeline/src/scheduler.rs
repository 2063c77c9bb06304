//! Transcription job scheduler.
//!
//! Owns the `idle → processing → {completed | failed}` lifecycle of a
//! video's transcription. The status is patched to `processing`
//! synchronously (and under a guard) before the background task is
//! dispatched, so readers never observe a submission as `idle` and
//! duplicate submissions cannot race two completions into the record.
//! There are no automatic retries: every retry is a user resubmission.

use std::path::Path;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use ytgen_ai::Transcriber;
use ytgen_media::{plan_transcription, PlannerConfig, TranscriptionPlan};
use ytgen_models::AssetId;
use ytgen_storage::BlobStore;
use ytgen_store::{AgentRepository, AssetRepository};

use crate::error::{PipelineError, PipelineResult};
use crate::extractor::AudioExtractor;

/// Scheduler for background transcription jobs.
#[derive(Clone)]
pub struct TranscriptionScheduler {
    assets: AssetRepository,
    agents: AgentRepository,
    blob: Arc<dyn BlobStore>,
    transcriber: Arc<dyn Transcriber>,
    extractor: Arc<dyn AudioExtractor>,
    planner: PlannerConfig,
}

impl TranscriptionScheduler {
    pub fn new(
        assets: AssetRepository,
        agents: AgentRepository,
        blob: Arc<dyn BlobStore>,
        transcriber: Arc<dyn Transcriber>,
        extractor: Arc<dyn AudioExtractor>,
        planner: PlannerConfig,
    ) -> Self {
        Self {
            assets,
            agents,
            blob,
            transcriber,
            extractor,
            planner,
        }
    }

    /// The planner configuration in effect.
    pub fn planner(&self) -> &PlannerConfig {
        &self.planner
    }

    /// Submit a transcription job for an asset.
    ///
    /// Wins or loses the `processing` transition synchronously; the caller
    /// only blocks on that initial patch, never on job completion. The
    /// returned handle is awaited in tests and dropped by the API.
    pub async fn submit(&self, user_id: &str, asset_id: &AssetId) -> PipelineResult<JoinHandle<()>> {
        // Ownership is checked by the guarded transition itself.
        let won = self.assets.try_begin_transcription(user_id, asset_id).await?;
        if !won {
            return Err(PipelineError::AlreadyProcessing);
        }

        info!("Scheduled transcription for asset {}", asset_id);

        let scheduler = self.clone();
        let user_id = user_id.to_string();
        let asset_id = asset_id.clone();
        Ok(tokio::spawn(async move {
            scheduler.run_job(&user_id, &asset_id).await;
        }))
    }

    /// Execute one transcription job to a terminal state.
    ///
    /// Every exit path patches the asset to `completed` or `failed`; the
    /// record is never left dangling in `processing`.
    async fn run_job(&self, user_id: &str, asset_id: &AssetId) {
        match self.transcribe_asset(user_id, asset_id).await {
            Ok(transcript) => {
                if let Err(e) = self
                    .assets
                    .complete_transcription(user_id, asset_id, transcript)
                    .await
                {
                    error!("Failed to persist transcript for {}: {}", asset_id, e);
                }
            }
            Err(e) => {
                warn!("Transcription job for {} failed: {}", asset_id, e);
                if let Err(patch_err) = self
                    .assets
                    .fail_transcription(user_id, asset_id, e.to_string())
                    .await
                {
                    error!("Failed to record failure for {}: {}", asset_id, patch_err);
                }
            }
        }
    }

    /// Select the tier and produce a transcript.
    async fn transcribe_asset(&self, user_id: &str, asset_id: &AssetId) -> PipelineResult<String> {
        let asset = self.assets.get(user_id, asset_id).await?;

        match plan_transcription(asset.size_bytes, &self.planner) {
            TranscriptionPlan::Unsupported => {
                return Err(PipelineError::SizeExceeded {
                    size_mb: asset.size_mb(),
                    max_mb: self.planner.max_size_mb,
                });
            }
            TranscriptionPlan::Direct => {
                self.assets
                    .set_progress_label(user_id, asset_id, "Uploading for transcription")
                    .await?;

                let local = self.blob.download_to_temp(&asset.storage_key).await?;
                let result = self.transcribe_file(&local, &asset.file_name).await;
                cleanup(&local).await;
                result
            }
            TranscriptionPlan::ExtractAudio => {
                self.assets
                    .set_progress_label(user_id, asset_id, "Extracting audio")
                    .await?;

                let local = self.blob.download_to_temp(&asset.storage_key).await?;
                let artifact = self.extractor.extract(&local).await;
                cleanup(&local).await;
                let artifact = artifact?;

                self.assets
                    .set_progress_label(user_id, asset_id, "Uploading audio for transcription")
                    .await?;
                Ok(self
                    .transcriber
                    .transcribe(artifact.bytes, artifact.file_name, artifact.mime_type)
                    .await?)
            }
        }
    }

    async fn transcribe_file(&self, path: &Path, file_name: &str) -> PipelineResult<String> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(ytgen_media::MediaError::from)?;
        Ok(self
            .transcriber
            .transcribe(bytes, file_name.to_string(), mime_for(file_name).to_string())
            .await?)
    }

    /// Manual transcript override, bypassing the background job.
    ///
    /// On acceptance every agent bound to the video is reset to an empty
    /// draft and `idle` status: any transcript change invalidates all
    /// dependent generations.
    pub async fn set_manual_transcript(
        &self,
        user_id: &str,
        asset_id: &AssetId,
        transcript: String,
    ) -> PipelineResult<usize> {
        let transcript = transcript.trim().to_string();
        if transcript.is_empty() {
            return Err(PipelineError::EmptyTranscript);
        }

        self.assets
            .set_manual_transcript(user_id, asset_id, transcript)
            .await?;
        let reset = self
            .agents
            .reset_for_transcript_change(user_id, asset_id)
            .await?;
        info!(
            "Manual transcript accepted for {}; {} agents invalidated",
            asset_id, reset
        );
        Ok(reset)
    }
}

/// Best-effort removal of a downloaded temp file.
async fn cleanup(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        warn!("Failed to remove temp file {}: {}", path.display(), e);
    }
}

/// Guess the upload mime type from the file extension.
fn mime_for(file_name: &str) -> &'static str {
    match Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("mp4") => "video/mp4",
        Some("mov") => "video/quicktime",
        Some("webm") => "video/webm",
        Some("mkv") => "video/x-matroska",
        Some("m4a") => "audio/mp4",
        Some("mp3") => "audio/mpeg",
        Some("wav") => "audio/wav",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ytgen_ai::MockTranscriber;
    use ytgen_media::MediaError;
    use ytgen_models::{Agent, AgentType, TranscriptionStatus, VideoAsset};
    use ytgen_storage::MockBlobStore;

    use crate::extractor::{AudioArtifact, MockAudioExtractor};

    const MB: u64 = 1024 * 1024;

    fn write_temp(content: &[u8]) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("ytgen-test-{}.mp4", uuid::Uuid::new_v4()));
        std::fs::write(&path, content).unwrap();
        path
    }

    async fn make_scheduler(
        size_bytes: u64,
        transcriber: MockTranscriber,
        extractor: MockAudioExtractor,
        blob: MockBlobStore,
    ) -> (TranscriptionScheduler, AssetId) {
        let assets = AssetRepository::new();
        let agents = AgentRepository::new();
        let asset = VideoAsset::new("alice", "videos/test.mp4", "test.mp4", size_bytes);
        let asset_id = asset.id.clone();
        assets.create(asset).await.unwrap();

        let scheduler = TranscriptionScheduler::new(
            assets,
            agents,
            Arc::new(blob),
            Arc::new(transcriber),
            Arc::new(extractor),
            PlannerConfig::default(),
        );
        (scheduler, asset_id)
    }

    #[tokio::test]
    async fn test_direct_tier_success() {
        let mut blob = MockBlobStore::new();
        blob.expect_download_to_temp()
            .returning(|_| Ok(write_temp(b"tiny video bytes")));

        let mut transcriber = MockTranscriber::new();
        transcriber
            .expect_transcribe()
            .withf(|_, name, mime| name == "test.mp4" && mime == "video/mp4")
            .returning(|_, _, _| Ok("hello transcript".to_string()));

        let (scheduler, asset_id) =
            make_scheduler(10 * MB, transcriber, MockAudioExtractor::new(), blob).await;

        let handle = scheduler.submit("alice", &asset_id).await.unwrap();
        handle.await.unwrap();

        let asset = scheduler.assets.get("alice", &asset_id).await.unwrap();
        assert_eq!(asset.transcription_status, TranscriptionStatus::Completed);
        assert_eq!(asset.transcript.as_deref(), Some("hello transcript"));
    }

    #[tokio::test]
    async fn test_extract_tier_routes_through_extractor() {
        let mut blob = MockBlobStore::new();
        blob.expect_download_to_temp()
            .returning(|_| Ok(write_temp(b"mid-size video bytes")));

        let mut extractor = MockAudioExtractor::new();
        extractor.expect_extract().returning(|_| {
            Ok(AudioArtifact {
                bytes: b"audio".to_vec(),
                file_name: "audio.m4a".to_string(),
                mime_type: "audio/mp4".to_string(),
            })
        });

        let mut transcriber = MockTranscriber::new();
        transcriber
            .expect_transcribe()
            .withf(|bytes, name, _| bytes == b"audio" && name == "audio.m4a")
            .returning(|_, _, _| Ok("extracted transcript".to_string()));

        let (scheduler, asset_id) = make_scheduler(40 * MB, transcriber, extractor, blob).await;

        let handle = scheduler.submit("alice", &asset_id).await.unwrap();
        handle.await.unwrap();

        let asset = scheduler.assets.get("alice", &asset_id).await.unwrap();
        assert_eq!(asset.transcription_status, TranscriptionStatus::Completed);
        assert_eq!(asset.transcript.as_deref(), Some("extracted transcript"));
    }

    #[tokio::test]
    async fn test_oversize_fails_with_size_message() {
        let (scheduler, asset_id) = make_scheduler(
            150 * MB,
            MockTranscriber::new(),
            MockAudioExtractor::new(),
            MockBlobStore::new(),
        )
        .await;

        let handle = scheduler.submit("alice", &asset_id).await.unwrap();
        handle.await.unwrap();

        let asset = scheduler.assets.get("alice", &asset_id).await.unwrap();
        assert_eq!(asset.transcription_status, TranscriptionStatus::Failed);
        let error = asset.transcription_error.unwrap();
        assert!(error.contains("100MB"), "unexpected error: {error}");
    }

    #[tokio::test]
    async fn test_duplicate_submission_rejected() {
        let mut blob = MockBlobStore::new();
        blob.expect_download_to_temp()
            .returning(|_| Ok(write_temp(b"bytes")));
        let mut transcriber = MockTranscriber::new();
        transcriber
            .expect_transcribe()
            .times(1)
            .returning(|_, _, _| Ok("only one".to_string()));

        let (scheduler, asset_id) =
            make_scheduler(5 * MB, transcriber, MockAudioExtractor::new(), blob).await;

        let handle = scheduler.submit("alice", &asset_id).await.unwrap();
        let second = scheduler.submit("alice", &asset_id).await;
        assert!(matches!(second, Err(PipelineError::AlreadyProcessing)));

        handle.await.unwrap();
        let asset = scheduler.assets.get("alice", &asset_id).await.unwrap();
        assert_eq!(asset.transcription_status, TranscriptionStatus::Completed);
        assert_eq!(asset.transcript.as_deref(), Some("only one"));
    }

    #[tokio::test]
    async fn test_failure_is_terminal_and_resubmittable() {
        let mut blob = MockBlobStore::new();
        blob.expect_download_to_temp()
            .returning(|_| Ok(write_temp(b"bytes")));
        let mut extractor = MockAudioExtractor::new();
        extractor
            .expect_extract()
            .returning(|_| Err(MediaError::audio_extraction("no audio stream")));

        let (scheduler, asset_id) =
            make_scheduler(40 * MB, MockTranscriber::new(), extractor, blob).await;

        let handle = scheduler.submit("alice", &asset_id).await.unwrap();
        handle.await.unwrap();

        let asset = scheduler.assets.get("alice", &asset_id).await.unwrap();
        assert_eq!(asset.transcription_status, TranscriptionStatus::Failed);
        assert!(asset.transcription_error.unwrap().contains("no audio stream"));

        // Failed assets may be resubmitted
        assert!(scheduler
            .assets
            .try_begin_transcription("alice", &asset_id)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_manual_transcript_cascades() {
        let (scheduler, asset_id) = make_scheduler(
            5 * MB,
            MockTranscriber::new(),
            MockAudioExtractor::new(),
            MockBlobStore::new(),
        )
        .await;

        // A ready agent with a draft
        let agent = Agent::new("alice", asset_id.clone(), AgentType::Title);
        let agent_id = agent.id.clone();
        scheduler.agents.create(agent).await.unwrap();
        scheduler
            .agents
            .try_begin_generation("alice", &agent_id)
            .await
            .unwrap();
        scheduler
            .agents
            .complete_generation("alice", &agent_id, "Stale Title".into())
            .await
            .unwrap();

        let reset = scheduler
            .set_manual_transcript("alice", &asset_id, "a brand new transcript".into())
            .await
            .unwrap();
        assert_eq!(reset, 1);

        let asset = scheduler.assets.get("alice", &asset_id).await.unwrap();
        assert_eq!(asset.transcription_status, TranscriptionStatus::Completed);
        assert!(asset.transcript_manual);

        let agent = scheduler.agents.get("alice", &agent_id).await.unwrap();
        assert_eq!(agent.draft, "");
        assert_eq!(agent.status, ytgen_models::AgentStatus::Idle);
    }

    #[tokio::test]
    async fn test_manual_transcript_rejects_empty() {
        let (scheduler, asset_id) = make_scheduler(
            5 * MB,
            MockTranscriber::new(),
            MockAudioExtractor::new(),
            MockBlobStore::new(),
        )
        .await;

        let result = scheduler
            .set_manual_transcript("alice", &asset_id, "   ".into())
            .await;
        assert!(matches!(result, Err(PipelineError::EmptyTranscript)));
    }

    #[test]
    fn test_mime_guessing() {
        assert_eq!(mime_for("clip.MP4"), "video/mp4");
        assert_eq!(mime_for("audio.m4a"), "audio/mp4");
        assert_eq!(mime_for("mystery"), "application/octet-stream");
    }
}
