//! Video asset repository.

use tracing::{debug, info};

use ytgen_models::{AssetId, CanvasPosition, TranscriptionStatus, VideoAsset, VideoMetadata};

use crate::backend::Collection;
use crate::error::{StoreError, StoreResult};

/// Typed repository for video assets.
///
/// Every accessor takes the current user id and enforces ownership before
/// touching the record; this is the sole access-control discipline.
#[derive(Debug, Clone, Default)]
pub struct AssetRepository {
    assets: Collection<VideoAsset>,
}

fn check_owner(asset: &VideoAsset, user_id: &str) -> StoreResult<()> {
    if asset.user_id != user_id {
        return Err(StoreError::permission_denied(format!(
            "asset {} does not belong to the current user",
            asset.id
        )));
    }
    Ok(())
}

impl AssetRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new asset record.
    pub async fn create(&self, asset: VideoAsset) -> StoreResult<AssetId> {
        let id = asset.id.clone();
        debug!("Creating asset {} for user {}", id, asset.user_id);
        self.assets.insert(id.as_str(), asset).await;
        Ok(id)
    }

    /// Get an asset, verifying ownership.
    pub async fn get(&self, user_id: &str, id: &AssetId) -> StoreResult<VideoAsset> {
        let asset = self
            .assets
            .get(id.as_str())
            .await
            .ok_or_else(|| StoreError::not_found(id.as_str()))?;
        check_owner(&asset, user_id)?;
        Ok(asset)
    }

    /// List all assets owned by a user, newest first.
    pub async fn list_for_user(&self, user_id: &str) -> Vec<VideoAsset> {
        let mut assets = self.assets.find(|a| a.user_id == user_id).await;
        assets.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        assets
    }

    /// Patch probed metadata onto an asset.
    pub async fn patch_metadata(
        &self,
        user_id: &str,
        id: &AssetId,
        metadata: VideoMetadata,
    ) -> StoreResult<()> {
        self.assets
            .mutate(id.as_str(), |asset| {
                check_owner(asset, user_id)?;
                asset.metadata = Some(metadata);
                Ok(())
            })
            .await
    }

    /// Update the canvas position of the video node.
    pub async fn patch_position(
        &self,
        user_id: &str,
        id: &AssetId,
        position: CanvasPosition,
    ) -> StoreResult<()> {
        self.assets
            .mutate(id.as_str(), |asset| {
                check_owner(asset, user_id)?;
                asset.position = position;
                Ok(())
            })
            .await
    }

    /// Update the display title.
    pub async fn patch_title(&self, user_id: &str, id: &AssetId, title: String) -> StoreResult<()> {
        self.assets
            .mutate(id.as_str(), |asset| {
                check_owner(asset, user_id)?;
                asset.title = Some(title);
                Ok(())
            })
            .await
    }

    /// Set the human-readable progress label of an in-flight job.
    pub async fn set_progress_label(
        &self,
        user_id: &str,
        id: &AssetId,
        label: impl Into<String>,
    ) -> StoreResult<()> {
        let label = label.into();
        self.assets
            .mutate(id.as_str(), |asset| {
                check_owner(asset, user_id)?;
                asset.progress_label = Some(label);
                Ok(())
            })
            .await
    }

    /// Guarded transition into `processing`.
    ///
    /// Only `idle` or `failed` may enter `processing`. Returns `Ok(true)`
    /// when the caller won the transition and owns the job; `Ok(false)`
    /// when another submission is already in flight (or the transcript is
    /// already complete). The check and the write happen under one lock, so
    /// duplicate submissions cannot race two completions into the record.
    pub async fn try_begin_transcription(&self, user_id: &str, id: &AssetId) -> StoreResult<bool> {
        self.assets
            .mutate(id.as_str(), |asset| {
                check_owner(asset, user_id)?;
                if !asset.transcription_status.can_submit() {
                    debug!(
                        "Rejecting transcription submit for {}: status is {}",
                        id, asset.transcription_status
                    );
                    return Ok(false);
                }
                asset.transcription_status = TranscriptionStatus::Processing;
                asset.transcription_error = None;
                asset.progress_label = Some("Preparing transcription".to_string());
                asset.transcription_started_at = Some(chrono::Utc::now());
                Ok(true)
            })
            .await
    }

    /// Terminal transition: transcription succeeded.
    pub async fn complete_transcription(
        &self,
        user_id: &str,
        id: &AssetId,
        transcript: String,
    ) -> StoreResult<()> {
        self.assets
            .mutate(id.as_str(), |asset| {
                check_owner(asset, user_id)?;
                asset.complete_transcription(transcript);
                asset.transcript_manual = false;
                Ok(())
            })
            .await?;
        info!("Transcription completed for asset {}", id);
        Ok(())
    }

    /// Terminal transition: transcription failed.
    pub async fn fail_transcription(
        &self,
        user_id: &str,
        id: &AssetId,
        error: impl Into<String>,
    ) -> StoreResult<()> {
        self.assets
            .mutate(id.as_str(), |asset| {
                check_owner(asset, user_id)?;
                asset.fail_transcription(error.into());
                Ok(())
            })
            .await
    }

    /// Manual transcript override, bypassing the background job.
    ///
    /// Accepted from any state except `processing` (a paste during an
    /// in-flight job would race the job's own terminal write).
    pub async fn set_manual_transcript(
        &self,
        user_id: &str,
        id: &AssetId,
        transcript: String,
    ) -> StoreResult<()> {
        self.assets
            .mutate(id.as_str(), |asset| {
                check_owner(asset, user_id)?;
                if asset.transcription_status == TranscriptionStatus::Processing {
                    return Err(StoreError::invalid_transition(
                        "a transcription job is in flight; wait for it to finish",
                    ));
                }
                asset.complete_transcription(transcript);
                asset.transcript_manual = true;
                Ok(())
            })
            .await
    }

    /// Force a stuck `processing` record back to `failed` so the user can
    /// resubmit. The caller is responsible for the minimum-age check.
    pub async fn reset_stuck(&self, user_id: &str, id: &AssetId) -> StoreResult<()> {
        self.assets
            .mutate(id.as_str(), |asset| {
                check_owner(asset, user_id)?;
                if asset.transcription_status != TranscriptionStatus::Processing {
                    return Err(StoreError::invalid_transition(
                        "asset is not stuck in processing",
                    ));
                }
                asset.fail_transcription("Transcription was reset by the user");
                Ok(())
            })
            .await
    }

    /// Delete an asset, verifying ownership. Agent cascade happens at the
    /// service layer.
    pub async fn delete(&self, user_id: &str, id: &AssetId) -> StoreResult<VideoAsset> {
        let asset = self.get(user_id, id).await?;
        self.assets.remove(id.as_str()).await;
        Ok(asset)
    }
}
