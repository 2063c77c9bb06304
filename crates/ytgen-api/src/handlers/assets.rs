//! Video asset handlers.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use ytgen_media::{extract_frames, plan_transcription, FrameOptions, MediaProber, TranscriptionPlan};
use ytgen_models::{Agent, AgentType, AssetId, CanvasPosition, TranscriptionStatus, VideoAsset};

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::AppState;

/// Register an uploaded video.
#[derive(Debug, Deserialize)]
pub struct RegisterAssetRequest {
    pub storage_key: String,
    pub file_name: String,
    pub size_bytes: u64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub position: Option<CanvasPosition>,
}

#[derive(Serialize)]
pub struct AssetWithAgents {
    pub asset: VideoAsset,
    pub agents: Vec<Agent>,
}

/// Register an uploaded video and create its four default agents.
pub async fn create_asset(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<RegisterAssetRequest>,
) -> ApiResult<(StatusCode, Json<AssetWithAgents>)> {
    if request.storage_key.is_empty() || request.file_name.is_empty() {
        return Err(ApiError::bad_request("storage_key and file_name are required"));
    }

    let mut asset = VideoAsset::new(
        &user.uid,
        &request.storage_key,
        &request.file_name,
        request.size_bytes,
    );
    asset.title = request.title;
    if let Some(position) = request.position {
        asset.position = position;
    }
    let asset_id = asset.id.clone();
    state.assets.create(asset).await?;

    let mut agents = Vec::with_capacity(4);
    for agent_type in AgentType::all() {
        let agent = Agent::new(&user.uid, asset_id.clone(), agent_type);
        state.agents.create(agent.clone()).await?;
        agents.push(agent);
    }

    info!("Registered asset {} with {} agents", asset_id, agents.len());
    let asset = state.assets.get(&user.uid, &asset_id).await?;
    Ok((StatusCode::CREATED, Json(AssetWithAgents { asset, agents })))
}

/// List the user's assets, newest first.
pub async fn list_assets(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Json<Vec<VideoAsset>>> {
    Ok(Json(state.assets.list_for_user(&user.uid).await))
}

/// Get one asset with its agents.
pub async fn get_asset(
    State(state): State<AppState>,
    user: AuthUser,
    Path(asset_id): Path<AssetId>,
) -> ApiResult<Json<AssetWithAgents>> {
    let asset = state.assets.get(&user.uid, &asset_id).await?;
    let agents = state.agents.list_for_video(&user.uid, &asset_id).await;
    Ok(Json(AssetWithAgents { asset, agents }))
}

#[derive(Serialize)]
pub struct DeleteAssetResponse {
    pub deleted: bool,
    pub agents_deleted: usize,
}

/// Delete an asset, its agents, and its stored file.
pub async fn delete_asset(
    State(state): State<AppState>,
    user: AuthUser,
    Path(asset_id): Path<AssetId>,
) -> ApiResult<Json<DeleteAssetResponse>> {
    let asset = state.assets.delete(&user.uid, &asset_id).await?;
    let agents_deleted = state.agents.delete_for_video(&user.uid, &asset_id).await;

    // Blob removal is best-effort; the record is already gone
    if let Err(e) = state.blob.delete(&asset.storage_key).await {
        warn!("Failed to delete blob {}: {}", asset.storage_key, e);
    }

    info!("Deleted asset {} ({} agents)", asset_id, agents_deleted);
    Ok(Json(DeleteAssetResponse {
        deleted: true,
        agents_deleted,
    }))
}

#[derive(Debug, Deserialize)]
pub struct PositionRequest {
    pub position: CanvasPosition,
}

/// Move the asset node on the canvas.
pub async fn update_asset_position(
    State(state): State<AppState>,
    user: AuthUser,
    Path(asset_id): Path<AssetId>,
    Json(request): Json<PositionRequest>,
) -> ApiResult<StatusCode> {
    state
        .assets
        .patch_position(&user.uid, &asset_id, request.position)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct TitleRequest {
    pub title: String,
}

/// Rename an asset.
pub async fn update_asset_title(
    State(state): State<AppState>,
    user: AuthUser,
    Path(asset_id): Path<AssetId>,
    Json(request): Json<TitleRequest>,
) -> ApiResult<StatusCode> {
    let title = request.title.trim().to_string();
    if title.is_empty() {
        return Err(ApiError::bad_request("title must not be empty"));
    }
    state.assets.patch_title(&user.uid, &asset_id, title).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Serialize)]
pub struct AcceptedResponse {
    pub status: String,
}

/// Start a detached metadata probe for an asset.
///
/// Returns immediately; the probe downloads the file, reads its metadata
/// in two passes, and patches the record when done. Probe failures only
/// log: metadata stays absent rather than blocking the asset.
pub async fn probe_asset(
    State(state): State<AppState>,
    user: AuthUser,
    Path(asset_id): Path<AssetId>,
) -> ApiResult<(StatusCode, Json<AcceptedResponse>)> {
    let asset = state.assets.get(&user.uid, &asset_id).await?;

    let uid = user.uid.clone();
    let task_state = state.clone();
    tokio::spawn(async move {
        if let Err(e) = run_probe(&task_state, &uid, &asset).await {
            warn!("Probe for asset {} failed: {}", asset.id, e);
        }
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(AcceptedResponse {
            status: "probing".to_string(),
        }),
    ))
}

async fn run_probe(state: &AppState, uid: &str, asset: &VideoAsset) -> ApiResult<()> {
    let local = state.blob.download_to_temp(&asset.storage_key).await?;

    let prober = MediaProber::new(state.media.clone());
    let assets = state.assets.clone();
    let (progress_uid, progress_id) = (uid.to_string(), asset.id.clone());
    let result = prober
        .probe(&local, move |progress| {
            let assets = assets.clone();
            let uid = progress_uid.clone();
            let id = progress_id.clone();
            let label = progress.phase.label().to_string();
            tokio::spawn(async move {
                if let Err(e) = assets.set_progress_label(&uid, &id, label).await {
                    error!("Failed to patch probe progress for {}: {}", id, e);
                }
            });
        })
        .await;

    if let Err(e) = tokio::fs::remove_file(&local).await {
        warn!("Failed to remove temp file {}: {}", local.display(), e);
    }

    let outcome = result?;
    state
        .assets
        .patch_metadata(uid, &asset.id, outcome.metadata)
        .await?;
    info!("Probe completed for asset {}", asset.id);
    Ok(())
}

/// Submit a transcription job.
///
/// Responds 202 once the job owns the `processing` state; 409 when a job
/// is already in flight or the transcript is already complete.
pub async fn transcribe_asset(
    State(state): State<AppState>,
    user: AuthUser,
    Path(asset_id): Path<AssetId>,
) -> ApiResult<(StatusCode, Json<AcceptedResponse>)> {
    let asset = state.assets.get(&user.uid, &asset_id).await?;
    let tier = match plan_transcription(asset.size_bytes, state.scheduler.planner()) {
        TranscriptionPlan::Direct => "direct",
        TranscriptionPlan::ExtractAudio => "extract_audio",
        TranscriptionPlan::Unsupported => "unsupported",
    };

    let handle = state.scheduler.submit(&user.uid, &asset_id).await?;
    metrics::record_transcription_started(tier);

    // Clients observe completion through status polls; the server only
    // watches the job to count outcomes.
    let task_state = state.clone();
    let task_user = user.uid.clone();
    let task_asset = asset_id.clone();
    tokio::spawn(async move {
        if handle.await.is_err() {
            metrics::record_transcription_finished(false);
            return;
        }
        let success = matches!(
            task_state.assets.get(&task_user, &task_asset).await,
            Ok(a) if a.transcription_status == TranscriptionStatus::Completed
        );
        metrics::record_transcription_finished(success);
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(AcceptedResponse {
            status: "processing".to_string(),
        }),
    ))
}

#[derive(Debug, Deserialize)]
pub struct ManualTranscriptRequest {
    pub transcript: String,
}

#[derive(Serialize)]
pub struct ManualTranscriptResponse {
    pub accepted: bool,
    pub agents_reset: usize,
}

/// Set a manual transcript; invalidates all dependent agent drafts.
pub async fn set_manual_transcript(
    State(state): State<AppState>,
    user: AuthUser,
    Path(asset_id): Path<AssetId>,
    Json(request): Json<ManualTranscriptRequest>,
) -> ApiResult<Json<ManualTranscriptResponse>> {
    let agents_reset = state
        .scheduler
        .set_manual_transcript(&user.uid, &asset_id, request.transcript)
        .await?;
    Ok(Json(ManualTranscriptResponse {
        accepted: true,
        agents_reset,
    }))
}

#[derive(Serialize)]
pub struct ResetResponse {
    pub status: String,
}

/// Manually recover an asset stuck in `processing`.
///
/// Guarded by a minimum age so a healthy in-flight job cannot be yanked
/// out from under itself the moment it starts.
pub async fn reset_asset(
    State(state): State<AppState>,
    user: AuthUser,
    Path(asset_id): Path<AssetId>,
) -> ApiResult<Json<ResetResponse>> {
    let asset = state.assets.get(&user.uid, &asset_id).await?;

    if let Some(started_at) = asset.transcription_started_at {
        let age = chrono::Utc::now().signed_duration_since(started_at);
        let min_age = chrono::Duration::from_std(state.config.reset_min_age)
            .map_err(|e| ApiError::internal(e.to_string()))?;
        if age < min_age {
            return Err(ApiError::conflict(format!(
                "Job started {}s ago; wait at least {}s before resetting",
                age.num_seconds(),
                min_age.num_seconds()
            )));
        }
    }

    state.assets.reset_stuck(&user.uid, &asset_id).await?;
    info!("Asset {} reset by user", asset_id);
    Ok(Json(ResetResponse {
        status: "failed".to_string(),
    }))
}

#[derive(Serialize)]
pub struct ThumbnailCandidatesResponse {
    /// JPEG data URLs, evenly sampled across the video
    pub frames: Vec<String>,
}

/// Extract candidate frames for thumbnail generation.
pub async fn thumbnail_candidates(
    State(state): State<AppState>,
    user: AuthUser,
    Path(asset_id): Path<AssetId>,
) -> ApiResult<Json<ThumbnailCandidatesResponse>> {
    let asset = state.assets.get(&user.uid, &asset_id).await?;
    let duration = asset
        .metadata
        .as_ref()
        .and_then(|m| m.duration)
        .ok_or_else(|| {
            ApiError::conflict("Asset has no probed duration yet; run a probe first")
        })?;

    let local = state.blob.download_to_temp(&asset.storage_key).await?;
    let result = extract_frames(
        &state.media,
        &local,
        duration,
        &FrameOptions::thumbnail_candidates(),
        |_, _| {},
    )
    .await;

    if let Err(e) = tokio::fs::remove_file(&local).await {
        warn!("Failed to remove temp file {}: {}", local.display(), e);
    }

    Ok(Json(ThumbnailCandidatesResponse { frames: result? }))
}
