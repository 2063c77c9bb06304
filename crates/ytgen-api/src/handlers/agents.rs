//! Generation agent handlers.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::info;

use ytgen_models::{Agent, AgentId, AgentType, AssetId, CanvasPosition, ChatMessage};

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::handlers::assets::PositionRequest;
use crate::metrics;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateAgentRequest {
    pub video_id: AssetId,
    pub agent_type: AgentType,
    #[serde(default)]
    pub position: Option<CanvasPosition>,
}

/// Create an additional agent for a video.
pub async fn create_agent(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<CreateAgentRequest>,
) -> ApiResult<(StatusCode, Json<Agent>)> {
    // The video must exist and belong to the caller
    state.assets.get(&user.uid, &request.video_id).await?;

    let mut agent = Agent::new(&user.uid, request.video_id, request.agent_type);
    if let Some(position) = request.position {
        agent.position = position;
    }
    state.agents.create(agent.clone()).await?;
    Ok((StatusCode::CREATED, Json(agent)))
}

/// Get one agent.
pub async fn get_agent(
    State(state): State<AppState>,
    user: AuthUser,
    Path(agent_id): Path<AgentId>,
) -> ApiResult<Json<Agent>> {
    Ok(Json(state.agents.get(&user.uid, &agent_id).await?))
}

/// Delete one agent.
pub async fn delete_agent(
    State(state): State<AppState>,
    user: AuthUser,
    Path(agent_id): Path<AgentId>,
) -> ApiResult<StatusCode> {
    state.agents.delete(&user.uid, &agent_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Move the agent node on the canvas.
pub async fn update_agent_position(
    State(state): State<AppState>,
    user: AuthUser,
    Path(agent_id): Path<AgentId>,
    Json(request): Json<PositionRequest>,
) -> ApiResult<StatusCode> {
    state
        .agents
        .patch_position(&user.uid, &agent_id, request.position)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct ConnectionsRequest {
    pub connections: Vec<AgentId>,
}

/// Replace the agent's peer connections.
///
/// Connections are validated to exist, belong to the caller, and sit on
/// the same video; self-connections are rejected.
pub async fn update_agent_connections(
    State(state): State<AppState>,
    user: AuthUser,
    Path(agent_id): Path<AgentId>,
    Json(request): Json<ConnectionsRequest>,
) -> ApiResult<StatusCode> {
    let agent = state.agents.get(&user.uid, &agent_id).await?;

    for peer_id in &request.connections {
        if peer_id == &agent_id {
            return Err(ApiError::bad_request("an agent cannot connect to itself"));
        }
        let peer = state.agents.get(&user.uid, peer_id).await?;
        if peer.video_id != agent.video_id {
            return Err(ApiError::bad_request(
                "connections must stay within one video",
            ));
        }
    }

    state
        .agents
        .connect_peers(&user.uid, &agent_id, request.connections)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Generate a fresh draft for an agent.
pub async fn generate(
    State(state): State<AppState>,
    user: AuthUser,
    Path(agent_id): Path<AgentId>,
) -> ApiResult<Json<Agent>> {
    let start = Instant::now();
    let result = state.orchestrator.generate(&user.uid, &agent_id).await;
    let duration = start.elapsed().as_secs_f64();

    match result {
        Ok(agent) => {
            metrics::record_generation(agent.agent_type.as_str(), true, duration);
            Ok(Json(agent))
        }
        Err(e) => {
            // The agent is already in `error` with a classified message;
            // tell the metrics which type failed when we still can.
            if let Ok(agent) = state.agents.get(&user.uid, &agent_id).await {
                metrics::record_generation(agent.agent_type.as_str(), false, duration);
            }
            Err(e.into())
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RefineRequest {
    pub message: String,
}

#[derive(Serialize)]
pub struct RefineResponse {
    pub response: String,
    pub draft: String,
    pub draft_updated: bool,
}

/// Run one chat refinement turn against an agent.
pub async fn refine(
    State(state): State<AppState>,
    user: AuthUser,
    Path(agent_id): Path<AgentId>,
    Json(request): Json<RefineRequest>,
) -> ApiResult<Json<RefineResponse>> {
    let outcome = state
        .refiner
        .refine(&user.uid, &agent_id, &request.message)
        .await?;

    if let Ok(agent) = state.agents.get(&user.uid, &agent_id).await {
        metrics::record_refinement(agent.agent_type.as_str(), outcome.draft_updated);
    }

    Ok(Json(RefineResponse {
        response: outcome.response,
        draft: outcome.draft,
        draft_updated: outcome.draft_updated,
    }))
}

#[derive(Debug, Deserialize)]
pub struct ThumbnailImageRequest {
    /// Source frame as a data URL or bare base64 JPEG
    pub frame: String,
}

#[derive(Serialize)]
pub struct ThumbnailImageResponse {
    pub image_key: String,
    pub image_url: String,
}

/// Turn a thumbnail agent's draft concept into an image.
pub async fn generate_thumbnail_image(
    State(state): State<AppState>,
    user: AuthUser,
    Path(agent_id): Path<AgentId>,
    Json(request): Json<ThumbnailImageRequest>,
) -> ApiResult<Json<ThumbnailImageResponse>> {
    let frame = decode_frame(&request.frame)?;
    let image_key = state
        .orchestrator
        .generate_thumbnail_image(&user.uid, &agent_id, frame)
        .await?;

    let image_url = state
        .blob
        .presign_get(&image_key, state.config.presign_expiry)
        .await?;
    info!("Generated thumbnail image for agent {}", agent_id);
    Ok(Json(ThumbnailImageResponse {
        image_key,
        image_url,
    }))
}

#[derive(Serialize)]
pub struct ChatResponse {
    pub messages: Vec<ChatMessage>,
}

/// Get an agent's chat history, oldest first.
pub async fn get_chat(
    State(state): State<AppState>,
    user: AuthUser,
    Path(agent_id): Path<AgentId>,
) -> ApiResult<Json<ChatResponse>> {
    let agent = state.agents.get(&user.uid, &agent_id).await?;
    Ok(Json(ChatResponse {
        messages: agent.chat_history,
    }))
}

#[derive(Serialize)]
pub struct AgentResetResponse {
    pub status: String,
}

/// Manually recover an agent stuck in `generating`.
pub async fn reset_agent(
    State(state): State<AppState>,
    user: AuthUser,
    Path(agent_id): Path<AgentId>,
) -> ApiResult<Json<AgentResetResponse>> {
    let agent = state.agents.get(&user.uid, &agent_id).await?;

    if let Some(started_at) = agent.generation_started_at {
        let age = chrono::Utc::now().signed_duration_since(started_at);
        let min_age = chrono::Duration::from_std(state.config.reset_min_age)
            .map_err(|e| ApiError::internal(e.to_string()))?;
        if age < min_age {
            return Err(ApiError::conflict(format!(
                "Generation started {}s ago; wait at least {}s before resetting",
                age.num_seconds(),
                min_age.num_seconds()
            )));
        }
    }

    state.agents.reset_stuck(&user.uid, &agent_id).await?;
    info!("Agent {} reset by user", agent_id);
    Ok(Json(AgentResetResponse {
        status: "error".to_string(),
    }))
}

/// Decode a data URL or bare base64 payload into bytes.
fn decode_frame(frame: &str) -> ApiResult<Vec<u8>> {
    let payload = frame
        .split_once("base64,")
        .map(|(_, rest)| rest)
        .unwrap_or(frame);
    base64::engine::general_purpose::STANDARD
        .decode(payload.trim())
        .map_err(|e| ApiError::bad_request(format!("invalid frame payload: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_frame_data_url() {
        let encoded = base64::engine::general_purpose::STANDARD.encode(b"jpeg bytes");
        let data_url = format!("data:image/jpeg;base64,{encoded}");
        assert_eq!(decode_frame(&data_url).unwrap(), b"jpeg bytes");
        assert_eq!(decode_frame(&encoded).unwrap(), b"jpeg bytes");
    }

    #[test]
    fn test_decode_frame_rejects_garbage() {
        assert!(decode_frame("!!not base64!!").is_err());
    }
}
