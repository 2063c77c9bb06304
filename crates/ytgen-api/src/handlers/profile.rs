//! Channel profile handlers.

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;

use ytgen_models::ChannelProfile;

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Get the caller's channel profile.
pub async fn get_profile(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Json<ChannelProfile>> {
    Ok(Json(state.profiles.require(&user.uid).await?))
}

#[derive(Debug, Deserialize)]
pub struct ProfileRequest {
    pub channel_name: String,
    pub content_type: String,
    pub niche: String,
    #[serde(default)]
    pub tone: Option<String>,
    #[serde(default)]
    pub target_audience: Option<String>,
}

/// Create or replace the caller's channel profile.
pub async fn put_profile(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<ProfileRequest>,
) -> ApiResult<Json<ChannelProfile>> {
    if request.channel_name.trim().is_empty() {
        return Err(ApiError::bad_request("channel_name must not be empty"));
    }

    let profile = ChannelProfile {
        user_id: user.uid.clone(),
        channel_name: request.channel_name,
        content_type: request.content_type,
        niche: request.niche,
        tone: request.tone,
        target_audience: request.target_audience,
        updated_at: Utc::now(),
    };
    state.profiles.upsert(profile.clone()).await?;
    Ok(Json(profile))
}
