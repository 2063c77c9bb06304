//! Upload handlers.
//!
//! Video bytes never transit the API: the client asks for a presigned PUT
//! URL and uploads straight to object storage, then registers the asset.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct UploadRequest {
    pub file_name: String,
    pub content_type: String,
    pub size_bytes: u64,
}

#[derive(Serialize)]
pub struct UploadResponse {
    pub upload_url: String,
    pub storage_key: String,
    pub expires_in_secs: u64,
}

/// Issue a presigned PUT URL for a direct-to-storage upload.
pub async fn create_upload(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<UploadRequest>,
) -> ApiResult<Json<UploadResponse>> {
    let file_name = sanitize_file_name(&request.file_name);
    if file_name.is_empty() {
        return Err(ApiError::bad_request("file_name must not be empty"));
    }

    // The ceiling is exclusive: a file at exactly the limit is unsupported
    let max_bytes = state.scheduler.planner().max_size_mb * 1024 * 1024;
    if request.size_bytes >= max_bytes {
        return Err(ApiError::bad_request(format!(
            "File too large: maximum size {}MB",
            state.scheduler.planner().max_size_mb
        )));
    }

    let storage_key = format!("uploads/{}/{}/{}", user.uid, Uuid::new_v4(), file_name);
    let upload_url = state
        .blob
        .presign_put(
            &storage_key,
            &request.content_type,
            state.config.presign_expiry,
        )
        .await?;

    Ok(Json(UploadResponse {
        upload_url,
        storage_key,
        expires_in_secs: state.config.presign_expiry.as_secs(),
    }))
}

/// Keep only path-safe characters from a client-supplied file name.
fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("my video (1).mp4"), "myvideo1.mp4");
        assert_eq!(sanitize_file_name("../../etc/passwd"), "......etcpasswd");
        assert_eq!(sanitize_file_name("clip_final-v2.mov"), "clip_final-v2.mov");
    }
}
