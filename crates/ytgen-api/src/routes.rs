//! API routes.

use axum::middleware;
use axum::routing::{delete, get, patch, post, put};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::limit::RequestBodyLimitLayer;

use crate::handlers::agents::{
    create_agent, delete_agent, generate, generate_thumbnail_image, get_agent, get_chat, refine,
    reset_agent, update_agent_connections, update_agent_position,
};
use crate::handlers::assets::{
    create_asset, delete_asset, get_asset, list_assets, probe_asset, reset_asset,
    set_manual_transcript, thumbnail_candidates, transcribe_asset, update_asset_position,
    update_asset_title,
};
use crate::handlers::profile::{get_profile, put_profile};
use crate::handlers::uploads::create_upload;
use crate::handlers::{health, ready};
use crate::metrics::metrics_middleware;
use crate::middleware::{
    cors_layer, rate_limit_middleware, request_id, request_logging, security_headers,
    RateLimiterCache,
};
use crate::state::AppState;

/// Create the API router.
pub fn create_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let asset_routes = Router::new()
        .route("/assets", post(create_asset))
        .route("/assets", get(list_assets))
        .route("/assets/:asset_id", get(get_asset))
        .route("/assets/:asset_id", delete(delete_asset))
        .route("/assets/:asset_id/position", patch(update_asset_position))
        .route("/assets/:asset_id/title", patch(update_asset_title))
        .route("/assets/:asset_id/probe", post(probe_asset))
        .route("/assets/:asset_id/transcribe", post(transcribe_asset))
        .route("/assets/:asset_id/transcript", post(set_manual_transcript))
        .route("/assets/:asset_id/reset", post(reset_asset))
        .route("/assets/:asset_id/thumbnails", get(thumbnail_candidates));

    let agent_routes = Router::new()
        .route("/agents", post(create_agent))
        .route("/agents/:agent_id", get(get_agent))
        .route("/agents/:agent_id", delete(delete_agent))
        .route("/agents/:agent_id/position", patch(update_agent_position))
        .route("/agents/:agent_id/connections", post(update_agent_connections))
        .route("/agents/:agent_id/generate", post(generate))
        .route("/agents/:agent_id/refine", post(refine))
        .route("/agents/:agent_id/image", post(generate_thumbnail_image))
        .route("/agents/:agent_id/chat", get(get_chat))
        .route("/agents/:agent_id/reset", post(reset_agent));

    let profile_routes = Router::new()
        .route("/profile", get(get_profile))
        .route("/profile", put(put_profile));

    let upload_routes = Router::new().route("/uploads", post(create_upload));

    let rate_limiter = std::sync::Arc::new(RateLimiterCache::new(state.config.rate_limit_rps));

    let api_routes = Router::new()
        .merge(asset_routes)
        .merge(agent_routes)
        .merge(profile_routes)
        .merge(upload_routes)
        .layer(middleware::from_fn_with_state(
            rate_limiter,
            rate_limit_middleware,
        ));

    let health_routes = Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready));

    let metrics_routes = if let Some(handle) = metrics_handle {
        Router::new().route("/metrics", get(move || async move { handle.render() }))
    } else {
        Router::new()
    };

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .merge(metrics_routes)
        // Body size limit: JSON payloads only, uploads go straight to storage
        .layer(RequestBodyLimitLayer::new(state.config.max_body_size))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(security_headers))
        .layer(middleware::from_fn(request_id))
        .layer(middleware::from_fn(request_logging))
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}
