//! Application state.

use std::sync::Arc;

use ytgen_ai::{GeminiClient, ImageEditClient, WhisperClient};
use ytgen_media::{FfmpegEngine, PlannerConfig};
use ytgen_pipeline::{
    FfmpegAudioExtractor, GenerationOrchestrator, RefinementEngine, TranscriptionScheduler,
};
use ytgen_storage::{BlobStore, R2Client};
use ytgen_store::{AgentRepository, AssetRepository, ProfileRepository};

use crate::auth::JwksCache;
use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub assets: AssetRepository,
    pub agents: AgentRepository,
    pub profiles: ProfileRepository,
    pub blob: Arc<dyn BlobStore>,
    pub media: FfmpegEngine,
    pub scheduler: TranscriptionScheduler,
    pub orchestrator: GenerationOrchestrator,
    pub refiner: RefinementEngine,
    pub jwks: Arc<JwksCache>,
}

impl AppState {
    /// Create new application state, wiring real service clients.
    pub async fn new(config: ApiConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let blob: Arc<dyn BlobStore> = Arc::new(R2Client::from_env().await?);
        let media = FfmpegEngine::acquire()?;

        let assets = AssetRepository::new();
        let agents = AgentRepository::new();
        let profiles = ProfileRepository::new();

        let transcriber = Arc::new(WhisperClient::from_env()?);
        let textgen = Arc::new(GeminiClient::from_env()?);
        let image_editor = Arc::new(ImageEditClient::from_env()?);
        let extractor = Arc::new(FfmpegAudioExtractor::new(media.clone()));

        let scheduler = TranscriptionScheduler::new(
            assets.clone(),
            agents.clone(),
            Arc::clone(&blob),
            transcriber,
            extractor,
            PlannerConfig::from_env(),
        );

        let orchestrator = GenerationOrchestrator::new(
            assets.clone(),
            agents.clone(),
            profiles.clone(),
            textgen,
            image_editor,
            Arc::clone(&blob),
        );
        let refiner = RefinementEngine::new(orchestrator.clone());

        let jwks = Arc::new(JwksCache::new().await?);

        Ok(Self {
            config,
            assets,
            agents,
            profiles,
            blob,
            media,
            scheduler,
            orchestrator,
            refiner,
            jwks,
        })
    }
}
