//! Generation orchestrator.
//!
//! Runs one generation call per agent: gathers the prompt context
//! (transcript, connected peer drafts, channel profile), calls the text
//! model, and commits the result through the guarded status transitions.
//! The `generating` state always exits to `ready` or `error`, including
//! when the model call itself fails.

use std::sync::Arc;
use tracing::{info, warn};

use ytgen_ai::{EditImageRequest, ImageEditor, TextGenRequest, TextGenerator};
use ytgen_models::{Agent, AgentId, ChannelProfile, ConnectedOutput, VideoAsset};
use ytgen_storage::BlobStore;
use ytgen_store::{AgentRepository, AssetRepository, ProfileRepository};

use crate::classify::classify;
use crate::error::{PipelineError, PipelineResult};
use crate::prompt::{
    build_system_prompt, build_user_prompt, GenerationContext, GENERATION_TEMPERATURE,
};

/// Orchestrates generation calls for agents.
#[derive(Clone)]
pub struct GenerationOrchestrator {
    assets: AssetRepository,
    agents: AgentRepository,
    profiles: ProfileRepository,
    textgen: Arc<dyn TextGenerator>,
    image_editor: Arc<dyn ImageEditor>,
    blob: Arc<dyn BlobStore>,
}

impl GenerationOrchestrator {
    pub fn new(
        assets: AssetRepository,
        agents: AgentRepository,
        profiles: ProfileRepository,
        textgen: Arc<dyn TextGenerator>,
        image_editor: Arc<dyn ImageEditor>,
        blob: Arc<dyn BlobStore>,
    ) -> Self {
        Self {
            assets,
            agents,
            profiles,
            textgen,
            image_editor,
            blob,
        }
    }

    /// Generate a fresh draft for an agent.
    ///
    /// Wins the `generating` transition first; a concurrent call on the
    /// same agent is rejected rather than queued. On model failure the
    /// agent lands in `error` with a classified, user-facing message and
    /// its previous draft intact.
    pub async fn generate(&self, user_id: &str, agent_id: &AgentId) -> PipelineResult<Agent> {
        let agent = self.agents.get(user_id, agent_id).await?;
        let won = self.agents.try_begin_generation(user_id, agent_id).await?;
        if !won {
            return Err(PipelineError::AlreadyGenerating);
        }

        let result = self.run_generation(user_id, &agent).await;
        match result {
            Ok(draft) => {
                self.agents
                    .complete_generation(user_id, agent_id, draft)
                    .await?;
                Ok(self.agents.get(user_id, agent_id).await?)
            }
            Err(e) => {
                let classified = classify(&e.to_string());
                warn!(
                    "Generation failed for agent {} ({}): {}",
                    agent_id, classified.kind, classified.detail
                );
                self.agents
                    .fail_generation(user_id, agent_id, classified.message)
                    .await?;
                Err(e)
            }
        }
    }

    async fn run_generation(&self, user_id: &str, agent: &Agent) -> PipelineResult<String> {
        let asset = self.assets.get(user_id, &agent.video_id).await?;
        let peers = self.connected_outputs(user_id, agent).await;
        let profile = self.profiles.get(user_id).await;

        let context = GenerationContext {
            asset: &asset,
            peers: &peers,
            profile: profile.as_ref(),
        };

        let draft = self
            .textgen
            .generate(TextGenRequest {
                system_prompt: build_system_prompt(agent.agent_type),
                user_prompt: build_user_prompt(&context),
                temperature: GENERATION_TEMPERATURE,
                max_output_tokens: agent.agent_type.max_output_tokens(),
            })
            .await?;
        Ok(draft)
    }

    /// Resolve an agent's connections to the non-empty drafts of its peers.
    ///
    /// Dangling connections and ungenerated peers are skipped silently.
    pub async fn connected_outputs(&self, user_id: &str, agent: &Agent) -> Vec<ConnectedOutput> {
        let mut outputs = Vec::new();
        for peer_id in &agent.connections {
            if let Ok(peer) = self.agents.get(user_id, peer_id).await {
                if peer.has_draft() {
                    outputs.push(ConnectedOutput {
                        agent_type: peer.agent_type,
                        content: peer.draft,
                    });
                }
            }
        }
        outputs
    }

    /// Turn a thumbnail agent's draft concept into an image.
    ///
    /// Edits the supplied video frame per the agent's draft, uploads the
    /// result, and stores the key on the agent. Not a status-guarded
    /// operation: the draft is already `ready` and stays so.
    pub async fn generate_thumbnail_image(
        &self,
        user_id: &str,
        agent_id: &AgentId,
        frame: Vec<u8>,
    ) -> PipelineResult<String> {
        let agent = self.agents.get(user_id, agent_id).await?;
        if !agent.has_draft() {
            return Err(PipelineError::EmptyDraft);
        }

        let bytes = self
            .image_editor
            .edit_image(EditImageRequest::new(frame, agent.draft.clone()))
            .await?;

        let key = format!("thumbnails/{}/{}.png", user_id, agent_id);
        self.blob.upload(&key, bytes, "image/png").await?;
        self.agents.set_image(user_id, agent_id, key.clone()).await?;
        info!("Stored thumbnail image for agent {}", agent_id);
        Ok(key)
    }

    /// Load the prompt context for an agent, for use by refinement.
    pub(crate) async fn context_parts(
        &self,
        user_id: &str,
        agent: &Agent,
    ) -> PipelineResult<(VideoAsset, Vec<ConnectedOutput>, Option<ChannelProfile>)> {
        let asset = self.assets.get(user_id, &agent.video_id).await?;
        let peers = self.connected_outputs(user_id, agent).await;
        let profile = self.profiles.get(user_id).await;
        Ok((asset, peers, profile))
    }

    pub(crate) fn agents(&self) -> &AgentRepository {
        &self.agents
    }

    pub(crate) fn textgen(&self) -> &Arc<dyn TextGenerator> {
        &self.textgen
    }
}
