//! Generation agent repository.

use tracing::{debug, info};

use ytgen_models::{Agent, AgentId, AgentStatus, AssetId, CanvasPosition, ChatMessage};

use crate::backend::Collection;
use crate::error::{StoreError, StoreResult};

/// Typed repository for generation agents.
#[derive(Debug, Clone, Default)]
pub struct AgentRepository {
    agents: Collection<Agent>,
}

fn check_owner(agent: &Agent, user_id: &str) -> StoreResult<()> {
    if agent.user_id != user_id {
        return Err(StoreError::permission_denied(format!(
            "agent {} does not belong to the current user",
            agent.id
        )));
    }
    Ok(())
}

impl AgentRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new agent record.
    pub async fn create(&self, agent: Agent) -> StoreResult<AgentId> {
        let id = agent.id.clone();
        debug!(
            "Creating {} agent {} for video {}",
            agent.agent_type, id, agent.video_id
        );
        self.agents.insert(id.as_str(), agent).await;
        Ok(id)
    }

    /// Get an agent, verifying ownership.
    pub async fn get(&self, user_id: &str, id: &AgentId) -> StoreResult<Agent> {
        let agent = self
            .agents
            .get(id.as_str())
            .await
            .ok_or_else(|| StoreError::not_found(id.as_str()))?;
        check_owner(&agent, user_id)?;
        Ok(agent)
    }

    /// All agents bound to a video, oldest first.
    pub async fn list_for_video(&self, user_id: &str, video_id: &AssetId) -> Vec<Agent> {
        let mut agents = self
            .agents
            .find(|a| a.user_id == user_id && &a.video_id == video_id)
            .await;
        agents.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        agents
    }

    /// Replace the agent's peer connections.
    pub async fn connect_peers(
        &self,
        user_id: &str,
        id: &AgentId,
        connections: Vec<AgentId>,
    ) -> StoreResult<()> {
        self.agents
            .mutate(id.as_str(), |agent| {
                check_owner(agent, user_id)?;
                agent.connections = connections;
                Ok(())
            })
            .await
    }

    /// Update the canvas position of the agent node.
    pub async fn patch_position(
        &self,
        user_id: &str,
        id: &AgentId,
        position: CanvasPosition,
    ) -> StoreResult<()> {
        self.agents
            .mutate(id.as_str(), |agent| {
                check_owner(agent, user_id)?;
                agent.position = position;
                Ok(())
            })
            .await
    }

    /// Guarded transition into `generating`.
    ///
    /// Entering `generating` while a call is already in flight is rejected;
    /// returns whether the caller won the transition.
    pub async fn try_begin_generation(&self, user_id: &str, id: &AgentId) -> StoreResult<bool> {
        self.agents
            .mutate(id.as_str(), |agent| {
                check_owner(agent, user_id)?;
                if !agent.status.can_generate() {
                    debug!("Rejecting generation for {}: already generating", id);
                    return Ok(false);
                }
                agent.status = AgentStatus::Generating;
                agent.last_error = None;
                agent.generation_started_at = Some(chrono::Utc::now());
                Ok(true)
            })
            .await
    }

    /// Terminal transition: generation succeeded, persist the new draft.
    pub async fn complete_generation(
        &self,
        user_id: &str,
        id: &AgentId,
        draft: String,
    ) -> StoreResult<()> {
        self.agents
            .mutate(id.as_str(), |agent| {
                check_owner(agent, user_id)?;
                agent.draft = draft;
                agent.status = AgentStatus::Ready;
                agent.last_error = None;
                Ok(())
            })
            .await?;
        info!("Generation completed for agent {}", id);
        Ok(())
    }

    /// Terminal transition: generation failed.
    ///
    /// The prior draft survives a failed attempt; only status and the error
    /// message change.
    pub async fn fail_generation(
        &self,
        user_id: &str,
        id: &AgentId,
        error: impl Into<String>,
    ) -> StoreResult<()> {
        self.agents
            .mutate(id.as_str(), |agent| {
                check_owner(agent, user_id)?;
                agent.status = AgentStatus::Error;
                agent.last_error = Some(error.into());
                Ok(())
            })
            .await
    }

    /// Exit `generating` back to `ready` without touching the draft.
    ///
    /// Used by refinement when the model response carried no draft update.
    pub async fn finish_without_draft_change(&self, user_id: &str, id: &AgentId) -> StoreResult<()> {
        self.agents
            .mutate(id.as_str(), |agent| {
                check_owner(agent, user_id)?;
                agent.status = if agent.has_draft() {
                    AgentStatus::Ready
                } else {
                    AgentStatus::Idle
                };
                Ok(())
            })
            .await
    }

    /// Store the generated thumbnail image key.
    pub async fn set_image(&self, user_id: &str, id: &AgentId, image_key: String) -> StoreResult<()> {
        self.agents
            .mutate(id.as_str(), |agent| {
                check_owner(agent, user_id)?;
                agent.image_key = Some(image_key);
                Ok(())
            })
            .await
    }

    /// Append a user/ai exchange to the chat history atomically.
    ///
    /// Both messages land in one mutation so history can never show the ai
    /// reply before the user message that prompted it.
    pub async fn append_exchange(
        &self,
        user_id: &str,
        id: &AgentId,
        user_message: ChatMessage,
        ai_message: ChatMessage,
    ) -> StoreResult<()> {
        self.agents
            .mutate(id.as_str(), |agent| {
                check_owner(agent, user_id)?;
                agent.chat_history.push(user_message);
                agent.chat_history.push(ai_message);
                Ok(())
            })
            .await
    }

    /// Cascade invalidation: reset every agent of a video after its
    /// transcript changed.
    pub async fn reset_for_transcript_change(
        &self,
        user_id: &str,
        video_id: &AssetId,
    ) -> StoreResult<usize> {
        let agents = self.list_for_video(user_id, video_id).await;
        let count = agents.len();
        for agent in agents {
            self.agents
                .mutate(agent.id.as_str(), |agent| {
                    agent.reset_for_transcript_change();
                    Ok(())
                })
                .await?;
        }
        if count > 0 {
            info!("Reset {} agents for video {} after transcript change", count, video_id);
        }
        Ok(count)
    }

    /// Force a stuck `generating` agent back to `error`.
    pub async fn reset_stuck(&self, user_id: &str, id: &AgentId) -> StoreResult<()> {
        self.agents
            .mutate(id.as_str(), |agent| {
                check_owner(agent, user_id)?;
                if agent.status != AgentStatus::Generating {
                    return Err(StoreError::invalid_transition(
                        "agent is not stuck in generating",
                    ));
                }
                agent.status = AgentStatus::Error;
                agent.last_error = Some("Generation was reset by the user".to_string());
                Ok(())
            })
            .await
    }

    /// Delete one agent, verifying ownership.
    pub async fn delete(&self, user_id: &str, id: &AgentId) -> StoreResult<()> {
        // Ownership check before the delete touches anything
        self.get(user_id, id).await?;
        self.agents.remove(id.as_str()).await;
        Ok(())
    }

    /// Delete all agents of a video (asset-delete cascade).
    pub async fn delete_for_video(&self, user_id: &str, video_id: &AssetId) -> usize {
        self.agents
            .remove_where(|a| a.user_id == user_id && &a.video_id == video_id)
            .await
    }
}
