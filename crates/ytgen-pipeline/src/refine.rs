//! Chat-based draft refinement.
//!
//! A refinement turn sends the current draft, the chat history, and a new
//! instruction to the model. The model restates the draft under an
//! `UPDATED <TYPE>:` marker only when it changes it; without the marker
//! the existing draft stands. Turns on the same agent are serialized
//! through a per-agent lock on top of the status guard, so two clients
//! typing into the same chat cannot interleave their exchanges.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

use ytgen_ai::TextGenRequest;
use ytgen_models::{AgentId, ChatMessage};

use crate::classify::classify;
use crate::error::{PipelineError, PipelineResult};
use crate::orchestrator::GenerationOrchestrator;
use crate::prompt::{
    build_refinement_prompt, build_system_prompt, parse_draft_update, GenerationContext,
    GENERATION_TEMPERATURE,
};

/// Result of one refinement turn.
#[derive(Debug, Clone)]
pub struct RefinementOutcome {
    /// The model's conversational response
    pub response: String,
    /// The draft after the turn (updated or unchanged)
    pub draft: String,
    /// Whether the response carried a draft update
    pub draft_updated: bool,
}

/// Per-agent serialization for refinement turns.
#[derive(Clone, Default)]
struct AgentLocks {
    locks: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl AgentLocks {
    async fn for_agent(&self, id: &AgentId) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        // An entry whose only holder is the map itself is released;
        // sweeping here keeps the map bounded by in-flight turns.
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        locks
            .entry(id.as_str().to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    #[cfg(test)]
    async fn len(&self) -> usize {
        self.locks.lock().await.len()
    }
}

/// Runs refinement turns against agents.
#[derive(Clone)]
pub struct RefinementEngine {
    orchestrator: GenerationOrchestrator,
    locks: AgentLocks,
}

impl RefinementEngine {
    pub fn new(orchestrator: GenerationOrchestrator) -> Self {
        Self {
            orchestrator,
            locks: AgentLocks::default(),
        }
    }

    /// Run one refinement turn.
    ///
    /// On success the user message and the model response are appended to
    /// the chat history as one exchange, after the draft commit. On model
    /// failure the agent lands in `error` and the chat history is left
    /// untouched, so the history only ever records turns that produced a
    /// response.
    pub async fn refine(
        &self,
        user_id: &str,
        agent_id: &AgentId,
        instruction: &str,
    ) -> PipelineResult<RefinementOutcome> {
        let instruction = instruction.trim();
        if instruction.is_empty() {
            return Err(PipelineError::EmptyInstruction);
        }

        let lock = self.locks.for_agent(agent_id).await;
        let _guard = lock.lock().await;

        let agents = self.orchestrator.agents();
        let agent = agents.get(user_id, agent_id).await?;
        let won = agents.try_begin_generation(user_id, agent_id).await?;
        if !won {
            return Err(PipelineError::AlreadyGenerating);
        }

        let result = self.run_turn(user_id, &agent, instruction).await;
        match result {
            Ok(response) => {
                let update = parse_draft_update(&response, agent.agent_type);
                let draft_updated = update.is_some();
                let draft = match update {
                    Some(new_draft) => {
                        agents
                            .complete_generation(user_id, agent_id, new_draft.clone())
                            .await?;
                        new_draft
                    }
                    None => {
                        agents.finish_without_draft_change(user_id, agent_id).await?;
                        agent.draft.clone()
                    }
                };

                agents
                    .append_exchange(
                        user_id,
                        agent_id,
                        ChatMessage::user(instruction),
                        ChatMessage::ai(&response),
                    )
                    .await?;

                info!(
                    "Refinement turn for agent {} (draft updated: {})",
                    agent_id, draft_updated
                );
                Ok(RefinementOutcome {
                    response,
                    draft,
                    draft_updated,
                })
            }
            Err(e) => {
                let classified = classify(&e.to_string());
                warn!("Refinement failed for agent {}: {}", agent_id, classified.detail);
                agents
                    .fail_generation(user_id, agent_id, classified.message)
                    .await?;
                Err(e)
            }
        }
    }

    async fn run_turn(
        &self,
        user_id: &str,
        agent: &ytgen_models::Agent,
        instruction: &str,
    ) -> PipelineResult<String> {
        let (asset, peers, profile) = self.orchestrator.context_parts(user_id, agent).await?;
        let context = GenerationContext {
            asset: &asset,
            peers: &peers,
            profile: profile.as_ref(),
        };

        let response = self
            .orchestrator
            .textgen()
            .generate(TextGenRequest {
                system_prompt: build_system_prompt(agent.agent_type),
                user_prompt: build_refinement_prompt(agent, &context, instruction),
                temperature: GENERATION_TEMPERATURE,
                max_output_tokens: agent.agent_type.max_output_tokens(),
            })
            .await?;
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ytgen_ai::{AiError, MockImageEditor, MockTextGenerator};
    use ytgen_models::{Agent, AgentStatus, AgentType, ChatRole, VideoAsset};
    use ytgen_storage::MockBlobStore;
    use ytgen_store::{AgentRepository, AssetRepository, ProfileRepository};

    async fn fixture(textgen: MockTextGenerator) -> (RefinementEngine, AgentRepository, AgentId) {
        let assets = AssetRepository::new();
        let agents = AgentRepository::new();

        let mut asset = VideoAsset::new("alice", "videos/a.mp4", "a.mp4", 1024);
        asset.complete_transcription("a transcript");
        let asset_id = asset.id.clone();
        assets.create(asset).await.unwrap();

        let mut agent = Agent::new("alice", asset_id, AgentType::Title);
        agent.draft = "Original Title".to_string();
        agent.status = AgentStatus::Ready;
        let agent_id = agent.id.clone();
        agents.create(agent).await.unwrap();

        let orchestrator = GenerationOrchestrator::new(
            assets,
            agents.clone(),
            ProfileRepository::new(),
            Arc::new(textgen),
            Arc::new(MockImageEditor::new()),
            Arc::new(MockBlobStore::new()),
        );
        (RefinementEngine::new(orchestrator), agents, agent_id)
    }

    #[tokio::test]
    async fn test_marker_updates_draft_and_appends_exchange() {
        let mut textgen = MockTextGenerator::new();
        textgen
            .expect_generate()
            .withf(|req| {
                req.user_prompt.contains("Current TITLE:\nOriginal Title")
                    && req.user_prompt.contains("User request: make it shorter")
            })
            .returning(|_| Ok("Done!\n\nUPDATED TITLE: Short Title".to_string()));

        let (engine, agents, agent_id) = fixture(textgen).await;
        let outcome = engine
            .refine("alice", &agent_id, "make it shorter")
            .await
            .unwrap();

        assert!(outcome.draft_updated);
        assert_eq!(outcome.draft, "Short Title");

        let stored = agents.get("alice", &agent_id).await.unwrap();
        assert_eq!(stored.draft, "Short Title");
        assert_eq!(stored.status, AgentStatus::Ready);
        assert_eq!(stored.chat_history.len(), 2);
        assert_eq!(stored.chat_history[0].role, ChatRole::User);
        assert_eq!(stored.chat_history[0].message, "make it shorter");
        assert_eq!(stored.chat_history[1].role, ChatRole::Ai);
    }

    #[tokio::test]
    async fn test_no_marker_leaves_draft_unchanged() {
        let mut textgen = MockTextGenerator::new();
        textgen
            .expect_generate()
            .returning(|_| Ok("The current title is already concise.".to_string()));

        let (engine, agents, agent_id) = fixture(textgen).await;
        let outcome = engine
            .refine("alice", &agent_id, "is it short enough?")
            .await
            .unwrap();

        assert!(!outcome.draft_updated);
        assert_eq!(outcome.draft, "Original Title");

        let stored = agents.get("alice", &agent_id).await.unwrap();
        assert_eq!(stored.draft, "Original Title");
        assert_eq!(stored.status, AgentStatus::Ready);
        // The conversational turn still lands in the history
        assert_eq!(stored.chat_history.len(), 2);
    }

    #[tokio::test]
    async fn test_failure_skips_chat_append() {
        let mut textgen = MockTextGenerator::new();
        textgen
            .expect_generate()
            .returning(|_| Err(AiError::generation_failed("model overloaded")));

        let (engine, agents, agent_id) = fixture(textgen).await;
        let result = engine.refine("alice", &agent_id, "improve it").await;
        assert!(result.is_err());

        let stored = agents.get("alice", &agent_id).await.unwrap();
        assert_eq!(stored.status, AgentStatus::Error);
        assert_eq!(stored.draft, "Original Title");
        assert!(stored.chat_history.is_empty());
    }

    #[tokio::test]
    async fn test_empty_instruction_rejected() {
        let (engine, agents, agent_id) = fixture(MockTextGenerator::new()).await;
        let result = engine.refine("alice", &agent_id, "   ").await;
        assert!(matches!(result, Err(PipelineError::EmptyInstruction)));

        // Nothing touched
        let stored = agents.get("alice", &agent_id).await.unwrap();
        assert_eq!(stored.status, AgentStatus::Ready);
    }

    #[tokio::test]
    async fn test_concurrent_turn_rejected() {
        let (engine, agents, agent_id) = fixture(MockTextGenerator::new()).await;
        agents.try_begin_generation("alice", &agent_id).await.unwrap();

        let result = engine.refine("alice", &agent_id, "improve it").await;
        assert!(matches!(result, Err(PipelineError::AlreadyGenerating)));
    }

    #[tokio::test]
    async fn test_released_locks_are_evicted() {
        let locks = AgentLocks::default();
        let held = locks.for_agent(&AgentId::new()).await;
        drop(locks.for_agent(&AgentId::new()).await);
        assert_eq!(locks.len().await, 2);

        // The next acquisition sweeps the released entry; the held one stays
        let _third = locks.for_agent(&AgentId::new()).await;
        assert_eq!(locks.len().await, 2);
        drop(held);
    }

    #[tokio::test]
    async fn test_sequential_turns_accumulate_history() {
        let mut textgen = MockTextGenerator::new();
        let mut turn = 0;
        textgen.expect_generate().returning_st(move |_| {
            turn += 1;
            if turn == 1 {
                Ok("UPDATED TITLE: Second Title".to_string())
            } else {
                Ok("Keeping it as is.".to_string())
            }
        });

        let (engine, agents, agent_id) = fixture(textgen).await;
        engine.refine("alice", &agent_id, "punchier").await.unwrap();
        engine.refine("alice", &agent_id, "thoughts?").await.unwrap();

        let stored = agents.get("alice", &agent_id).await.unwrap();
        assert_eq!(stored.draft, "Second Title");
        assert_eq!(stored.chat_history.len(), 4);
        let roles: Vec<ChatRole> = stored.chat_history.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![ChatRole::User, ChatRole::Ai, ChatRole::User, ChatRole::Ai]
        );
    }
}
