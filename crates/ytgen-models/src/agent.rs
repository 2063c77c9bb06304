//! Generation agent models.
//!
//! An agent is one generation unit bound to a video: it owns a draft, an
//! ordered chat history, and logical connections to peer agents whose
//! drafts feed its prompts.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::asset::{AssetId, CanvasPosition};

/// Unique identifier for an agent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct AgentId(pub String);

impl AgentId {
    /// Generate a new random agent ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for AgentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for AgentId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for AgentId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Content type an agent generates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum AgentType {
    Title,
    Description,
    Thumbnail,
    Tweets,
}

impl AgentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentType::Title => "title",
            AgentType::Description => "description",
            AgentType::Thumbnail => "thumbnail",
            AgentType::Tweets => "tweets",
        }
    }

    /// Human-readable label used in prompts and refinement markers.
    pub fn label(&self) -> &'static str {
        match self {
            AgentType::Title => "TITLE",
            AgentType::Description => "DESCRIPTION",
            AgentType::Thumbnail => "THUMBNAIL",
            AgentType::Tweets => "TWEETS",
        }
    }

    /// Output token budget per content type.
    ///
    /// Descriptions are structurally longer than the other types, so their
    /// budget is higher.
    pub fn max_output_tokens(&self) -> u32 {
        match self {
            AgentType::Description => 500,
            _ => 300,
        }
    }

    /// All four default agents created alongside a video.
    pub fn all() -> [AgentType; 4] {
        [
            AgentType::Title,
            AgentType::Description,
            AgentType::Thumbnail,
            AgentType::Tweets,
        ]
    }
}

impl fmt::Display for AgentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Generation lifecycle status for an agent.
///
/// `generating` is transient: every generation/refinement call must exit to
/// exactly one of `ready` or `error`, including on thrown errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    /// No draft yet, or draft invalidated by a transcript change
    #[default]
    Idle,
    /// A generation or refinement call is in flight
    Generating,
    /// Draft is up to date
    Ready,
    /// The last generation attempt failed
    Error,
}

impl AgentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentStatus::Idle => "idle",
            AgentStatus::Generating => "generating",
            AgentStatus::Ready => "ready",
            AgentStatus::Error => "error",
        }
    }

    /// Whether a generation call may begin from this state.
    pub fn can_generate(&self) -> bool {
        !matches!(self, AgentStatus::Generating)
    }
}

impl fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Role of a chat message author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    User,
    Ai,
}

/// One entry in an agent's append-only chat history.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn user(message: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            message: message.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn ai(message: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Ai,
            message: message.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Ephemeral projection of a peer agent's draft, built at call time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectedOutput {
    pub agent_type: AgentType,
    pub content: String,
}

/// One generation unit bound to a video asset.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Agent {
    /// Unique agent ID
    pub id: AgentId,
    /// Owning user
    pub user_id: String,
    /// Video this agent belongs to
    pub video_id: AssetId,
    /// Content type
    pub agent_type: AgentType,
    /// Current draft; empty string means ungenerated
    #[serde(default)]
    pub draft: String,
    /// Storage key of a generated thumbnail image, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_key: Option<String>,
    /// Peer agents whose drafts feed this agent's prompt
    #[serde(default)]
    pub connections: Vec<AgentId>,
    /// Append-only, time-ordered chat history
    #[serde(default)]
    pub chat_history: Vec<ChatMessage>,
    /// Current status
    pub status: AgentStatus,
    /// Error message from the last failed generation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    /// When the current/last generation call entered `generating`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_started_at: Option<DateTime<Utc>>,
    /// Canvas position of the agent node
    pub position: CanvasPosition,
    /// When the agent was created
    pub created_at: DateTime<Utc>,
}

impl Agent {
    /// Create a new agent for a video.
    pub fn new(user_id: impl Into<String>, video_id: AssetId, agent_type: AgentType) -> Self {
        Self {
            id: AgentId::new(),
            user_id: user_id.into(),
            video_id,
            agent_type,
            draft: String::new(),
            image_key: None,
            connections: Vec::new(),
            chat_history: Vec::new(),
            status: AgentStatus::Idle,
            last_error: None,
            generation_started_at: None,
            position: CanvasPosition::default(),
            created_at: Utc::now(),
        }
    }

    /// Whether this agent has a usable draft.
    pub fn has_draft(&self) -> bool {
        !self.draft.is_empty()
    }

    /// Reset the agent after its source transcript changed.
    ///
    /// The stale draft is discarded and the agent returns to `idle` so the
    /// user regenerates against the new transcript. Chat history is kept.
    pub fn reset_for_transcript_change(&mut self) {
        self.draft.clear();
        self.image_key = None;
        self.status = AgentStatus::Idle;
        self.last_error = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_budgets() {
        assert_eq!(AgentType::Description.max_output_tokens(), 500);
        assert_eq!(AgentType::Title.max_output_tokens(), 300);
        assert_eq!(AgentType::Thumbnail.max_output_tokens(), 300);
        assert_eq!(AgentType::Tweets.max_output_tokens(), 300);
    }

    #[test]
    fn test_generating_guard() {
        assert!(AgentStatus::Idle.can_generate());
        assert!(AgentStatus::Ready.can_generate());
        assert!(AgentStatus::Error.can_generate());
        assert!(!AgentStatus::Generating.can_generate());
    }

    #[test]
    fn test_reset_for_transcript_change() {
        let mut agent = Agent::new("user-1", AssetId::new(), AgentType::Title);
        agent.draft = "My Great Video".to_string();
        agent.status = AgentStatus::Ready;
        agent.chat_history.push(ChatMessage::user("make it punchier"));

        agent.reset_for_transcript_change();
        assert_eq!(agent.draft, "");
        assert_eq!(agent.status, AgentStatus::Idle);
        // Chat history survives the reset
        assert_eq!(agent.chat_history.len(), 1);
    }
}
