//! Channel profile model.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Per-user channel metadata, read-only to the pipeline.
///
/// Supplies generation context: missing optional fields are omitted from
/// prompts, never rendered as empty placeholders.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ChannelProfile {
    /// Owning user
    pub user_id: String,
    /// Channel name
    pub channel_name: String,
    /// Kind of content the channel produces (e.g. "tutorials")
    pub content_type: String,
    /// Channel niche (e.g. "rust programming")
    pub niche: String,
    /// Optional tone of voice
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tone: Option<String>,
    /// Optional target audience
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_audience: Option<String>,
    /// When the profile was last updated
    pub updated_at: DateTime<Utc>,
}

impl ChannelProfile {
    pub fn new(
        user_id: impl Into<String>,
        channel_name: impl Into<String>,
        content_type: impl Into<String>,
        niche: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            channel_name: channel_name.into(),
            content_type: content_type.into(),
            niche: niche.into(),
            tone: None,
            target_audience: None,
            updated_at: Utc::now(),
        }
    }
}
