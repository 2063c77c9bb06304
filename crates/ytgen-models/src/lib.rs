//! Shared data models for the YTGen backend.
//!
//! This crate provides Serde-serializable types for:
//! - Video assets and their probed metadata
//! - Transcription status lifecycle
//! - Generation agents (title/description/thumbnail/tweets) and chat history
//! - Channel profiles used as generation context

pub mod agent;
pub mod asset;
pub mod profile;

// Re-export common types
pub use agent::{
    Agent, AgentId, AgentStatus, AgentType, ChatMessage, ChatRole, ConnectedOutput,
};
pub use asset::{
    AssetId, AudioMetadata, CanvasPosition, TranscriptionStatus, VideoAsset, VideoMetadata,
};
pub use profile::ChannelProfile;
