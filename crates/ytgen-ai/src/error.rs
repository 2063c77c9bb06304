//! AI client error types.

use thiserror::Error;

/// Result type for AI service calls.
pub type AiResult<T> = Result<T, AiError>;

/// Errors that can occur calling external AI services.
#[derive(Debug, Error)]
pub enum AiError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Transcription failed: {0}")]
    TranscriptionFailed(String),

    #[error("Generation failed: {0}")]
    GenerationFailed(String),

    #[error("Image edit failed: {0}")]
    ImageEditFailed(String),

    #[error("Empty response from model")]
    EmptyResponse,

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AiError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn transcription_failed(msg: impl Into<String>) -> Self {
        Self::TranscriptionFailed(msg.into())
    }

    pub fn generation_failed(msg: impl Into<String>) -> Self {
        Self::GenerationFailed(msg.into())
    }

    pub fn image_edit_failed(msg: impl Into<String>) -> Self {
        Self::ImageEditFailed(msg.into())
    }
}
