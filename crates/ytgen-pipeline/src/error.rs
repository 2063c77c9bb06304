//! Pipeline error types.

use thiserror::Error;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Errors that can occur in the ingestion/generation pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("A transcription job is already processing for this video")]
    AlreadyProcessing,

    #[error("A generation call is already in flight for this agent")]
    AlreadyGenerating,

    #[error("File too large: maximum size {max_mb}MB, got {size_mb}MB")]
    SizeExceeded { size_mb: u64, max_mb: u64 },

    #[error("Transcript must not be empty")]
    EmptyTranscript,

    #[error("Agent has no draft to work from; generate one first")]
    EmptyDraft,

    #[error("Refinement instruction must not be empty")]
    EmptyInstruction,

    #[error("Media error: {0}")]
    Media(#[from] ytgen_media::MediaError),

    #[error("Store error: {0}")]
    Store(#[from] ytgen_store::StoreError),

    #[error("Storage error: {0}")]
    Storage(#[from] ytgen_storage::StorageError),

    #[error("AI service error: {0}")]
    Ai(#[from] ytgen_ai::AiError),
}

impl PipelineError {
    /// Check if this wraps a not-found-or-unauthorized store condition.
    pub fn is_access_denied(&self) -> bool {
        matches!(
            self,
            PipelineError::Store(ytgen_store::StoreError::NotFound(_))
                | PipelineError::Store(ytgen_store::StoreError::PermissionDenied(_))
        )
    }
}
