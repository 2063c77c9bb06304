//! Core ingestion and content-generation pipeline.
//!
//! This crate owns the real state-machine and failure-handling logic:
//! - The transcription scheduler: guarded status transitions, size-tiered
//!   strategy selection, detached background jobs
//! - The generation orchestrator: composite prompt assembly over a shared,
//!   partially-available context
//! - The refinement loop: multi-turn chat with a draft-update marker
//! - The error classifier: ordered first-match-wins message classification
//!   with a recoverability flag per kind

pub mod classify;
pub mod error;
pub mod extractor;
pub mod orchestrator;
pub mod prompt;
pub mod refine;
pub mod scheduler;

pub use classify::{classify, ClassifiedError, ErrorKind};
pub use error::{PipelineError, PipelineResult};
pub use extractor::{AudioArtifact, AudioExtractor, FfmpegAudioExtractor, MockAudioExtractor};
pub use orchestrator::GenerationOrchestrator;
pub use refine::{RefinementEngine, RefinementOutcome};
pub use scheduler::TranscriptionScheduler;
