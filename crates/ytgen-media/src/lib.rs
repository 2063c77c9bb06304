//! FFmpeg CLI wrapper for the YTGen ingestion pipeline.
//!
//! This crate provides:
//! - Two-pass metadata probing (fast container read + full decode log parse)
//! - Representative frame sampling as data URLs
//! - Audio extraction for the mid-size transcription tier
//! - A dependency-free PCM/WAV compressor for speech uploads
//! - The size-tiered transcription planner

pub mod audio;
pub mod command;
pub mod engine;
pub mod error;
pub mod frames;
pub mod planner;
pub mod probe;
pub mod progress;
pub mod wav;

pub use audio::{extract_audio, ExtractedAudio, TARGET_AUDIO_BITRATE};
pub use command::{FfmpegCommand, FfmpegRunner};
pub use engine::FfmpegEngine;
pub use error::{MediaError, MediaResult};
pub use frames::{extract_frames, sample_fractions, FrameOptions};
pub use planner::{plan_transcription, PlannerConfig, TranscriptionPlan};
pub use probe::{merge_metadata, MediaProber, ProbeOutcome};
pub use progress::{ProbePhase, ProbeProgress};
pub use wav::{compress_pcm, WavOptions};
