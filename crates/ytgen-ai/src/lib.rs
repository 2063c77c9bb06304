//! External AI service clients.
//!
//! This crate provides call-and-await clients for:
//! - Speech transcription (multipart file upload)
//! - Text generation (system prompt + user prompt or chat messages)
//! - Image editing (single source image + prompt)
//!
//! Each service sits behind a trait so the pipeline can be tested with
//! mocks.

pub mod error;
pub mod imagegen;
pub mod textgen;
pub mod transcribe;

pub use error::{AiError, AiResult};
pub use imagegen::{EditImageRequest, ImageEditClient, ImageEditor, MockImageEditor};
pub use textgen::{GeminiClient, MockTextGenerator, TextGenRequest, TextGenerator};
pub use transcribe::{MockTranscriber, Transcriber, WhisperClient};
