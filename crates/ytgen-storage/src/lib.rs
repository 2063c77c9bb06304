//! Cloudflare R2 binary storage.
//!
//! This crate provides:
//! - Uploaded video and generated image storage
//! - Download to bytes or temp file for the transcription pipeline
//! - Presigned GET/PUT URL generation (uploads never transit the API)

pub mod client;
pub mod error;

pub use client::{BlobStore, MockBlobStore, R2Client, R2Config};
pub use error::{StorageError, StorageResult};
