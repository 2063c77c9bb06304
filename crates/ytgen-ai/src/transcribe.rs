//! Speech transcription client (Whisper-style multipart API).

use reqwest::multipart;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{AiError, AiResult};

const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/audio/transcriptions";
const DEFAULT_MODEL: &str = "whisper-1";

/// Transcription service seam.
#[mockall::automock]
#[async_trait::async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe audio or video bytes; returns the transcript text.
    async fn transcribe(
        &self,
        bytes: Vec<u8>,
        file_name: String,
        mime_type: String,
    ) -> AiResult<String>;
}

/// Whisper-compatible transcription client.
pub struct WhisperClient {
    api_key: String,
    endpoint: String,
    model: String,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
}

impl WhisperClient {
    /// Create a new client from the `OPENAI_API_KEY` environment variable.
    pub fn from_env() -> AiResult<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| AiError::config("OPENAI_API_KEY not set"))?;
        let endpoint = std::env::var("TRANSCRIPTION_ENDPOINT")
            .unwrap_or_else(|_| DEFAULT_ENDPOINT.to_string());
        let model = std::env::var("TRANSCRIPTION_MODEL")
            .unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        Ok(Self::new(api_key, endpoint, model))
    }

    pub fn new(
        api_key: impl Into<String>,
        endpoint: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(600))
            .build()
            .expect("reqwest client");
        Self {
            api_key: api_key.into(),
            endpoint: endpoint.into(),
            model: model.into(),
            client,
        }
    }
}

#[async_trait::async_trait]
impl Transcriber for WhisperClient {
    async fn transcribe(
        &self,
        bytes: Vec<u8>,
        file_name: String,
        mime_type: String,
    ) -> AiResult<String> {
        debug!(
            "Uploading {} bytes ({}) for transcription",
            bytes.len(),
            mime_type
        );

        let part = multipart::Part::bytes(bytes)
            .file_name(file_name)
            .mime_str(&mime_type)
            .map_err(|e| AiError::transcription_failed(format!("invalid mime type: {e}")))?;

        let form = multipart::Form::new()
            .text("model", self.model.clone())
            .part("file", part);

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(AiError::transcription_failed(format!(
                "transcription service returned {}: {}",
                status, text
            )));
        }

        let parsed: TranscriptionResponse = response.json().await?;
        let text = parsed.text.trim().to_string();
        if text.is_empty() {
            return Err(AiError::transcription_failed(
                "transcription service returned an empty transcript",
            ));
        }

        info!("Transcription returned {} chars", text.len());
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> WhisperClient {
        WhisperClient::new("test-key", format!("{}/transcribe", server.uri()), "whisper-1")
    }

    #[tokio::test]
    async fn test_transcribe_returns_trimmed_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/transcribe"))
            .and(header_exists("authorization"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"text": "  hello world  "})),
            )
            .mount(&server)
            .await;

        let text = client_for(&server)
            .transcribe(b"audio".to_vec(), "a.m4a".to_string(), "audio/mp4".to_string())
            .await
            .unwrap();
        assert_eq!(text, "hello world");
    }

    #[tokio::test]
    async fn test_transcribe_rejects_empty_transcript() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"text": "   "})),
            )
            .mount(&server)
            .await;

        let err = client_for(&server)
            .transcribe(b"audio".to_vec(), "a.m4a".to_string(), "audio/mp4".to_string())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("empty transcript"));
    }

    #[tokio::test]
    async fn test_transcribe_surfaces_service_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(413).set_body_string(
                "Maximum content size limit exceeded: 25 MB",
            ))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .transcribe(b"audio".to_vec(), "a.m4a".to_string(), "audio/mp4".to_string())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("413"));
    }
}
