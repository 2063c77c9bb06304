//! Text generation client (Gemini REST API).

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{AiError, AiResult};

const DEFAULT_MODEL: &str = "gemini-2.0-flash";
const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// A text generation request.
#[derive(Debug, Clone)]
pub struct TextGenRequest {
    /// System instruction framing the task
    pub system_prompt: String,
    /// User prompt (already assembled; chat history is rendered into it)
    pub user_prompt: String,
    /// Sampling temperature
    pub temperature: f64,
    /// Output length cap in tokens
    pub max_output_tokens: u32,
}

/// Text generation service seam.
#[mockall::automock]
#[async_trait::async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate text for a request; returns the raw model output.
    async fn generate(&self, request: TextGenRequest) -> AiResult<String>;
}

/// Gemini API client.
pub struct GeminiClient {
    api_key: String,
    base_url: String,
    model: String,
    client: Client,
}

#[derive(Debug, Serialize)]
struct GeminiRequest {
    #[serde(rename = "systemInstruction")]
    system_instruction: Content,
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f64,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: ResponseContent,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

impl GeminiClient {
    /// Create a new client from the `GEMINI_API_KEY` environment variable.
    pub fn from_env() -> AiResult<Self> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .map_err(|_| AiError::config("GEMINI_API_KEY not set"))?;
        let model =
            std::env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        let base_url =
            std::env::var("GEMINI_API_BASE").unwrap_or_else(|_| API_BASE.to_string());
        Ok(Self::new(api_key, base_url, model))
    }

    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.into(),
            model: model.into(),
            client: Client::new(),
        }
    }
}

#[async_trait::async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, request: TextGenRequest) -> AiResult<String> {
        let url = format!(
            "{}/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );

        let body = GeminiRequest {
            system_instruction: Content {
                parts: vec![Part {
                    text: request.system_prompt,
                }],
            },
            contents: vec![Content {
                parts: vec![Part {
                    text: request.user_prompt,
                }],
            }],
            generation_config: GenerationConfig {
                temperature: request.temperature,
                max_output_tokens: request.max_output_tokens,
            },
        };

        debug!("Calling Gemini model {}", self.model);
        let response = self.client.post(&url).json(&body).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(AiError::generation_failed(format!(
                "Gemini returned {}: {}",
                status, text
            )));
        }

        let parsed: GeminiResponse = response.json().await?;
        let text = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .and_then(|p| p.text)
            .ok_or(AiError::EmptyResponse)?;

        let text = text.trim().to_string();
        if text.is_empty() {
            return Err(AiError::EmptyResponse);
        }

        info!("Gemini returned {} chars", text.len());
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request() -> TextGenRequest {
        TextGenRequest {
            system_prompt: "You write titles".to_string(),
            user_prompt: "Video about lifetimes".to_string(),
            temperature: 0.7,
            max_output_tokens: 300,
        }
    }

    #[tokio::test]
    async fn test_generate_parses_first_candidate() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/gemini-2.0-flash:generateContent"))
            .and(body_partial_json(serde_json::json!({
                "generationConfig": {"temperature": 0.7, "maxOutputTokens": 300}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [
                    {"content": {"parts": [{"text": "  Lifetimes Explained  "}]}}
                ]
            })))
            .mount(&server)
            .await;

        let client = GeminiClient::new("test-key", server.uri(), "gemini-2.0-flash");
        let text = client.generate(request()).await.unwrap();
        assert_eq!(text, "Lifetimes Explained");
    }

    #[tokio::test]
    async fn test_generate_surfaces_api_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limit exceeded"))
            .mount(&server)
            .await;

        let client = GeminiClient::new("test-key", server.uri(), "gemini-2.0-flash");
        let err = client.generate(request()).await.unwrap_err();
        assert!(err.to_string().contains("429"));
        assert!(err.to_string().contains("rate limit exceeded"));
    }

    #[tokio::test]
    async fn test_generate_rejects_empty_candidates() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"candidates": []})),
            )
            .mount(&server)
            .await;

        let client = GeminiClient::new("test-key", server.uri(), "gemini-2.0-flash");
        let err = client.generate(request()).await.unwrap_err();
        assert!(matches!(err, AiError::EmptyResponse));
    }
}
