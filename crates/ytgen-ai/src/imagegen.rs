//! Image edit client for thumbnail generation.
//!
//! Takes a single source frame plus a prompt and returns an edited image
//! as base64. The provider API mirrors OpenAI's images/edits endpoint.

use reqwest::multipart;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

use base64::Engine as _;

use crate::error::{AiError, AiResult};

const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/images/edits";
const DEFAULT_MODEL: &str = "gpt-image-1";
const DEFAULT_SIZE: &str = "1536x1024";

/// An image edit request.
#[derive(Debug, Clone)]
pub struct EditImageRequest {
    /// Model to use
    pub model: String,
    /// Source image bytes (single image only)
    pub source_image: Vec<u8>,
    /// Edit prompt
    pub prompt: String,
    /// Output size, e.g. "1536x1024"
    pub size: String,
}

impl EditImageRequest {
    pub fn new(source_image: Vec<u8>, prompt: impl Into<String>) -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            source_image,
            prompt: prompt.into(),
            size: DEFAULT_SIZE.to_string(),
        }
    }
}

/// Image edit service seam.
#[mockall::automock]
#[async_trait::async_trait]
pub trait ImageEditor: Send + Sync {
    /// Edit an image; returns the result as raw bytes.
    async fn edit_image(&self, request: EditImageRequest) -> AiResult<Vec<u8>>;
}

/// Image edit API client.
pub struct ImageEditClient {
    api_key: String,
    endpoint: String,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct ImageResponse {
    data: Vec<ImageDatum>,
}

#[derive(Debug, Deserialize)]
struct ImageDatum {
    b64_json: Option<String>,
}

impl ImageEditClient {
    /// Create a new client from the `OPENAI_API_KEY` environment variable.
    pub fn from_env() -> AiResult<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| AiError::config("OPENAI_API_KEY not set"))?;
        let endpoint = std::env::var("IMAGE_EDIT_ENDPOINT")
            .unwrap_or_else(|_| DEFAULT_ENDPOINT.to_string());
        Ok(Self::new(api_key, endpoint))
    }

    pub fn new(api_key: impl Into<String>, endpoint: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .expect("reqwest client");
        Self {
            api_key: api_key.into(),
            endpoint: endpoint.into(),
            client,
        }
    }
}

#[async_trait::async_trait]
impl ImageEditor for ImageEditClient {
    async fn edit_image(&self, request: EditImageRequest) -> AiResult<Vec<u8>> {
        debug!(
            "Editing image ({} bytes) with model {}",
            request.source_image.len(),
            request.model
        );

        let part = multipart::Part::bytes(request.source_image)
            .file_name("frame.jpg")
            .mime_str("image/jpeg")
            .map_err(|e| AiError::image_edit_failed(format!("invalid source image: {e}")))?;

        let form = multipart::Form::new()
            .text("model", request.model)
            .text("prompt", request.prompt)
            .text("size", request.size)
            .part("image", part);

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
            return Err(AiError::image_edit_failed(format!(
                "image service returned {}: {}",
                status, text
            )));
        }

        let parsed: ImageResponse = response.json().await?;
        let b64 = parsed
            .data
            .into_iter()
            .next()
            .and_then(|d| d.b64_json)
            .ok_or(AiError::EmptyResponse)?;

        let bytes = base64::engine::general_purpose::STANDARD
            .decode(b64.as_bytes())
            .map_err(|e| AiError::image_edit_failed(format!("invalid base64 payload: {e}")))?;

        info!("Image edit returned {} bytes", bytes.len());
        Ok(bytes)
    }
}
