//! Grok (xAI) image generation adapter.

use crate::error::{extract_error_message, MediaGateError, Result};
use crate::generation::{
    GenerationAdapter, GenerationRequest, GenerationResult, ProviderKind, Submission,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

const DEFAULT_BASE_URL: &str = "https://api.x.ai/v1";

/// Maximum images per request.
const MAX_COUNT: u32 = 10;

/// Grok image model variants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GrokImageModel {
    /// grok-2-image.
    #[default]
    Grok2Image,
    /// Grok Imagine, which also accepts an aspect ratio.
    GrokImagine,
}

impl GrokImageModel {
    /// Returns the API model identifier string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Grok2Image => "grok-2-image",
            Self::GrokImagine => "grok-imagine-image",
        }
    }

    fn for_request(request: &GenerationRequest) -> Self {
        match request.model_for(ProviderKind::GrokImage) {
            Some(m) if m.eq_ignore_ascii_case("grok-imagine-image") => Self::GrokImagine,
            _ => Self::Grok2Image,
        }
    }
}

/// Builder for GrokImageProvider.
#[derive(Debug, Clone, Default)]
pub struct GrokImageProviderBuilder {
    api_key: Option<String>,
    base_url: Option<String>,
    client: Option<reqwest::Client>,
}

impl GrokImageProviderBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the API key. Falls back to `XAI_API_KEY` env var.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Overrides the API base URL.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Reuses an existing HTTP client.
    pub fn client(mut self, client: reqwest::Client) -> Self {
        self.client = Some(client);
        self
    }

    /// Builds the provider, resolving the API key.
    pub fn build(self) -> Result<GrokImageProvider> {
        let api_key = self
            .api_key
            .or_else(|| std::env::var("XAI_API_KEY").ok())
            .ok_or_else(|| {
                MediaGateError::Config("XAI_API_KEY not set and no API key provided".into())
            })?;

        Ok(GrokImageProvider {
            client: self.client.unwrap_or_default(),
            api_key,
            base_url: self
                .base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
        })
    }
}

/// Grok image generation adapter (synchronous).
pub struct GrokImageProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl GrokImageProvider {
    /// Creates a new `GrokImageProviderBuilder`.
    pub fn builder() -> GrokImageProviderBuilder {
        GrokImageProviderBuilder::new()
    }

    fn parse_error(&self, status: u16, text: &str) -> MediaGateError {
        MediaGateError::ProviderRequest {
            provider: ProviderKind::GrokImage,
            status,
            message: extract_error_message(text),
        }
    }
}

#[async_trait]
impl GenerationAdapter for GrokImageProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::GrokImage
    }

    async fn submit(&self, request: &GenerationRequest) -> Result<Submission> {
        let body = GrokImageRequest::from_request(request);

        let response = self
            .client
            .post(format!("{}/images/generations", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(self.parse_error(status.as_u16(), &text));
        }

        let grok_response: GrokImageResponse = response.json().await?;
        let results: Vec<GenerationResult> = grok_response
            .data
            .into_iter()
            .filter_map(|image| {
                image.url.map(|url| GenerationResult {
                    url,
                    provider: ProviderKind::GrokImage,
                    model: body.model.clone(),
                    revised_prompt: image.revised_prompt,
                    status: "completed".to_string(),
                })
            })
            .collect();

        if results.is_empty() {
            return Err(MediaGateError::UnexpectedResponse(
                "No image URLs in Grok response".into(),
            ));
        }

        Ok(Submission::Completed(results))
    }
}

// Request/Response types
#[derive(Debug, Serialize)]
struct GrokImageRequest {
    model: String,
    prompt: String,
    n: u32,
    response_format: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    aspect_ratio: Option<String>,
}

impl GrokImageRequest {
    fn from_request(req: &GenerationRequest) -> Self {
        let model = GrokImageModel::for_request(req);
        let aspect_ratio = match model {
            GrokImageModel::GrokImagine => Some(req.aspect_ratio.as_str().to_string()),
            GrokImageModel::Grok2Image => None,
        };

        Self {
            model: model.as_str().to_string(),
            prompt: req.prompt.clone(),
            n: req.count.clamp(1, MAX_COUNT),
            response_format: "url".to_string(),
            aspect_ratio,
        }
    }
}

#[derive(Debug, Deserialize)]
struct GrokImageResponse {
    data: Vec<GrokImageData>,
}

#[derive(Debug, Deserialize)]
struct GrokImageData {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    revised_prompt: Option<String>,
}
