//! OpenAI DALL-E image generation adapter.

use crate::error::{extract_error_message, MediaGateError, Result};
use crate::generation::{
    AspectRatio, GenerationAdapter, GenerationRequest, GenerationResult, ProviderKind, Quality,
    Submission,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// DALL-E model variants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DallEModel {
    /// DALL-E 3 - high quality, one image per request.
    #[default]
    DallE3,
    /// DALL-E 2 - supports several images per request.
    DallE2,
}

impl DallEModel {
    /// Returns the API model identifier string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DallE3 => "dall-e-3",
            Self::DallE2 => "dall-e-2",
        }
    }

    /// Maximum images per request.
    fn max_count(&self) -> u32 {
        match self {
            Self::DallE3 => 1,
            Self::DallE2 => 10,
        }
    }

    fn for_request(request: &GenerationRequest) -> Self {
        match request.model_for(ProviderKind::DallE) {
            Some(m) if m.eq_ignore_ascii_case("dall-e-2") => Self::DallE2,
            _ => Self::DallE3,
        }
    }
}

/// Builder for DallEProvider.
#[derive(Debug, Clone, Default)]
pub struct DallEProviderBuilder {
    api_key: Option<String>,
    base_url: Option<String>,
    client: Option<reqwest::Client>,
}

impl DallEProviderBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the API key. Falls back to `OPENAI_API_KEY` env var.
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
    pub fn build(self) -> Result<DallEProvider> {
        let api_key = self
            .api_key
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .ok_or_else(|| {
                MediaGateError::Config("OPENAI_API_KEY not set and no API key provided".into())
            })?;

        Ok(DallEProvider {
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

/// DALL-E image generation adapter (synchronous).
pub struct DallEProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl DallEProvider {
    /// Creates a new `DallEProviderBuilder`.
    pub fn builder() -> DallEProviderBuilder {
        DallEProviderBuilder::new()
    }

    /// Maps an explicit size or the aspect ratio to a DALL-E size string.
    fn resolve_size(request: &GenerationRequest, model: DallEModel) -> String {
        if let Some(size) = &request.size {
            return size.clone();
        }

        let size = match model {
            DallEModel::DallE3 => match request.aspect_ratio {
                AspectRatio::Square => "1024x1024",
                ar if ar.is_portrait() => "1024x1792",
                _ => "1792x1024",
            },
            // DALL-E 2 only renders squares
            DallEModel::DallE2 => "1024x1024",
        };
        size.to_string()
    }

    fn parse_error(&self, status: u16, text: &str) -> MediaGateError {
        MediaGateError::ProviderRequest {
            provider: ProviderKind::DallE,
            status,
            message: extract_error_message(text),
        }
    }
}

#[async_trait]
impl GenerationAdapter for DallEProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::DallE
    }

    async fn submit(&self, request: &GenerationRequest) -> Result<Submission> {
        let body = DallERequest::from_request(request);

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

        let dalle_response: DallEResponse = response.json().await?;
        let results: Vec<GenerationResult> = dalle_response
            .data
            .into_iter()
            .filter_map(|image| {
                image.url.map(|url| GenerationResult {
                    url,
                    provider: ProviderKind::DallE,
                    model: body.model.clone(),
                    revised_prompt: image.revised_prompt,
                    status: "completed".to_string(),
                })
            })
            .collect();

        if results.is_empty() {
            return Err(MediaGateError::UnexpectedResponse(
                "No image URLs in DALL-E response".into(),
            ));
        }

        Ok(Submission::Completed(results))
    }
}

#[derive(Debug, Serialize)]
struct DallERequest {
    model: String,
    prompt: String,
    n: u32,
    size: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    quality: Option<String>,
    response_format: String,
}

impl DallERequest {
    fn from_request(req: &GenerationRequest) -> Self {
        let model = DallEModel::for_request(req);
        let quality = match (model, req.quality) {
            (DallEModel::DallE3, Quality::High) => Some("hd".to_string()),
            (DallEModel::DallE3, Quality::Standard) => Some("standard".to_string()),
            (DallEModel::DallE2, _) => None,
        };

        Self {
            model: model.as_str().to_string(),
            prompt: req.prompt.clone(),
            n: req.count.clamp(1, model.max_count()),
            size: DallEProvider::resolve_size(req, model),
            quality,
            response_format: "url".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct DallEResponse {
    data: Vec<DallEImageData>,
}

#[derive(Debug, Deserialize)]
struct DallEImageData {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    revised_prompt: Option<String>,
}
