//! Luma Dream Machine video generation adapter.

use crate::error::{extract_error_message, MediaGateError, Result};
use crate::generation::{
    GenerationAdapter, GenerationRequest, GenerationResult, PollStatus, ProviderKind, Quality,
    Submission,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

const DEFAULT_BASE_URL: &str = "https://api.lumalabs.ai/dream-machine/v1";

/// Luma video model variants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LumaModel {
    /// Ray 2 Flash - faster, cheaper.
    #[default]
    RayFlash2,
    /// Ray 2 - higher quality.
    Ray2,
}

impl LumaModel {
    /// Returns the API model identifier string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RayFlash2 => "ray-flash-2",
            Self::Ray2 => "ray-2",
        }
    }

    fn for_request(request: &GenerationRequest) -> Self {
        match request.model_for(ProviderKind::Luma) {
            Some(m) if m.eq_ignore_ascii_case("ray-flash-2") => Self::RayFlash2,
            Some(m) if m.eq_ignore_ascii_case("ray-2") => Self::Ray2,
            _ => match request.quality {
                Quality::High => Self::Ray2,
                Quality::Standard => Self::RayFlash2,
            },
        }
    }
}

/// Builder for LumaProvider.
#[derive(Debug, Clone, Default)]
pub struct LumaProviderBuilder {
    api_key: Option<String>,
    base_url: Option<String>,
    client: Option<reqwest::Client>,
}

impl LumaProviderBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the API key. Falls back to `LUMAAI_API_KEY` env var.
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
    pub fn build(self) -> Result<LumaProvider> {
        let api_key = self
            .api_key
            .or_else(|| std::env::var("LUMAAI_API_KEY").ok())
            .ok_or_else(|| {
                MediaGateError::Config("LUMAAI_API_KEY not set and no API key provided".into())
            })?;

        Ok(LumaProvider {
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

/// Luma Dream Machine adapter (asynchronous).
pub struct LumaProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl LumaProvider {
    /// Creates a new `LumaProviderBuilder`.
    pub fn builder() -> LumaProviderBuilder {
        LumaProviderBuilder::new()
    }

    fn parse_error(&self, status: u16, text: &str) -> MediaGateError {
        MediaGateError::ProviderRequest {
            provider: ProviderKind::Luma,
            status,
            message: extract_error_message(text),
        }
    }
}

#[async_trait]
impl GenerationAdapter for LumaProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Luma
    }

    async fn submit(&self, request: &GenerationRequest) -> Result<Submission> {
        let body = LumaRequest::from_request(request);

        let response = self
            .client
            .post(format!("{}/generations", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(self.parse_error(status.as_u16(), &text));
        }

        let generation: LumaGeneration = response.json().await?;
        tracing::debug!(generation_id = %generation.id, model = %body.model, "submitted Luma generation");
        Ok(Submission::Accepted {
            job_id: generation.id,
        })
    }

    async fn poll_status(&self, job_id: &str) -> Result<PollStatus> {
        let response = self
            .client
            .get(format!("{}/generations/{}", self.base_url, job_id))
            .bearer_auth(&self.api_key)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(self.parse_error(status.as_u16(), &text));
        }

        let generation: LumaGeneration = response.json().await?;
        generation.into_poll_status()
    }
}

// Request/Response types

#[derive(Debug, Serialize)]
struct LumaRequest {
    prompt: String,
    model: String,
    aspect_ratio: String,
    /// "5s" or "9s".
    duration: String,
}

impl LumaRequest {
    fn from_request(req: &GenerationRequest) -> Self {
        let duration = if req.duration_secs <= 5 { "5s" } else { "9s" };
        Self {
            prompt: req.prompt.clone(),
            model: LumaModel::for_request(req).as_str().to_string(),
            aspect_ratio: req.aspect_ratio.as_str().to_string(),
            duration: duration.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct LumaGeneration {
    id: String,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    failure_reason: Option<String>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    assets: Option<LumaAssets>,
}

#[derive(Debug, Deserialize)]
struct LumaAssets {
    #[serde(default)]
    video: Option<String>,
}

impl LumaGeneration {
    fn into_poll_status(self) -> Result<PollStatus> {
        let state = self.state.unwrap_or_else(|| "queued".to_string());
        match state.as_str() {
            "completed" => {
                let url = self.assets.and_then(|a| a.video).ok_or_else(|| {
                    MediaGateError::UnexpectedResponse(format!(
                        "Luma generation {} completed without a video asset",
                        self.id
                    ))
                })?;
                Ok(PollStatus::Completed(GenerationResult {
                    url,
                    provider: ProviderKind::Luma,
                    model: self
                        .model
                        .unwrap_or_else(|| LumaModel::default().as_str().to_string()),
                    revised_prompt: None,
                    status: state,
                }))
            }
            "failed" => Ok(PollStatus::Failed(
                self.failure_reason
                    .unwrap_or_else(|| "Unknown error".into()),
            )),
            "queued" | "dreaming" => {
                tracing::debug!(generation_id = %self.id, state = %state, "Luma generation in progress");
                Ok(PollStatus::Running)
            }
            other => Err(MediaGateError::UnexpectedResponse(format!(
                "Luma returned unexpected state: {other}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::AspectRatio;

    #[test]
    fn test_builder_with_explicit_key() {
        let provider = LumaProviderBuilder::new().api_key("luma-test").build();
        assert!(provider.is_ok());
    }

    #[test]
    fn test_duration_clamped() {
        let req = GenerationRequest::video("test").with_duration(4);
        assert_eq!(LumaRequest::from_request(&req).duration, "5s");

        let req = GenerationRequest::video("test").with_duration(20);
        assert_eq!(LumaRequest::from_request(&req).duration, "9s");
    }

    #[test]
    fn test_request_construction() {
        let req = GenerationRequest::video("Ocean waves")
            .with_aspect_ratio(AspectRatio::Portrait)
            .with_quality(Quality::High);
        let luma_req = LumaRequest::from_request(&req);
        assert_eq!(luma_req.prompt, "Ocean waves");
        assert_eq!(luma_req.aspect_ratio, "9:16");
        assert_eq!(luma_req.model, "ray-2");
    }

    #[test]
    fn test_explicit_model_wins() {
        let req = GenerationRequest::video("test")
            .with_quality(Quality::High)
            .with_model("ray-flash-2");
        assert_eq!(LumaModel::for_request(&req), LumaModel::RayFlash2);
    }

    #[test]
    fn test_generation_completed() {
        let json = r#"{"id": "g1", "state": "completed", "model": "ray-2", "assets": {"video": "https://cdn.luma/v.mp4"}}"#;
        let generation: LumaGeneration = serde_json::from_str(json).unwrap();
        match generation.into_poll_status().unwrap() {
            PollStatus::Completed(result) => {
                assert_eq!(result.url, "https://cdn.luma/v.mp4");
                assert_eq!(result.model, "ray-2");
                assert_eq!(result.status, "completed");
            }
            other => panic!("expected completed, got {other:?}"),
        }
    }

    #[test]
    fn test_generation_failed() {
        let json = r#"{"id": "g1", "state": "failed", "failure_reason": "moderation"}"#;
        let generation: LumaGeneration = serde_json::from_str(json).unwrap();
        assert_eq!(
            generation.into_poll_status().unwrap(),
            PollStatus::Failed("moderation".into())
        );
    }

    #[test]
    fn test_generation_dreaming_is_running() {
        let json = r#"{"id": "g1", "state": "dreaming"}"#;
        let generation: LumaGeneration = serde_json::from_str(json).unwrap();
        assert_eq!(generation.into_poll_status().unwrap(), PollStatus::Running);
    }
}
