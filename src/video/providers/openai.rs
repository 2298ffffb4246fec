//! Sora (OpenAI) video generation adapter.

use crate::error::{extract_error_message, MediaGateError, Result};
use crate::generation::{
    AspectRatio, GenerationAdapter, GenerationRequest, GenerationResult, PollStatus,
    ProviderKind, Quality, Submission,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Sora model variants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SoraModel {
    /// Sora 2 - OpenAI's video generation model.
    #[default]
    Sora2,
    /// Sora 2 Pro - higher fidelity, slower.
    Sora2Pro,
}

impl SoraModel {
    /// Returns the API model identifier string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sora2 => "sora-2",
            Self::Sora2Pro => "sora-2-pro",
        }
    }

    /// Picks the model for a request: an explicit model wins over quality.
    fn for_request(request: &GenerationRequest) -> Self {
        match request.model_for(ProviderKind::Sora) {
            Some(m) if m.eq_ignore_ascii_case("sora-2-pro") => Self::Sora2Pro,
            Some(_) => Self::Sora2,
            None => match request.quality {
                Quality::High => Self::Sora2Pro,
                Quality::Standard => Self::Sora2,
            },
        }
    }
}

/// Builder for SoraProvider.
#[derive(Debug, Clone, Default)]
pub struct SoraProviderBuilder {
    api_key: Option<String>,
    base_url: Option<String>,
    client: Option<reqwest::Client>,
}

impl SoraProviderBuilder {
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
    pub fn build(self) -> Result<SoraProvider> {
        let api_key = self
            .api_key
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .ok_or_else(|| {
                MediaGateError::Config("OPENAI_API_KEY not set and no API key provided".into())
            })?;

        Ok(SoraProvider {
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

/// Sora video generation adapter (asynchronous).
pub struct SoraProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl SoraProvider {
    /// Creates a new `SoraProviderBuilder`.
    pub fn builder() -> SoraProviderBuilder {
        SoraProviderBuilder::new()
    }

    fn videos_url(&self) -> String {
        format!("{}/videos", self.base_url)
    }

    fn parse_error(&self, status: u16, text: &str) -> MediaGateError {
        MediaGateError::ProviderRequest {
            provider: ProviderKind::Sora,
            status,
            message: extract_error_message(text),
        }
    }
}

#[async_trait]
impl GenerationAdapter for SoraProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Sora
    }

    async fn submit(&self, request: &GenerationRequest) -> Result<Submission> {
        let body = SoraRequest::from_request(request);

        let response = self
            .client
            .post(self.videos_url())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(self.parse_error(status.as_u16(), &text));
        }

        let submit_response: SoraSubmitResponse = response.json().await?;
        tracing::debug!(
            video_id = %submit_response.id,
            model = %body.model,
            "submitted Sora video generation request"
        );
        Ok(Submission::Accepted {
            job_id: submit_response.id,
        })
    }

    async fn poll_status(&self, job_id: &str) -> Result<PollStatus> {
        let url = format!("{}/{}", self.videos_url(), job_id);

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(self.parse_error(status.as_u16(), &text));
        }

        let poll_response: SoraPollResponse = response.json().await?;

        match poll_response.status.as_str() {
            "completed" => Ok(PollStatus::Completed(GenerationResult {
                url: format!("{url}/content"),
                provider: ProviderKind::Sora,
                model: poll_response
                    .model
                    .unwrap_or_else(|| SoraModel::default().as_str().to_string()),
                revised_prompt: None,
                status: poll_response.status,
            })),
            "failed" => {
                let reason = poll_response
                    .failure_reason
                    .or_else(|| poll_response.error.and_then(|e| e.message))
                    .unwrap_or_else(|| "Unknown error".into());
                Ok(PollStatus::Failed(reason))
            }
            "queued" | "in_progress" => {
                tracing::debug!(
                    video_id = %job_id,
                    status = %poll_response.status,
                    progress = poll_response.progress,
                    "Sora video still generating"
                );
                Ok(PollStatus::Running)
            }
            other => Err(MediaGateError::UnexpectedResponse(format!(
                "Sora returned unexpected status: {other}"
            ))),
        }
    }
}

// Request/Response types

#[derive(Debug, Serialize)]
struct SoraRequest {
    model: String,
    prompt: String,
    size: String,
    /// Video duration: "4", "8", or "12" seconds.
    seconds: String,
}

impl SoraRequest {
    /// Valid Sora duration values in seconds.
    const VALID_DURATIONS: [u32; 3] = [4, 8, 12];

    fn from_request(req: &GenerationRequest) -> Self {
        let size = match req.aspect_ratio {
            AspectRatio::Square => "1024x1024",
            ar if ar.is_portrait() => "720x1280",
            _ => "1280x720",
        };

        // Clamp to the longest clip, then snap to the nearest valid value
        let max = Self::VALID_DURATIONS[Self::VALID_DURATIONS.len() - 1];
        let clamped = req.duration_secs.min(max);
        let seconds = Self::VALID_DURATIONS
            .iter()
            .min_by_key(|&&v| (v as i64 - clamped as i64).unsigned_abs())
            .copied()
            .unwrap_or(4);

        Self {
            model: SoraModel::for_request(req).as_str().to_string(),
            prompt: req.prompt.clone(),
            size: size.to_string(),
            seconds: seconds.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SoraSubmitResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct SoraPollResponse {
    status: String,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    progress: Option<u32>,
    #[serde(default)]
    failure_reason: Option<String>,
    #[serde(default)]
    error: Option<SoraError>,
}

#[derive(Debug, Deserialize)]
struct SoraError {
    #[serde(default)]
    message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sora_model_as_str() {
        assert_eq!(SoraModel::Sora2.as_str(), "sora-2");
        assert_eq!(SoraModel::Sora2Pro.as_str(), "sora-2-pro");
    }

    #[test]
    fn test_builder_with_explicit_key() {
        let provider = SoraProviderBuilder::new().api_key("sk-test").build();
        assert!(provider.is_ok());
    }

    #[test]
    fn test_builder_trims_base_url() {
        let provider = SoraProviderBuilder::new()
            .api_key("sk-test")
            .base_url("http://localhost:9000/v1/")
            .build()
            .unwrap();
        assert_eq!(provider.videos_url(), "http://localhost:9000/v1/videos");
    }

    #[test]
    fn test_model_selection() {
        let req = GenerationRequest::video("test");
        assert_eq!(SoraModel::for_request(&req), SoraModel::Sora2);

        let req = GenerationRequest::video("test").with_quality(Quality::High);
        assert_eq!(SoraModel::for_request(&req), SoraModel::Sora2Pro);

        // An explicit model beats the quality hint
        let req = GenerationRequest::video("test")
            .with_quality(Quality::High)
            .with_model("sora-2");
        assert_eq!(SoraModel::for_request(&req), SoraModel::Sora2);
    }

    #[test]
    fn test_request_duration_rounds_to_nearest() {
        // 5 is closer to 4 than to 8
        let req = GenerationRequest::video("test").with_duration(5);
        assert_eq!(SoraRequest::from_request(&req).seconds, "4");

        // 7 is closer to 8 than to 4
        let req = GenerationRequest::video("test").with_duration(7);
        assert_eq!(SoraRequest::from_request(&req).seconds, "8");

        // 10 is equidistant from 8 and 12; min_by_key picks first (8)
        let req = GenerationRequest::video("test").with_duration(10);
        assert_eq!(SoraRequest::from_request(&req).seconds, "8");
    }

    #[test]
    fn test_request_duration_clamps_long_clips() {
        let req = GenerationRequest::video("test").with_duration(60);
        assert_eq!(SoraRequest::from_request(&req).seconds, "12");
    }

    #[test]
    fn test_request_size_mapping() {
        let req = GenerationRequest::video("test");
        assert_eq!(SoraRequest::from_request(&req).size, "1280x720");

        let req = GenerationRequest::video("test").with_aspect_ratio(AspectRatio::Portrait);
        assert_eq!(SoraRequest::from_request(&req).size, "720x1280");

        let req = GenerationRequest::video("test").with_aspect_ratio(AspectRatio::Square);
        assert_eq!(SoraRequest::from_request(&req).size, "1024x1024");
    }

    #[test]
    fn test_poll_response_failed() {
        let json = r#"{"status": "failed", "failure_reason": "Content policy violation"}"#;
        let resp: SoraPollResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.status, "failed");
        assert_eq!(
            resp.failure_reason.as_deref(),
            Some("Content policy violation")
        );
    }

    #[test]
    fn test_poll_response_in_progress() {
        let json = r#"{"id": "video_1", "status": "in_progress", "progress": 42, "model": "sora-2"}"#;
        let resp: SoraPollResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.status, "in_progress");
        assert_eq!(resp.progress, Some(42));
        assert_eq!(resp.model.as_deref(), Some("sora-2"));
    }
}
