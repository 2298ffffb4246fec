//! Runway (Gen-3 Alpha Turbo / Gen-4 Turbo) video generation adapter.

use crate::error::{extract_error_message, MediaGateError, Result};
use crate::generation::{
    AspectRatio, GenerationAdapter, GenerationRequest, GenerationResult, PollStatus,
    ProviderKind, Quality, Submission,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

const DEFAULT_BASE_URL: &str = "https://api.dev.runwayml.com/v1";

/// Runway API version header value.
const API_VERSION: &str = "2024-11-06";

/// Runway video model variants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RunwayModel {
    /// Gen-3 Alpha Turbo.
    #[default]
    Gen3aTurbo,
    /// Gen-4 Turbo.
    Gen4Turbo,
}

impl RunwayModel {
    /// Returns the API model identifier string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gen3aTurbo => "gen3a_turbo",
            Self::Gen4Turbo => "gen4_turbo",
        }
    }

    fn for_request(request: &GenerationRequest) -> Self {
        match request.model_for(ProviderKind::Runway) {
            Some(m) if m.eq_ignore_ascii_case("gen4_turbo") => Self::Gen4Turbo,
            Some(_) => Self::Gen3aTurbo,
            None => match request.quality {
                Quality::High => Self::Gen4Turbo,
                Quality::Standard => Self::Gen3aTurbo,
            },
        }
    }

    /// Maps an aspect ratio to this model's pixel ratio string.
    fn ratio(&self, aspect_ratio: AspectRatio) -> &'static str {
        match self {
            Self::Gen3aTurbo => {
                if aspect_ratio.is_portrait() {
                    "768:1280"
                } else {
                    "1280:768"
                }
            }
            Self::Gen4Turbo => match aspect_ratio {
                AspectRatio::Landscape => "1280:720",
                AspectRatio::Portrait => "720:1280",
                AspectRatio::Square => "960:960",
                AspectRatio::Standard => "1104:832",
                AspectRatio::StandardPortrait => "832:1104",
                AspectRatio::Ultrawide => "1584:672",
            },
        }
    }
}

/// Builder for RunwayProvider.
#[derive(Debug, Clone, Default)]
pub struct RunwayProviderBuilder {
    api_key: Option<String>,
    base_url: Option<String>,
    client: Option<reqwest::Client>,
}

impl RunwayProviderBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the API secret. Falls back to `RUNWAYML_API_SECRET` env var.
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

    /// Builds the provider, resolving the API secret.
    pub fn build(self) -> Result<RunwayProvider> {
        let api_key = self
            .api_key
            .or_else(|| std::env::var("RUNWAYML_API_SECRET").ok())
            .ok_or_else(|| {
                MediaGateError::Config(
                    "RUNWAYML_API_SECRET not set and no API key provided".into(),
                )
            })?;

        Ok(RunwayProvider {
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

/// Runway video generation adapter (asynchronous task queue).
pub struct RunwayProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl RunwayProvider {
    /// Creates a new `RunwayProviderBuilder`.
    pub fn builder() -> RunwayProviderBuilder {
        RunwayProviderBuilder::new()
    }

    fn parse_error(&self, status: u16, text: &str) -> MediaGateError {
        MediaGateError::ProviderRequest {
            provider: ProviderKind::Runway,
            status,
            message: extract_error_message(text),
        }
    }
}

#[async_trait]
impl GenerationAdapter for RunwayProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Runway
    }

    async fn submit(&self, request: &GenerationRequest) -> Result<Submission> {
        let body = RunwayRequest::from_request(request);

        let response = self
            .client
            .post(format!("{}/text_to_video", self.base_url))
            .bearer_auth(&self.api_key)
            .header("X-Runway-Version", API_VERSION)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(self.parse_error(status.as_u16(), &text));
        }

        let task: RunwayTaskCreated = response.json().await?;
        tracing::debug!(task_id = %task.id, model = %body.model, "submitted Runway task");
        Ok(Submission::Accepted { job_id: task.id })
    }

    async fn poll_status(&self, job_id: &str) -> Result<PollStatus> {
        let response = self
            .client
            .get(format!("{}/tasks/{}", self.base_url, job_id))
            .bearer_auth(&self.api_key)
            .header("X-Runway-Version", API_VERSION)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(self.parse_error(status.as_u16(), &text));
        }

        let task: RunwayTask = response.json().await?;
        task.into_poll_status()
    }
}

// Request/Response types

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RunwayRequest {
    model: String,
    prompt_text: String,
    ratio: String,
    duration: u32,
}

impl RunwayRequest {
    fn from_request(req: &GenerationRequest) -> Self {
        let model = RunwayModel::for_request(req);
        // Runway renders 5 or 10 second clips only
        let duration = if req.duration_secs <= 5 { 5 } else { 10 };

        Self {
            model: model.as_str().to_string(),
            prompt_text: req.prompt.clone(),
            ratio: model.ratio(req.aspect_ratio).to_string(),
            duration,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RunwayTaskCreated {
    id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RunwayTask {
    id: String,
    status: String,
    #[serde(default)]
    output: Vec<String>,
    #[serde(default)]
    failure: Option<String>,
    #[serde(default)]
    failure_code: Option<String>,
}

impl RunwayTask {
    fn into_poll_status(self) -> Result<PollStatus> {
        match self.status.as_str() {
            "SUCCEEDED" => {
                let url = self.output.into_iter().next().ok_or_else(|| {
                    MediaGateError::UnexpectedResponse(format!(
                        "Runway task {} succeeded without output",
                        self.id
                    ))
                })?;
                Ok(PollStatus::Completed(GenerationResult {
                    url,
                    provider: ProviderKind::Runway,
                    model: ProviderKind::Runway.as_str().to_string(),
                    revised_prompt: None,
                    status: self.status,
                }))
            }
            "FAILED" | "CANCELLED" => {
                let reason = match (self.failure, self.failure_code) {
                    (Some(msg), Some(code)) => format!("{msg} ({code})"),
                    (Some(msg), None) => msg,
                    (None, Some(code)) => code,
                    (None, None) => format!("task {}", self.status.to_lowercase()),
                };
                Ok(PollStatus::Failed(reason))
            }
            "PENDING" | "THROTTLED" | "RUNNING" => {
                tracing::debug!(task_id = %self.id, status = %self.status, "Runway task in progress");
                Ok(PollStatus::Running)
            }
            other => Err(MediaGateError::UnexpectedResponse(format!(
                "Runway returned unexpected status: {other}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_with_explicit_key() {
        let provider = RunwayProviderBuilder::new().api_key("key_test").build();
        assert!(provider.is_ok());
    }

    #[test]
    fn test_model_selection() {
        let req = GenerationRequest::video("test").with_model("runway-gen3");
        assert_eq!(RunwayModel::for_request(&req), RunwayModel::Gen3aTurbo);

        let req = GenerationRequest::video("test").with_model("gen4_turbo");
        assert_eq!(RunwayModel::for_request(&req), RunwayModel::Gen4Turbo);

        let req = GenerationRequest::video("test").with_quality(Quality::High);
        assert_eq!(RunwayModel::for_request(&req), RunwayModel::Gen4Turbo);
    }

    #[test]
    fn test_duration_clamped_to_supported_values() {
        let req = GenerationRequest::video("test").with_duration(3);
        assert_eq!(RunwayRequest::from_request(&req).duration, 5);

        let req = GenerationRequest::video("test").with_duration(8);
        assert_eq!(RunwayRequest::from_request(&req).duration, 10);

        let req = GenerationRequest::video("test").with_duration(30);
        assert_eq!(RunwayRequest::from_request(&req).duration, 10);
    }

    #[test]
    fn test_ratio_mapping() {
        let req = GenerationRequest::video("test").with_aspect_ratio(AspectRatio::Portrait);
        assert_eq!(RunwayRequest::from_request(&req).ratio, "768:1280");

        let req = GenerationRequest::video("test")
            .with_quality(Quality::High)
            .with_aspect_ratio(AspectRatio::Square);
        assert_eq!(RunwayRequest::from_request(&req).ratio, "960:960");
    }

    #[test]
    fn test_request_serializes_camel_case() {
        let req = GenerationRequest::video("A drone shot");
        let json = serde_json::to_value(RunwayRequest::from_request(&req)).unwrap();
        assert_eq!(json["promptText"], "A drone shot");
        assert_eq!(json["model"], "gen3a_turbo");
        assert_eq!(json["ratio"], "1280:768");
        assert_eq!(json["duration"], 5);
    }

    #[test]
    fn test_task_succeeded() {
        let json = r#"{"id": "t1", "status": "SUCCEEDED", "output": ["https://cdn.runway/v.mp4"]}"#;
        let task: RunwayTask = serde_json::from_str(json).unwrap();
        match task.into_poll_status().unwrap() {
            PollStatus::Completed(result) => {
                assert_eq!(result.url, "https://cdn.runway/v.mp4");
                assert_eq!(result.provider, ProviderKind::Runway);
            }
            other => panic!("expected completed, got {other:?}"),
        }
    }

    #[test]
    fn test_task_succeeded_without_output_is_error() {
        let json = r#"{"id": "t1", "status": "SUCCEEDED", "output": []}"#;
        let task: RunwayTask = serde_json::from_str(json).unwrap();
        assert!(task.into_poll_status().is_err());
    }

    #[test]
    fn test_task_failed_keeps_reason() {
        let json = r#"{"id": "t1", "status": "FAILED", "failure": "Prompt rejected", "failureCode": "SAFETY"}"#;
        let task: RunwayTask = serde_json::from_str(json).unwrap();
        assert_eq!(
            task.into_poll_status().unwrap(),
            PollStatus::Failed("Prompt rejected (SAFETY)".into())
        );
    }

    #[test]
    fn test_task_running_states() {
        for status in ["PENDING", "THROTTLED", "RUNNING"] {
            let json = format!(r#"{{"id": "t1", "status": "{status}"}}"#);
            let task: RunwayTask = serde_json::from_str(&json).unwrap();
            assert_eq!(task.into_poll_status().unwrap(), PollStatus::Running);
        }
    }
}
