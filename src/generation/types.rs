//! Core types shared by every provider and the orchestrator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

/// Kind of media being generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    /// Still images (synchronous providers).
    Image,
    /// Videos (asynchronous, job-queue providers).
    Video,
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Image => write!(f, "image"),
            Self::Video => write!(f, "video"),
        }
    }
}

/// Provider kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProviderKind {
    /// xAI Grok image generation.
    GrokImage,
    /// OpenAI DALL-E image generation.
    DallE,
    /// OpenAI Sora video generation.
    Sora,
    /// Runway Gen-3/Gen-4 video generation.
    Runway,
    /// Luma Dream Machine video generation.
    Luma,
}

impl ProviderKind {
    /// All providers, in no particular priority.
    pub const ALL: [ProviderKind; 5] = [
        Self::GrokImage,
        Self::DallE,
        Self::Sora,
        Self::Runway,
        Self::Luma,
    ];

    /// Returns the short identifier used in responses and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GrokImage => "grok-image",
            Self::DallE => "dall-e",
            Self::Sora => "sora",
            Self::Runway => "runway",
            Self::Luma => "luma",
        }
    }

    /// Returns the display name of this provider.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::GrokImage => "Grok Image (xAI)",
            Self::DallE => "DALL-E (OpenAI)",
            Self::Sora => "Sora (OpenAI)",
            Self::Runway => "Runway",
            Self::Luma => "Luma Dream Machine",
        }
    }

    /// Returns the media kind this provider generates.
    pub fn media(&self) -> MediaKind {
        match self {
            Self::GrokImage | Self::DallE => MediaKind::Image,
            Self::Sora | Self::Runway | Self::Luma => MediaKind::Video,
        }
    }

    /// Returns the environment variable holding this provider's credential.
    pub fn env_var(&self) -> &'static str {
        match self {
            Self::GrokImage => "XAI_API_KEY",
            Self::DallE | Self::Sora => "OPENAI_API_KEY",
            Self::Runway => "RUNWAYML_API_SECRET",
            Self::Luma => "LUMAAI_API_KEY",
        }
    }

    /// Model identifiers a caller may use to request this provider.
    pub fn model_aliases(&self) -> &'static [&'static str] {
        match self {
            Self::GrokImage => &["grok-2-image", "grok-imagine-image", "grok"],
            Self::DallE => &["dall-e-2", "dall-e-3", "dall-e"],
            Self::Sora => &["sora", "sora-2", "sora-2-pro"],
            Self::Runway => &["runway", "runway-gen3", "gen3a_turbo", "gen4_turbo"],
            Self::Luma => &["luma", "ray-2", "ray-flash-2"],
        }
    }

    /// Returns true if `model` names this provider (case-insensitive).
    pub fn matches_model(&self, model: &str) -> bool {
        let model = model.trim();
        self.model_aliases()
            .iter()
            .any(|alias| alias.eq_ignore_ascii_case(model))
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Requested output quality.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    /// Default tier (faster, cheaper).
    #[default]
    Standard,
    /// Higher tier model or rendering mode.
    High,
}

/// Common aspect ratios for generated media.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AspectRatio {
    /// 16:9 landscape (widescreen) aspect ratio.
    #[default]
    #[serde(rename = "16:9")]
    Landscape,
    /// 9:16 portrait (tall) aspect ratio.
    #[serde(rename = "9:16")]
    Portrait,
    /// 1:1 square aspect ratio.
    #[serde(rename = "1:1")]
    Square,
    /// 4:3 standard landscape aspect ratio.
    #[serde(rename = "4:3")]
    Standard,
    /// 3:4 standard portrait aspect ratio.
    #[serde(rename = "3:4")]
    StandardPortrait,
    /// 21:9 ultrawide aspect ratio.
    #[serde(rename = "21:9")]
    Ultrawide,
}

impl AspectRatio {
    /// Returns the aspect ratio as a string (e.g., "16:9").
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Landscape => "16:9",
            Self::Portrait => "9:16",
            Self::Square => "1:1",
            Self::Standard => "4:3",
            Self::StandardPortrait => "3:4",
            Self::Ultrawide => "21:9",
        }
    }

    /// Parses a ratio string such as "9:16".
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "16:9" => Some(Self::Landscape),
            "9:16" => Some(Self::Portrait),
            "1:1" => Some(Self::Square),
            "4:3" => Some(Self::Standard),
            "3:4" => Some(Self::StandardPortrait),
            "21:9" => Some(Self::Ultrawide),
            _ => None,
        }
    }

    /// Returns true for ratios taller than they are wide.
    pub fn is_portrait(&self) -> bool {
        matches!(self, Self::Portrait | Self::StandardPortrait)
    }
}

impl std::fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A request to generate media. Immutable once handed to the orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// The text prompt describing the desired output.
    pub prompt: String,
    /// Image or video.
    pub media: MediaKind,
    /// Desired video duration in seconds. Adapters clamp to their maximum.
    pub duration_secs: u32,
    /// Output quality tier.
    pub quality: Quality,
    /// Aspect ratio.
    pub aspect_ratio: AspectRatio,
    /// Model identifier requested by the caller.
    pub requested_model: Option<String>,
    /// Explicit size string (e.g. "1024x1024"), overrides the aspect ratio for images.
    pub size: Option<String>,
    /// Number of images to generate.
    pub count: u32,
    /// Whether other providers may be tried when the requested one fails.
    pub allow_fallback: bool,
}

impl GenerationRequest {
    /// Default video duration in seconds.
    pub const DEFAULT_DURATION_SECS: u32 = 5;

    /// Creates a new request with the given prompt and media kind.
    pub fn new(prompt: impl Into<String>, media: MediaKind) -> Self {
        Self {
            prompt: prompt.into(),
            media,
            duration_secs: Self::DEFAULT_DURATION_SECS,
            quality: Quality::default(),
            aspect_ratio: AspectRatio::default(),
            requested_model: None,
            size: None,
            count: 1,
            allow_fallback: true,
        }
    }

    /// Creates a video request.
    pub fn video(prompt: impl Into<String>) -> Self {
        Self::new(prompt, MediaKind::Video)
    }

    /// Creates an image request.
    pub fn image(prompt: impl Into<String>) -> Self {
        Self::new(prompt, MediaKind::Image)
    }

    /// Sets the desired video duration in seconds.
    pub fn with_duration(mut self, secs: u32) -> Self {
        self.duration_secs = secs;
        self
    }

    /// Sets the quality tier.
    pub fn with_quality(mut self, quality: Quality) -> Self {
        self.quality = quality;
        self
    }

    /// Sets the aspect ratio.
    pub fn with_aspect_ratio(mut self, ratio: AspectRatio) -> Self {
        self.aspect_ratio = ratio;
        self
    }

    /// Requests a specific model (and therefore provider).
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.requested_model = Some(model.into());
        self
    }

    /// Sets an explicit image size.
    pub fn with_size(mut self, size: impl Into<String>) -> Self {
        self.size = Some(size.into());
        self
    }

    /// Sets the number of images to generate.
    pub fn with_count(mut self, count: u32) -> Self {
        self.count = count;
        self
    }

    /// Disables fallback to other providers when a model was requested.
    pub fn without_fallback(mut self) -> Self {
        self.allow_fallback = false;
        self
    }

    /// Returns the requested model if it names `provider`.
    pub fn model_for(&self, provider: ProviderKind) -> Option<&str> {
        self.requested_model
            .as_deref()
            .filter(|m| provider.matches_model(m))
    }
}

/// A finished generation from one provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationResult {
    /// URL of the generated asset (hosted by the provider).
    pub url: String,
    /// Provider that generated this asset.
    pub provider: ProviderKind,
    /// Model used for generation.
    pub model: String,
    /// Prompt as rewritten by the provider, if reported.
    pub revised_prompt: Option<String>,
    /// Provider-reported terminal status (e.g. "completed", "SUCCEEDED").
    pub status: String,
}

/// Lifecycle of a single provider attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// Request sent to the provider.
    Submitted,
    /// Provider accepted the job; waiting on status checks.
    Polling,
    /// Provider delivered a result.
    Completed,
    /// Submit or poll failed.
    Failed,
    /// Polling budget exhausted.
    TimedOut,
}

impl JobState {
    /// Returns whether moving from `self` to `next` is a legal transition.
    ///
    /// - Submitted → Polling, Completed, Failed
    /// - Polling → Completed, Failed, TimedOut
    /// - Completed, Failed, TimedOut → (terminal)
    pub fn can_transition_to(&self, next: JobState) -> bool {
        matches!(
            (self, next),
            (JobState::Submitted, JobState::Polling)
                | (JobState::Submitted, JobState::Completed)
                | (JobState::Submitted, JobState::Failed)
                | (JobState::Polling, JobState::Completed)
                | (JobState::Polling, JobState::Failed)
                | (JobState::Polling, JobState::TimedOut)
        )
    }

    /// Returns true if no further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobState::Completed | JobState::Failed | JobState::TimedOut
        )
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobState::Submitted => write!(f, "submitted"),
            JobState::Polling => write!(f, "polling"),
            JobState::Completed => write!(f, "completed"),
            JobState::Failed => write!(f, "failed"),
            JobState::TimedOut => write!(f, "timed_out"),
        }
    }
}

/// One in-flight generation attempt at a specific provider.
///
/// Owned by a single orchestration; never shared across requests.
#[derive(Debug, Clone)]
pub struct GenerationJob {
    /// Local identifier, used for log correlation.
    pub id: Uuid,
    /// Provider handling this attempt.
    pub provider: ProviderKind,
    /// Identifier issued by the provider for asynchronous jobs.
    pub external_job_id: Option<String>,
    /// Current state.
    pub state: JobState,
    /// Number of status checks performed.
    pub attempts: u32,
    /// When the attempt started.
    pub created_at: DateTime<Utc>,
}

impl GenerationJob {
    /// Creates a job in the `Submitted` state.
    pub fn new(provider: ProviderKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            provider,
            external_job_id: None,
            state: JobState::Submitted,
            attempts: 0,
            created_at: Utc::now(),
        }
    }

    /// Moves the job to `next`, ignoring illegal transitions.
    ///
    /// Returns whether the transition was applied.
    pub fn transition(&mut self, next: JobState) -> bool {
        if self.state.can_transition_to(next) {
            tracing::debug!(
                job_id = %self.id,
                provider = %self.provider,
                from = %self.state,
                to = %next,
                "job state transition"
            );
            self.state = next;
            true
        } else {
            tracing::warn!(
                job_id = %self.id,
                provider = %self.provider,
                from = %self.state,
                to = %next,
                "ignoring invalid job state transition"
            );
            false
        }
    }
}

/// Successful outcome of an orchestration.
#[derive(Debug, Clone)]
pub struct Generation {
    /// Generated assets (several for multi-image requests).
    pub results: Vec<GenerationResult>,
    /// Provider that produced the results.
    pub provider: ProviderKind,
    /// Status checks performed by the successful attempt (0 for sync providers).
    pub attempts: u32,
    /// Providers attempted, in order, including the successful one.
    pub providers_tried: Vec<ProviderKind>,
    /// Wall-clock time spent on the whole orchestration.
    pub elapsed: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_matches_model_case_insensitive() {
        assert!(ProviderKind::Runway.matches_model("runway-gen3"));
        assert!(ProviderKind::Runway.matches_model("Gen4_Turbo"));
        assert!(ProviderKind::Sora.matches_model(" sora-2 "));
        assert!(!ProviderKind::Sora.matches_model("luma"));
        assert!(ProviderKind::DallE.matches_model("dall-e-3"));
    }

    #[test]
    fn test_provider_media_kinds() {
        assert_eq!(ProviderKind::GrokImage.media(), MediaKind::Image);
        assert_eq!(ProviderKind::Luma.media(), MediaKind::Video);
    }

    #[test]
    fn test_provider_kind_serde() {
        let json = serde_json::to_string(&ProviderKind::GrokImage).unwrap();
        assert_eq!(json, r#""grok-image""#);
        let kind: ProviderKind = serde_json::from_str(r#""dall-e""#).unwrap();
        assert_eq!(kind, ProviderKind::DallE);
    }

    #[test]
    fn test_aspect_ratio_parse() {
        assert_eq!(AspectRatio::parse("9:16"), Some(AspectRatio::Portrait));
        assert_eq!(AspectRatio::parse("21:9"), Some(AspectRatio::Ultrawide));
        assert_eq!(AspectRatio::parse("2:1"), None);
        assert!(AspectRatio::StandardPortrait.is_portrait());
        assert!(!AspectRatio::Square.is_portrait());
    }

    #[test]
    fn test_request_defaults() {
        let req = GenerationRequest::video("A cat");
        assert_eq!(req.duration_secs, 5);
        assert_eq!(req.quality, Quality::Standard);
        assert_eq!(req.aspect_ratio, AspectRatio::Landscape);
        assert_eq!(req.count, 1);
        assert!(req.allow_fallback);
        assert!(req.requested_model.is_none());
    }

    #[test]
    fn test_model_for() {
        let req = GenerationRequest::video("A cat").with_model("sora-2-pro");
        assert_eq!(req.model_for(ProviderKind::Sora), Some("sora-2-pro"));
        assert_eq!(req.model_for(ProviderKind::Runway), None);
    }

    #[test]
    fn test_job_state_transitions() {
        assert!(JobState::Submitted.can_transition_to(JobState::Polling));
        assert!(JobState::Submitted.can_transition_to(JobState::Completed));
        assert!(JobState::Polling.can_transition_to(JobState::TimedOut));
        assert!(!JobState::Submitted.can_transition_to(JobState::TimedOut));
        assert!(!JobState::Completed.can_transition_to(JobState::Failed));
        assert!(!JobState::Polling.can_transition_to(JobState::Polling));
        assert!(JobState::TimedOut.is_terminal());
        assert!(!JobState::Polling.is_terminal());
    }

    #[test]
    fn test_job_transition_rejects_illegal() {
        let mut job = GenerationJob::new(ProviderKind::Luma);
        assert!(job.transition(JobState::Polling));
        assert!(job.transition(JobState::Completed));
        assert!(!job.transition(JobState::Failed));
        assert_eq!(job.state, JobState::Completed);
    }
}
