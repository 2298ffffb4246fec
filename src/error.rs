//! Error types for media generation and provider orchestration.

use crate::generation::{MediaKind, ProviderKind};

/// Maximum length of an upstream error message kept for diagnostics.
const MAX_ERROR_MESSAGE_LEN: usize = 500;

/// Errors that can occur while generating media.
#[derive(Debug, thiserror::Error)]
pub enum MediaGateError {
    /// No credential is configured for any provider of the requested media kind.
    #[error("no {media} provider configured")]
    NoProviderConfigured { media: MediaKind },

    /// The upstream service rejected a request (bad request, auth, quota, ...).
    #[error("{provider} request failed ({status}): {message}")]
    ProviderRequest {
        provider: ProviderKind,
        status: u16,
        message: String,
    },

    /// The upstream service reported the job as failed while polling.
    #[error("{provider} generation failed: {reason}")]
    GenerationFailed {
        provider: ProviderKind,
        reason: String,
    },

    /// Polling budget exhausted before the job reached a terminal state.
    #[error("{provider} generation timed out after {attempts} status checks")]
    GenerationTimeout {
        provider: ProviderKind,
        attempts: u32,
    },

    /// Network or HTTP transport error.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The upstream response was well-formed but missing expected data.
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    /// Invalid request parameters supplied by the caller.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Invalid or missing configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// The caller abandoned the request.
    #[error("generation cancelled")]
    Cancelled,
}

impl MediaGateError {
    /// Returns true if a failure of this kind should move on to the next
    /// candidate provider.
    pub fn is_fallback_eligible(&self) -> bool {
        matches!(
            self,
            Self::ProviderRequest { .. }
                | Self::GenerationFailed { .. }
                | Self::GenerationTimeout { .. }
                | Self::Network(_)
                | Self::Json(_)
                | Self::UnexpectedResponse(_)
        )
    }

    /// Returns the provider this error is attributed to, if any.
    pub fn provider(&self) -> Option<ProviderKind> {
        match self {
            Self::ProviderRequest { provider, .. }
            | Self::GenerationFailed { provider, .. }
            | Self::GenerationTimeout { provider, .. } => Some(*provider),
            _ => None,
        }
    }

    /// HTTP status code to report to callers of the gateway.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::InvalidRequest(_) => 400,
            _ => 500,
        }
    }
}

/// Trims an upstream error body for logging and surfacing to callers.
///
/// Bearer tokens and `sk-`/`key_` style secrets echoed back by providers are
/// redacted, and the message is truncated on a char boundary.
pub(crate) fn sanitize_error_message(text: &str) -> String {
    let redacted: Vec<String> = text
        .split_whitespace()
        .map(|word| {
            let bare = word.trim_matches(|c: char| c == '"' || c == '\'' || c == ',');
            if bare.starts_with("sk-") || bare.starts_with("xai-") || bare.starts_with("key_") {
                word.replace(bare, "[redacted]")
            } else {
                word.to_string()
            }
        })
        .collect();
    let joined = redacted.join(" ");

    if joined.chars().count() > MAX_ERROR_MESSAGE_LEN {
        let truncated: String = joined.chars().take(MAX_ERROR_MESSAGE_LEN).collect();
        format!("{truncated}...")
    } else if joined.is_empty() {
        "empty response body".to_string()
    } else {
        joined
    }
}

/// Extracts a human readable message from a provider's JSON error body.
///
/// Handles `{"error": {"message": ...}}`, `{"error": "..."}`, `{"detail": ...}`
/// and `{"message": ...}` shapes, falling back to the raw text.
pub(crate) fn extract_error_message(text: &str) -> String {
    let parsed: Option<serde_json::Value> = serde_json::from_str(text).ok();
    let message = parsed.as_ref().and_then(|v| {
        v.pointer("/error/message")
            .or_else(|| v.get("error").filter(|e| e.is_string()))
            .or_else(|| v.get("detail"))
            .or_else(|| v.get("message"))
            .map(|m| match m.as_str() {
                Some(s) => s.to_string(),
                None => m.to_string(),
            })
    });
    sanitize_error_message(message.as_deref().unwrap_or(text))
}

/// Result type alias for media generation operations.
pub type Result<T> = std::result::Result<T, MediaGateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_fallback_eligible() {
        assert!(MediaGateError::ProviderRequest {
            provider: ProviderKind::Runway,
            status: 400,
            message: "bad ratio".into(),
        }
        .is_fallback_eligible());
        assert!(MediaGateError::GenerationFailed {
            provider: ProviderKind::Luma,
            reason: "nsfw".into(),
        }
        .is_fallback_eligible());
        assert!(MediaGateError::GenerationTimeout {
            provider: ProviderKind::Sora,
            attempts: 60,
        }
        .is_fallback_eligible());

        assert!(!MediaGateError::Cancelled.is_fallback_eligible());
        assert!(!MediaGateError::InvalidRequest("empty prompt".into()).is_fallback_eligible());
        assert!(!MediaGateError::NoProviderConfigured {
            media: MediaKind::Video
        }
        .is_fallback_eligible());
    }

    #[test]
    fn test_http_status() {
        assert_eq!(MediaGateError::InvalidRequest("x".into()).http_status(), 400);
        assert_eq!(
            MediaGateError::NoProviderConfigured {
                media: MediaKind::Image
            }
            .http_status(),
            500
        );
    }

    #[test]
    fn test_error_display() {
        let err = MediaGateError::ProviderRequest {
            provider: ProviderKind::Runway,
            status: 401,
            message: "Invalid API key".into(),
        };
        assert_eq!(err.to_string(), "runway request failed (401): Invalid API key");

        let err = MediaGateError::GenerationTimeout {
            provider: ProviderKind::Luma,
            attempts: 60,
        };
        assert_eq!(
            err.to_string(),
            "luma generation timed out after 60 status checks"
        );
    }

    #[test]
    fn test_sanitize_redacts_keys() {
        let msg = sanitize_error_message("Incorrect API key provided: sk-abc123. See docs");
        assert!(!msg.contains("sk-abc123"));
        assert!(msg.contains("[redacted]"));
    }

    #[test]
    fn test_sanitize_truncates() {
        let long = "x".repeat(2000);
        let msg = sanitize_error_message(&long);
        assert_eq!(msg.len(), MAX_ERROR_MESSAGE_LEN + 3);
    }

    #[test]
    fn test_extract_error_message_shapes() {
        assert_eq!(
            extract_error_message(r#"{"error": {"message": "quota exceeded"}}"#),
            "quota exceeded"
        );
        assert_eq!(extract_error_message(r#"{"error": "bad ratio"}"#), "bad ratio");
        assert_eq!(extract_error_message(r#"{"detail": "Invalid token"}"#), "Invalid token");
        assert_eq!(extract_error_message("Bad Gateway"), "Bad Gateway");
    }
}
