//! Provider credentials and gateway settings.

use crate::error::{MediaGateError, Result};
use crate::generation::{MediaKind, ProviderKind};
use std::collections::HashMap;
use std::time::Duration;

/// Default wait between status checks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Default number of status checks before a job is considered timed out.
pub const DEFAULT_MAX_POLL_ATTEMPTS: u32 = 60;

/// Secret tokens per provider. Presence is all that decides eligibility.
#[derive(Clone, Default)]
pub struct ProviderCredentials {
    tokens: HashMap<ProviderKind, String>,
}

impl ProviderCredentials {
    /// Creates an empty credential set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads every provider's credential from its environment variable.
    pub fn from_env() -> Self {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Builds credentials from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        ProviderKind::ALL
            .iter()
            .fold(Self::new(), |creds, kind| match lookup(kind.env_var()) {
                Some(token) => creds.with(*kind, token),
                None => creds,
            })
    }

    /// Sets the token for `provider`. Blank tokens are ignored.
    pub fn with(mut self, provider: ProviderKind, token: impl Into<String>) -> Self {
        let token = token.into();
        if !token.trim().is_empty() {
            self.tokens.insert(provider, token.trim().to_string());
        }
        self
    }

    /// Returns the token configured for `provider`.
    pub fn token(&self, provider: ProviderKind) -> Option<&str> {
        self.tokens.get(&provider).map(String::as_str)
    }

    /// Returns true if `provider` has a credential.
    pub fn is_configured(&self, provider: ProviderKind) -> bool {
        self.tokens.contains_key(&provider)
    }

    /// Returns the configured providers for `media`.
    pub fn configured(&self, media: MediaKind) -> Vec<ProviderKind> {
        ProviderKind::ALL
            .iter()
            .copied()
            .filter(|kind| kind.media() == media && self.is_configured(*kind))
            .collect()
    }

    /// Returns true if no provider has a credential.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl std::fmt::Debug for ProviderCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut configured: Vec<&str> = self.tokens.keys().map(|k| k.as_str()).collect();
        configured.sort_unstable();
        f.debug_struct("ProviderCredentials")
            .field("configured", &configured)
            .finish()
    }
}

/// Base URLs of the upstream APIs. Overridable for tests and proxies.
#[derive(Debug, Clone)]
pub struct ProviderEndpoints {
    /// xAI API base (images).
    pub xai: String,
    /// OpenAI API base (DALL-E and Sora).
    pub openai: String,
    /// Runway API base.
    pub runway: String,
    /// Luma API base.
    pub luma: String,
}

impl Default for ProviderEndpoints {
    fn default() -> Self {
        Self {
            xai: "https://api.x.ai/v1".into(),
            openai: "https://api.openai.com/v1".into(),
            runway: "https://api.dev.runwayml.com/v1".into(),
            luma: "https://api.lumalabs.ai/dream-machine/v1".into(),
        }
    }
}

impl ProviderEndpoints {
    /// Points every provider at the same base URL.
    pub fn all(base_url: impl Into<String>) -> Self {
        let base = base_url.into();
        Self {
            xai: base.clone(),
            openai: base.clone(),
            runway: base.clone(),
            luma: base,
        }
    }
}

/// Polling settings for asynchronous providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    /// Wait before each status check.
    pub interval: Duration,
    /// Maximum number of status checks.
    pub max_attempts: u32,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_attempts: DEFAULT_MAX_POLL_ATTEMPTS,
        }
    }
}

impl PollSettings {
    /// Validates the settings.
    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(MediaGateError::Config(
                "max poll attempts must be at least 1".into(),
            ));
        }
        if self.interval.is_zero() {
            return Err(MediaGateError::Config(
                "poll interval must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

/// Default number of sessions remembered by the gateway.
pub const DEFAULT_SESSION_CAPACITY: usize = 1024;

/// Default lifetime of an idle session.
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(60 * 60);

/// Default number of generations remembered per session.
pub const DEFAULT_RECENT_PER_SESSION: usize = 20;

/// Bounds of the per-session store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    /// Maximum number of sessions held at once.
    pub capacity: usize,
    /// Idle lifetime of a session.
    pub ttl: Duration,
    /// Generations kept per session, newest first.
    pub recent_limit: usize,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_SESSION_CAPACITY,
            ttl: DEFAULT_SESSION_TTL,
            recent_limit: DEFAULT_RECENT_PER_SESSION,
        }
    }
}

/// Settings of the HTTP gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Socket address to listen on.
    pub bind: String,
    /// Polling of asynchronous providers.
    pub poll: PollSettings,
    /// Per-session store bounds.
    pub sessions: SessionSettings,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:3000".into(),
            poll: PollSettings::default(),
            sessions: SessionSettings::default(),
        }
    }
}

impl ServerConfig {
    /// Validates the settings.
    pub fn validate(&self) -> Result<()> {
        self.poll.validate()?;
        if self.bind.trim().is_empty() {
            return Err(MediaGateError::Config("bind address is empty".into()));
        }
        if self.sessions.capacity == 0 {
            return Err(MediaGateError::Config(
                "session capacity must be at least 1".into(),
            ));
        }
        if self.sessions.ttl.is_zero() {
            return Err(MediaGateError::Config(
                "session ttl must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(pairs: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        move |var| {
            pairs
                .iter()
                .find(|(k, _)| *k == var)
                .map(|(_, v)| v.to_string())
        }
    }

    #[test]
    fn test_from_lookup_maps_openai_key_to_both_providers() {
        let creds = ProviderCredentials::from_lookup(lookup(&[("OPENAI_API_KEY", "sk-test")]));
        assert!(creds.is_configured(ProviderKind::DallE));
        assert!(creds.is_configured(ProviderKind::Sora));
        assert!(!creds.is_configured(ProviderKind::Runway));
    }

    #[test]
    fn test_blank_tokens_are_absent() {
        let creds = ProviderCredentials::from_lookup(lookup(&[
            ("RUNWAYML_API_SECRET", "   "),
            ("LUMAAI_API_KEY", "luma-key"),
        ]));
        assert!(!creds.is_configured(ProviderKind::Runway));
        assert_eq!(creds.token(ProviderKind::Luma), Some("luma-key"));
    }

    #[test]
    fn test_configured_filters_by_media() {
        let creds = ProviderCredentials::new()
            .with(ProviderKind::GrokImage, "xai-1")
            .with(ProviderKind::Luma, "luma-1");
        assert_eq!(creds.configured(MediaKind::Image), vec![ProviderKind::GrokImage]);
        assert_eq!(creds.configured(MediaKind::Video), vec![ProviderKind::Luma]);
    }

    #[test]
    fn test_debug_hides_tokens() {
        let creds = ProviderCredentials::new().with(ProviderKind::Runway, "key_secret");
        let debug = format!("{creds:?}");
        assert!(debug.contains("runway"));
        assert!(!debug.contains("key_secret"));
    }

    #[test]
    fn test_poll_settings_defaults_and_validation() {
        let settings = PollSettings::default();
        assert_eq!(settings.interval, Duration::from_secs(5));
        assert_eq!(settings.max_attempts, 60);
        assert!(settings.validate().is_ok());

        let bad = PollSettings {
            max_attempts: 0,
            ..settings
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_server_config_validation() {
        assert!(ServerConfig::default().validate().is_ok());

        let mut config = ServerConfig::default();
        config.poll.max_attempts = 0;
        assert!(matches!(config.validate(), Err(MediaGateError::Config(_))));

        let mut config = ServerConfig::default();
        config.sessions.capacity = 0;
        assert!(config.validate().is_err());
    }
}
