//! Multi-provider generation orchestration.
//!
//! A request flows through the [selector](select_candidates), then one
//! provider at a time through the [`FallbackController`]. Asynchronous
//! providers are driven to completion by the [`Poller`].

mod factory;
mod fallback;
mod poller;
mod selector;

pub use factory::{AdapterFactory, HttpAdapterFactory};
pub use fallback::{AttemptOutcome, FallbackController, FallbackState};
pub use poller::Poller;
pub use selector::{select_candidates, CandidateList};

use crate::config::{PollSettings, ProviderCredentials};
use crate::error::{MediaGateError, Result};
use crate::generation::{
    Generation, GenerationJob, GenerationRequest, JobState, ProviderKind, Submission,
};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// Runs generation requests against the configured providers.
///
/// Cheap to clone; clones share credentials and the adapter factory.
#[derive(Clone)]
pub struct Orchestrator {
    credentials: Arc<ProviderCredentials>,
    factory: Arc<dyn AdapterFactory>,
    poller: Poller,
}

impl Orchestrator {
    /// Creates an orchestrator.
    pub fn new(
        credentials: ProviderCredentials,
        factory: Arc<dyn AdapterFactory>,
        poll: PollSettings,
    ) -> Self {
        Self {
            credentials: Arc::new(credentials),
            factory,
            poller: Poller::from_settings(poll),
        }
    }

    /// Creates an orchestrator using credentials from the environment and
    /// the public provider APIs.
    pub fn from_env() -> Self {
        Self::new(
            ProviderCredentials::from_env(),
            Arc::new(HttpAdapterFactory::new()),
            PollSettings::default(),
        )
    }

    /// Credentials used for provider selection.
    pub fn credentials(&self) -> &ProviderCredentials {
        &self.credentials
    }

    /// Polling configuration.
    pub fn poller(&self) -> &Poller {
        &self.poller
    }

    /// Generates media for `request`, never cancelled.
    pub async fn generate(&self, request: &GenerationRequest) -> Result<Generation> {
        self.generate_with_cancel(request, &CancellationToken::new())
            .await
    }

    /// Generates media for `request`, stopping as soon as `cancel` fires.
    ///
    /// On failure of every candidate, the error from the first provider
    /// attempted is returned.
    pub async fn generate_with_cancel(
        &self,
        request: &GenerationRequest,
        cancel: &CancellationToken,
    ) -> Result<Generation> {
        if request.prompt.trim().is_empty() {
            return Err(MediaGateError::InvalidRequest("prompt is required".into()));
        }

        let start = Instant::now();
        let candidates = select_candidates(&self.credentials, request)?;
        let mut controller = FallbackController::new(&candidates);
        let mut state = controller.start();

        loop {
            state = match state {
                FallbackState::Trying { cursor, provider } => {
                    match self.attempt(provider, request, cancel).await {
                        Ok(outcome) => controller.succeeded(provider, outcome, start.elapsed()),
                        Err(e) => controller.failed(cursor, e),
                    }
                }
                FallbackState::Succeeded(generation) => {
                    tracing::info!(
                        provider = %generation.provider,
                        media = %request.media,
                        attempts = generation.attempts,
                        providers_tried = generation.providers_tried.len(),
                        elapsed_ms = generation.elapsed.as_millis() as u64,
                        "generation succeeded"
                    );
                    return Ok(generation);
                }
                FallbackState::ExhaustedFailed(error) => {
                    tracing::error!(
                        media = %request.media,
                        providers_tried = ?controller.attempted(),
                        error = %error,
                        "generation failed"
                    );
                    return Err(error);
                }
            };
        }
    }

    /// One attempt at one provider: submit, then poll if the provider is asynchronous.
    async fn attempt(
        &self,
        provider: ProviderKind,
        request: &GenerationRequest,
        cancel: &CancellationToken,
    ) -> Result<AttemptOutcome> {
        let token = self
            .credentials
            .token(provider)
            .ok_or(MediaGateError::NoProviderConfigured {
                media: provider.media(),
            })?;
        let adapter = self.factory.create(provider, token)?;
        let mut job = GenerationJob::new(provider);

        tracing::debug!(job_id = %job.id, provider = %provider, "submitting generation");
        let submission = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(MediaGateError::Cancelled),
            submission = adapter.submit(request) => submission,
        };

        match submission {
            Ok(Submission::Completed(results)) => {
                job.transition(JobState::Completed);
                Ok(AttemptOutcome {
                    results,
                    attempts: 0,
                })
            }
            Ok(Submission::Accepted { job_id }) => {
                job.external_job_id = Some(job_id);
                let result = self.poller.run(adapter.as_ref(), &mut job, cancel).await?;
                Ok(AttemptOutcome {
                    results: vec![result],
                    attempts: job.attempts,
                })
            }
            Err(e) => {
                job.transition(JobState::Failed);
                Err(e)
            }
        }
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("credentials", &self.credentials)
            .field("poller", &self.poller)
            .finish_non_exhaustive()
    }
}
