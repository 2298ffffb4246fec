//! Provider adapter trait.

use crate::error::{MediaGateError, Result};
use crate::generation::types::{GenerationRequest, GenerationResult, ProviderKind};
use async_trait::async_trait;

/// Outcome of submitting a request to a provider.
#[derive(Debug, Clone, PartialEq)]
pub enum Submission {
    /// Synchronous providers return their results directly.
    Completed(Vec<GenerationResult>),
    /// Asynchronous providers return a job id to poll.
    Accepted {
        /// Provider-issued job id.
        job_id: String,
    },
}

/// Status of an asynchronous provider job.
#[derive(Debug, Clone, PartialEq)]
pub enum PollStatus {
    /// Queued or in progress.
    Running,
    /// Finished successfully.
    Completed(GenerationResult),
    /// Provider reported a terminal failure.
    Failed(String),
}

/// Translation between the gateway's request/result shape and one
/// provider's wire API.
///
/// Each call performs exactly one outbound request; nothing is cached.
#[async_trait]
pub trait GenerationAdapter: Send + Sync {
    /// Returns the kind of this provider.
    fn kind(&self) -> ProviderKind;

    /// Returns the name of this provider for display.
    fn name(&self) -> &str {
        self.kind().display_name()
    }

    /// Submits a generation request.
    async fn submit(&self, request: &GenerationRequest) -> Result<Submission>;

    /// Checks the status of a previously accepted job.
    ///
    /// Must be idempotent: polling a completed job again yields the same result.
    async fn poll_status(&self, job_id: &str) -> Result<PollStatus> {
        Err(MediaGateError::UnexpectedResponse(format!(
            "{} is synchronous and has no job {job_id} to poll",
            self.kind()
        )))
    }
}
