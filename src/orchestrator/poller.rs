//! Bounded fixed-interval polling of asynchronous provider jobs.

use crate::config::PollSettings;
use crate::error::{MediaGateError, Result};
use crate::generation::{GenerationAdapter, GenerationJob, GenerationResult, JobState, PollStatus};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Drives `poll_status` until a job completes, fails, or runs out of attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Poller {
    interval: Duration,
    max_attempts: u32,
}

impl Default for Poller {
    fn default() -> Self {
        Self::from_settings(PollSettings::default())
    }
}

impl Poller {
    /// Creates a poller that waits `interval` before each of at most
    /// `max_attempts` status checks.
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
        }
    }

    /// Creates a poller from gateway settings.
    pub fn from_settings(settings: PollSettings) -> Self {
        Self::new(settings.interval, settings.max_attempts)
    }

    /// Wait before each status check.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Maximum number of status checks.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Polls `job` on `adapter` until it reaches a terminal state.
    ///
    /// `job.attempts` counts the status checks performed and never exceeds
    /// `max_attempts`. A provider-reported failure is terminal and is not
    /// retried. Cancelling `cancel` stops polling at the next await point.
    pub async fn run(
        &self,
        adapter: &dyn GenerationAdapter,
        job: &mut GenerationJob,
        cancel: &CancellationToken,
    ) -> Result<GenerationResult> {
        let job_id = job.external_job_id.clone().ok_or_else(|| {
            MediaGateError::UnexpectedResponse(format!(
                "{} job {} has no provider job id to poll",
                job.provider, job.id
            ))
        })?;
        job.transition(JobState::Polling);

        while job.attempts < self.max_attempts {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(MediaGateError::Cancelled),
                _ = tokio::time::sleep(self.interval) => {}
            }

            job.attempts += 1;
            let status = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(MediaGateError::Cancelled),
                status = adapter.poll_status(&job_id) => status,
            };

            match status {
                Ok(PollStatus::Completed(result)) => {
                    job.transition(JobState::Completed);
                    tracing::debug!(
                        provider = %job.provider,
                        job_id = %job_id,
                        attempts = job.attempts,
                        "job completed"
                    );
                    return Ok(result);
                }
                Ok(PollStatus::Failed(reason)) => {
                    job.transition(JobState::Failed);
                    return Err(MediaGateError::GenerationFailed {
                        provider: job.provider,
                        reason,
                    });
                }
                Ok(PollStatus::Running) => {
                    tracing::debug!(
                        provider = %job.provider,
                        job_id = %job_id,
                        attempt = job.attempts,
                        max_attempts = self.max_attempts,
                        "job still running"
                    );
                }
                Err(e) => {
                    job.transition(JobState::Failed);
                    return Err(e);
                }
            }
        }

        job.transition(JobState::TimedOut);
        Err(MediaGateError::GenerationTimeout {
            provider: job.provider,
            attempts: job.attempts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::{GenerationRequest, ProviderKind, Submission};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Replays a scripted sequence of poll responses, then keeps answering `Running`.
    struct ScriptedAdapter {
        script: Mutex<VecDeque<PollStatus>>,
        polls: AtomicU32,
    }

    impl ScriptedAdapter {
        fn new(script: Vec<PollStatus>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                polls: AtomicU32::new(0),
            }
        }

        fn polls(&self) -> u32 {
            self.polls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl GenerationAdapter for ScriptedAdapter {
        fn kind(&self) -> ProviderKind {
            ProviderKind::Luma
        }

        async fn submit(&self, _request: &GenerationRequest) -> Result<Submission> {
            Ok(Submission::Accepted {
                job_id: "job-1".into(),
            })
        }

        async fn poll_status(&self, _job_id: &str) -> Result<PollStatus> {
            self.polls.fetch_add(1, Ordering::SeqCst);
            Ok(self.script.lock().pop_front().unwrap_or(PollStatus::Running))
        }
    }

    fn completed() -> GenerationResult {
        GenerationResult {
            url: "https://cdn/v.mp4".into(),
            provider: ProviderKind::Luma,
            model: "ray-2".into(),
            revised_prompt: None,
            status: "completed".into(),
        }
    }

    fn accepted_job() -> GenerationJob {
        let mut job = GenerationJob::new(ProviderKind::Luma);
        job.external_job_id = Some("job-1".into());
        job
    }

    #[tokio::test(start_paused = true)]
    async fn test_completes_on_third_tick_without_further_polls() {
        let adapter = ScriptedAdapter::new(vec![
            PollStatus::Running,
            PollStatus::Running,
            PollStatus::Completed(completed()),
        ]);
        let mut job = accepted_job();
        let start = tokio::time::Instant::now();

        let result = Poller::default()
            .run(&adapter, &mut job, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(result, completed());
        assert_eq!(job.attempts, 3);
        assert_eq!(job.state, JobState::Completed);
        assert_eq!(adapter.polls(), 3);
        assert_eq!(start.elapsed(), Duration::from_secs(15));
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out_after_max_attempts() {
        let adapter = ScriptedAdapter::new(vec![]);
        let mut job = accepted_job();
        let start = tokio::time::Instant::now();

        let err = Poller::default()
            .run(&adapter, &mut job, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            MediaGateError::GenerationTimeout {
                provider: ProviderKind::Luma,
                attempts: 60
            }
        ));
        assert_eq!(adapter.polls(), 60);
        assert_eq!(job.state, JobState::TimedOut);
        assert_eq!(start.elapsed(), Duration::from_secs(300));
    }

    #[tokio::test(start_paused = true)]
    async fn test_provider_failure_is_terminal() {
        let adapter = ScriptedAdapter::new(vec![
            PollStatus::Running,
            PollStatus::Failed("moderation".into()),
        ]);
        let mut job = accepted_job();

        let err = Poller::default()
            .run(&adapter, &mut job, &CancellationToken::new())
            .await
            .unwrap_err();

        match err {
            MediaGateError::GenerationFailed { provider, reason } => {
                assert_eq!(provider, ProviderKind::Luma);
                assert_eq!(reason, "moderation");
            }
            other => panic!("expected GenerationFailed, got {other:?}"),
        }
        assert_eq!(adapter.polls(), 2);
        assert_eq!(job.state, JobState::Failed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_stops_polling() {
        let adapter = ScriptedAdapter::new(vec![]);
        let mut job = accepted_job();
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(12)).await;
            trigger.cancel();
        });

        let err = Poller::default()
            .run(&adapter, &mut job, &cancel)
            .await
            .unwrap_err();

        assert!(matches!(err, MediaGateError::Cancelled));
        assert_eq!(adapter.polls(), 2);
    }

    #[tokio::test]
    async fn test_missing_job_id_is_error() {
        let adapter = ScriptedAdapter::new(vec![]);
        let mut job = GenerationJob::new(ProviderKind::Luma);

        let result = Poller::new(Duration::from_millis(1), 3)
            .run(&adapter, &mut job, &CancellationToken::new())
            .await;

        assert!(result.is_err());
        assert_eq!(adapter.polls(), 0);
    }
}
