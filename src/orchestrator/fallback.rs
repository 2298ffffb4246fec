//! Sequential fallback over the candidate list.

use crate::error::MediaGateError;
use crate::generation::{Generation, GenerationResult, ProviderKind};
use crate::orchestrator::selector::CandidateList;
use std::time::Duration;

/// What a successful provider attempt produced.
#[derive(Debug, Clone)]
pub struct AttemptOutcome {
    /// Generated assets.
    pub results: Vec<GenerationResult>,
    /// Status checks performed (0 for synchronous providers).
    pub attempts: u32,
}

/// Fallback state machine.
#[derive(Debug)]
pub enum FallbackState {
    /// Attempting the candidate at `cursor`.
    Trying {
        /// Position in the candidate list.
        cursor: usize,
        /// Provider at that position.
        provider: ProviderKind,
    },
    /// A candidate succeeded.
    Succeeded(Generation),
    /// No candidate succeeded; carries the error to surface.
    ExhaustedFailed(MediaGateError),
}

/// Walks a [`CandidateList`] one provider at a time.
///
/// Never attempts a provider twice, stops at a pinned provider's failure and
/// surfaces the first (primary) error once every candidate has failed.
#[derive(Debug)]
pub struct FallbackController<'a> {
    candidates: &'a CandidateList,
    attempted: Vec<ProviderKind>,
    primary_error: Option<MediaGateError>,
}

impl<'a> FallbackController<'a> {
    /// Creates a controller over `candidates`.
    pub fn new(candidates: &'a CandidateList) -> Self {
        Self {
            candidates,
            attempted: Vec::with_capacity(candidates.len()),
            primary_error: None,
        }
    }

    /// Initial state: trying the first candidate.
    pub fn start(&mut self) -> FallbackState {
        self.advance_from(0)
    }

    /// Providers attempted so far, in order.
    pub fn attempted(&self) -> &[ProviderKind] {
        &self.attempted
    }

    /// Records a success for `provider`.
    pub fn succeeded(
        &mut self,
        provider: ProviderKind,
        outcome: AttemptOutcome,
        elapsed: Duration,
    ) -> FallbackState {
        FallbackState::Succeeded(Generation {
            results: outcome.results,
            provider,
            attempts: outcome.attempts,
            providers_tried: self.attempted.clone(),
            elapsed,
        })
    }

    /// Records a failure for the candidate at `cursor` and decides what to do next.
    pub fn failed(&mut self, cursor: usize, error: MediaGateError) -> FallbackState {
        let provider = self.candidates.get(cursor);

        if !error.is_fallback_eligible() {
            // Cancellation surfaces as-is; anything else defers to an earlier provider failure
            if !matches!(error, MediaGateError::Cancelled) {
                if let Some(primary) = self.primary_error.take() {
                    tracing::warn!(
                        provider = ?provider,
                        error = %error,
                        "attempt aborted, surfacing primary error"
                    );
                    return FallbackState::ExhaustedFailed(primary);
                }
            }
            return FallbackState::ExhaustedFailed(error);
        }

        tracing::warn!(
            provider = ?provider,
            attempt = self.attempted.len(),
            error = %error,
            "provider attempt failed"
        );

        if self.primary_error.is_none() {
            self.primary_error = Some(error);
        }

        if provider.is_some() && provider == self.candidates.pinned() {
            tracing::info!(provider = ?provider, "requested provider failed, fallback disabled");
            return self.exhausted();
        }

        self.advance_from(cursor + 1)
    }

    /// Moves to the first not-yet-attempted candidate at or after `from`.
    fn advance_from(&mut self, from: usize) -> FallbackState {
        let next = (from..self.candidates.len()).find_map(|cursor| {
            self.candidates
                .get(cursor)
                .filter(|kind| !self.attempted.contains(kind))
                .map(|kind| (cursor, kind))
        });

        match next {
            Some((cursor, provider)) => {
                self.attempted.push(provider);
                if cursor > 0 {
                    tracing::info!(provider = %provider, "falling back to next provider");
                }
                FallbackState::Trying { cursor, provider }
            }
            None => self.exhausted(),
        }
    }

    fn exhausted(&mut self) -> FallbackState {
        let error = self.primary_error.take().unwrap_or_else(|| {
            MediaGateError::UnexpectedResponse("no candidate provider was attempted".into())
        });
        FallbackState::ExhaustedFailed(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ProviderKind::{Luma, Runway, Sora};

    fn request_error(provider: ProviderKind, message: &str) -> MediaGateError {
        MediaGateError::ProviderRequest {
            provider,
            status: 500,
            message: message.into(),
        }
    }

    fn outcome(provider: ProviderKind) -> AttemptOutcome {
        AttemptOutcome {
            results: vec![GenerationResult {
                url: "https://cdn/v.mp4".into(),
                provider,
                model: "m".into(),
                revised_prompt: None,
                status: "completed".into(),
            }],
            attempts: 3,
        }
    }

    #[test]
    fn test_starts_at_first_candidate() {
        let list = CandidateList::new([Runway, Luma]);
        let mut controller = FallbackController::new(&list);
        assert!(matches!(
            controller.start(),
            FallbackState::Trying {
                cursor: 0,
                provider: Runway
            }
        ));
    }

    #[test]
    fn test_advances_then_succeeds() {
        let list = CandidateList::new([Runway, Luma]);
        let mut controller = FallbackController::new(&list);
        controller.start();

        let state = controller.failed(0, request_error(Runway, "bad key"));
        assert!(matches!(
            state,
            FallbackState::Trying {
                cursor: 1,
                provider: Luma
            }
        ));

        match controller.succeeded(Luma, outcome(Luma), Duration::from_secs(1)) {
            FallbackState::Succeeded(generation) => {
                assert_eq!(generation.provider, Luma);
                assert_eq!(generation.attempts, 3);
                assert_eq!(generation.providers_tried, vec![Runway, Luma]);
            }
            other => panic!("expected success, got {other:?}"),
        }
    }

    #[test]
    fn test_exhaustion_surfaces_primary_error() {
        let list = CandidateList::new([Runway, Sora, Luma]);
        let mut controller = FallbackController::new(&list);
        controller.start();

        controller.failed(0, request_error(Runway, "first"));
        controller.failed(1, request_error(Sora, "second"));
        match controller.failed(2, request_error(Luma, "third")) {
            FallbackState::ExhaustedFailed(err) => {
                assert_eq!(err.to_string(), request_error(Runway, "first").to_string());
            }
            other => panic!("expected exhaustion, got {other:?}"),
        }
        assert_eq!(controller.attempted(), &[Runway, Sora, Luma]);
    }

    #[test]
    fn test_pinned_provider_does_not_fall_back() {
        let list = CandidateList::new([Runway, Luma]).pinned_to(Runway);
        let mut controller = FallbackController::new(&list);
        controller.start();

        match controller.failed(0, request_error(Runway, "quota")) {
            FallbackState::ExhaustedFailed(err) => assert_eq!(err.provider(), Some(Runway)),
            other => panic!("expected exhaustion, got {other:?}"),
        }
        assert_eq!(controller.attempted(), &[Runway]);
    }

    #[test]
    fn test_cancellation_is_not_fallback_eligible() {
        let list = CandidateList::new([Runway, Luma]);
        let mut controller = FallbackController::new(&list);
        controller.start();
        controller.failed(0, request_error(Runway, "first"));

        match controller.failed(1, MediaGateError::Cancelled) {
            FallbackState::ExhaustedFailed(err) => {
                assert!(matches!(err, MediaGateError::Cancelled))
            }
            other => panic!("expected exhaustion, got {other:?}"),
        }
    }

    #[test]
    fn test_later_config_error_keeps_primary_error() {
        let list = CandidateList::new([Runway, Luma]);
        let mut controller = FallbackController::new(&list);
        controller.start();
        controller.failed(0, request_error(Runway, "first"));

        match controller.failed(1, MediaGateError::Config("bad luma endpoint".into())) {
            FallbackState::ExhaustedFailed(err) => {
                assert_eq!(err.to_string(), request_error(Runway, "first").to_string());
            }
            other => panic!("expected exhaustion, got {other:?}"),
        }
    }

    #[test]
    fn test_config_error_on_first_candidate_surfaces_as_is() {
        let list = CandidateList::new([Runway, Luma]);
        let mut controller = FallbackController::new(&list);
        controller.start();

        match controller.failed(0, MediaGateError::Config("no key".into())) {
            FallbackState::ExhaustedFailed(err) => {
                assert!(matches!(err, MediaGateError::Config(_)))
            }
            other => panic!("expected exhaustion, got {other:?}"),
        }
    }

    #[test]
    fn test_never_retries_attempted_provider() {
        let list = CandidateList::new([Runway, Luma]);
        let mut controller = FallbackController::new(&list);
        controller.start();
        controller.failed(0, request_error(Runway, "x"));

        // Re-deciding from an earlier cursor must not revisit Runway
        let state = controller.advance_from(0);
        assert!(matches!(state, FallbackState::ExhaustedFailed(_)));
    }
}
