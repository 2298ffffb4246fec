//! Provider selection.
//!
//! The first candidate is the best-matching configured provider; every other
//! configured provider of the same media kind follows in fixed priority order.

use crate::config::ProviderCredentials;
use crate::error::{MediaGateError, Result};
use crate::generation::{GenerationRequest, MediaKind, ProviderKind};

/// How a provider qualifies as the first candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SelectionRule {
    /// Only when the requested model names this provider.
    RequiresModelMatch,
    /// When the requested model names this provider, or no model was given.
    ModelMatchOrDefault,
    /// Whenever configured.
    LastResort,
}

const VIDEO_PRIORITY: [(ProviderKind, SelectionRule); 3] = [
    (ProviderKind::Sora, SelectionRule::RequiresModelMatch),
    (ProviderKind::Runway, SelectionRule::ModelMatchOrDefault),
    (ProviderKind::Luma, SelectionRule::LastResort),
];

const IMAGE_PRIORITY: [(ProviderKind, SelectionRule); 2] = [
    (ProviderKind::DallE, SelectionRule::RequiresModelMatch),
    (ProviderKind::GrokImage, SelectionRule::LastResort),
];

fn priority(media: MediaKind) -> &'static [(ProviderKind, SelectionRule)] {
    match media {
        MediaKind::Video => &VIDEO_PRIORITY,
        MediaKind::Image => &IMAGE_PRIORITY,
    }
}

/// Ordered, duplicate-free list of providers to try for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateList {
    candidates: Vec<ProviderKind>,
    pinned: Option<ProviderKind>,
}

impl CandidateList {
    /// Builds a list, dropping repeated providers while keeping first occurrences.
    pub fn new(candidates: impl IntoIterator<Item = ProviderKind>) -> Self {
        let mut unique: Vec<ProviderKind> = Vec::new();
        for kind in candidates {
            if !unique.contains(&kind) {
                unique.push(kind);
            }
        }
        Self {
            candidates: unique,
            pinned: None,
        }
    }

    /// Marks `provider` as the caller's sole requested provider: its failure
    /// ends the orchestration instead of falling back.
    pub fn pinned_to(mut self, provider: ProviderKind) -> Self {
        self.pinned = Some(provider);
        self
    }

    /// Returns the candidate at `index`.
    pub fn get(&self, index: usize) -> Option<ProviderKind> {
        self.candidates.get(index).copied()
    }

    /// Returns the first candidate.
    pub fn primary(&self) -> Option<ProviderKind> {
        self.get(0)
    }

    /// Returns the pinned provider, if any.
    pub fn pinned(&self) -> Option<ProviderKind> {
        self.pinned
    }

    /// Returns the candidates in order.
    pub fn as_slice(&self) -> &[ProviderKind] {
        &self.candidates
    }

    /// Number of candidates.
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    /// Returns true if there are no candidates.
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

/// Chooses the candidate providers for `request`.
///
/// Fails with `NoProviderConfigured` when no provider of the requested media
/// kind has a credential.
pub fn select_candidates(
    credentials: &ProviderCredentials,
    request: &GenerationRequest,
) -> Result<CandidateList> {
    let table = priority(request.media);
    let configured: Vec<ProviderKind> = table
        .iter()
        .map(|(kind, _)| *kind)
        .filter(|kind| credentials.is_configured(*kind))
        .collect();

    if configured.is_empty() {
        return Err(MediaGateError::NoProviderConfigured {
            media: request.media,
        });
    }

    let requested = request.requested_model.as_deref();
    let first = table
        .iter()
        .filter(|(kind, _)| credentials.is_configured(*kind))
        .find(|(kind, rule)| match rule {
            SelectionRule::RequiresModelMatch => requested.is_some_and(|m| kind.matches_model(m)),
            SelectionRule::ModelMatchOrDefault => {
                requested.is_none_or(|m| kind.matches_model(m))
            }
            SelectionRule::LastResort => true,
        })
        .map(|(kind, _)| *kind)
        .unwrap_or(configured[0]);

    let list = CandidateList::new(
        std::iter::once(first).chain(configured.iter().copied().filter(|k| *k != first)),
    );

    let sole_requested = !request.allow_fallback && request.model_for(first).is_some();
    let list = if sole_requested {
        list.pinned_to(first)
    } else {
        list
    };

    tracing::debug!(
        media = %request.media,
        requested_model = requested.unwrap_or("-"),
        candidates = ?list.as_slice(),
        pinned = ?list.pinned(),
        "selected candidate providers"
    );

    Ok(list)
}
