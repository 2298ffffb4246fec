//! Shared generation types and the provider adapter trait.

mod adapter;
mod types;

pub use adapter::{GenerationAdapter, PollStatus, Submission};
pub use types::{
    AspectRatio, Generation, GenerationJob, GenerationRequest, GenerationResult, JobState,
    MediaKind, ProviderKind, Quality,
};
