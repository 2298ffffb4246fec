#![warn(missing_docs)]
//! MediaGate - multi-provider image and video generation gateway.
//!
//! A request names a media kind and optionally a model. The orchestrator
//! picks the configured providers that can serve it, tries them one at a
//! time, and polls asynchronous video jobs until they finish.
//!
//! # Quick Start
//!
//! ```no_run
//! use mediagate::{GenerationRequest, Orchestrator};
//!
//! #[tokio::main]
//! async fn main() -> mediagate::Result<()> {
//!     let orchestrator = Orchestrator::from_env();
//!     let request = GenerationRequest::video("A paper boat drifting down a rainy street")
//!         .with_duration(8);
//!     let generation = orchestrator.generate(&request).await?;
//!     println!("{} via {}", generation.results[0].url, generation.provider);
//!     Ok(())
//! }
//! ```
//!
//! # Providers
//!
//! | Provider | Media | Credential |
//! |---|---|---|
//! | Grok (xAI) | image | `XAI_API_KEY` |
//! | DALL-E (OpenAI) | image | `OPENAI_API_KEY` |
//! | Sora (OpenAI) | video | `OPENAI_API_KEY` |
//! | Runway | video | `RUNWAYML_API_SECRET` |
//! | Luma Dream Machine | video | `LUMAAI_API_KEY` |
//!
//! # Features
//!
//! - `server`: axum HTTP gateway ([`server`])
//! - `cli`: the `mediagate` binary (implies `server`)

pub mod config;
mod error;
pub mod generation;
pub mod image;
pub mod orchestrator;
pub mod session;
pub mod video;

#[cfg(feature = "server")]
pub mod server;

pub use config::{PollSettings, ProviderCredentials, ProviderEndpoints, ServerConfig};
pub use error::{MediaGateError, Result};
pub use generation::{
    AspectRatio, Generation, GenerationAdapter, GenerationRequest, GenerationResult, MediaKind,
    PollStatus, ProviderKind, Quality, Submission,
};
pub use orchestrator::{AdapterFactory, HttpAdapterFactory, Orchestrator};

pub use image::providers::{
    DallEModel, DallEProvider, DallEProviderBuilder, GrokImageModel, GrokImageProvider,
    GrokImageProviderBuilder,
};
pub use video::providers::{
    LumaModel, LumaProvider, LumaProviderBuilder, RunwayModel, RunwayProvider,
    RunwayProviderBuilder, SoraModel, SoraProvider, SoraProviderBuilder,
};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::error::{MediaGateError, Result};
    pub use crate::generation::{
        AspectRatio, GenerationAdapter, GenerationRequest, MediaKind, ProviderKind, Quality,
    };
    pub use crate::orchestrator::Orchestrator;
}
