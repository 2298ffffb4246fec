//! Video generation providers.

mod luma;
mod openai;
mod runway;

pub use luma::{LumaModel, LumaProvider, LumaProviderBuilder};
pub use openai::{SoraModel, SoraProvider, SoraProviderBuilder};
pub use runway::{RunwayModel, RunwayProvider, RunwayProviderBuilder};
