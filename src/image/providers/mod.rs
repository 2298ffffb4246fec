//! Image generation providers.

mod grok;
mod openai;

pub use grok::{GrokImageModel, GrokImageProvider, GrokImageProviderBuilder};
pub use openai::{DallEModel, DallEProvider, DallEProviderBuilder};
