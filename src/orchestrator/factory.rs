//! Construction of provider adapters from credentials.

use crate::config::ProviderEndpoints;
use crate::error::Result;
use crate::generation::{GenerationAdapter, ProviderKind};
use crate::image::providers::{DallEProvider, GrokImageProvider};
use crate::video::providers::{LumaProvider, RunwayProvider, SoraProvider};

/// Builds the adapter for a provider given its secret token.
pub trait AdapterFactory: Send + Sync {
    /// Creates an adapter for `provider` authenticated with `token`.
    fn create(&self, provider: ProviderKind, token: &str) -> Result<Box<dyn GenerationAdapter>>;
}

/// Builds the HTTP adapters, sharing one connection pool.
#[derive(Debug, Clone, Default)]
pub struct HttpAdapterFactory {
    client: reqwest::Client,
    endpoints: ProviderEndpoints,
}

impl HttpAdapterFactory {
    /// Creates a factory talking to the public provider APIs.
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the provider base URLs.
    pub fn with_endpoints(mut self, endpoints: ProviderEndpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    /// Reuses an existing HTTP client.
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }
}

impl AdapterFactory for HttpAdapterFactory {
    fn create(&self, provider: ProviderKind, token: &str) -> Result<Box<dyn GenerationAdapter>> {
        let client = self.client.clone();
        let endpoints = &self.endpoints;

        let adapter: Box<dyn GenerationAdapter> = match provider {
            ProviderKind::GrokImage => Box::new(
                GrokImageProvider::builder()
                    .api_key(token)
                    .base_url(&endpoints.xai)
                    .client(client)
                    .build()?,
            ),
            ProviderKind::DallE => Box::new(
                DallEProvider::builder()
                    .api_key(token)
                    .base_url(&endpoints.openai)
                    .client(client)
                    .build()?,
            ),
            ProviderKind::Sora => Box::new(
                SoraProvider::builder()
                    .api_key(token)
                    .base_url(&endpoints.openai)
                    .client(client)
                    .build()?,
            ),
            ProviderKind::Runway => Box::new(
                RunwayProvider::builder()
                    .api_key(token)
                    .base_url(&endpoints.runway)
                    .client(client)
                    .build()?,
            ),
            ProviderKind::Luma => Box::new(
                LumaProvider::builder()
                    .api_key(token)
                    .base_url(&endpoints.luma)
                    .client(client)
                    .build()?,
            ),
        };
        Ok(adapter)
    }
}
