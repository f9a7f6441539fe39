//! Provider registry: maps each [`ProviderKind`] to a factory.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info};

use super::{AnthropicProvider, OpenAiProvider, Provider, StubProvider};
use crate::config::{ProviderConfig, ProviderKind};
use crate::error::ConfigError;

/// Builds a provider from its validated configuration and a shared client.
pub type ProviderFactory = Box<
    dyn Fn(&ProviderConfig, &reqwest::Client) -> Result<Arc<dyn Provider>, ConfigError>
        + Send
        + Sync,
>;

/// Registry of provider factories, populated at start-up.
pub struct ProviderRegistry {
    factories: HashMap<ProviderKind, ProviderFactory>,
}

impl ProviderRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// A registry with every built-in backend registered.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(ProviderKind::OpenAi, |config, http| {
            Ok(Arc::new(OpenAiProvider::new(http.clone(), config)?))
        });
        registry.register(ProviderKind::Anthropic, |config, http| {
            Ok(Arc::new(AnthropicProvider::new(http.clone(), config)?))
        });
        registry.register(ProviderKind::Local, |config, http| {
            Ok(Arc::new(OpenAiProvider::new(http.clone(), config)?))
        });
        registry.register(ProviderKind::Stub, |config, _| Ok(Arc::new(StubProvider::new(config))));
        registry
    }

    /// Register (or replace) the factory for `kind`.
    pub fn register<F>(&mut self, kind: ProviderKind, factory: F)
    where
        F: Fn(&ProviderConfig, &reqwest::Client) -> Result<Arc<dyn Provider>, ConfigError>
            + Send
            + Sync
            + 'static,
    {
        if self.factories.insert(kind, Box::new(factory)).is_some() {
            debug!("Replaced provider factory: {}", kind);
        }
    }

    /// Registered kinds, in a stable order.
    pub fn kinds(&self) -> Vec<ProviderKind> {
        let mut kinds: Vec<_> = self.factories.keys().copied().collect();
        kinds.sort();
        kinds
    }

    /// Construct the provider for `config`.
    pub fn create(
        &self,
        config: &ProviderConfig,
        http: &reqwest::Client,
    ) -> Result<Arc<dyn Provider>, ConfigError> {
        let factory = self
            .factories
            .get(&config.kind())
            .ok_or(ConfigError::UnknownProvider(config.kind()))?;

        let provider = factory(config, http)?;
        info!("Using provider {} (model: {})", provider.name(), config.model());
        Ok(provider)
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
