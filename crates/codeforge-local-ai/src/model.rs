//! Causal language model seam and its llama.cpp implementation.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::{debug, info};

use crate::client::LlamaCppClient;
use crate::config::LocalEngineConfig;
use crate::error::LocalAIError;
use crate::server::LlamaCppServer;

/// A loaded causal language model.
#[async_trait]
pub trait CausalLm: Send + Sync {
    async fn tokenize(&self, text: &str) -> Result<Vec<u32>, LocalAIError>;

    async fn detokenize(&self, tokens: &[u32]) -> Result<String, LocalAIError>;

    /// Greedy decoding. Returns `prompt` followed by at most
    /// `max_new_tokens` generated tokens.
    async fn generate_greedy(
        &self,
        prompt: &[u32],
        max_new_tokens: u32,
    ) -> Result<Vec<u32>, LocalAIError>;
}

/// Produces a [`CausalLm`]. Called once, from the engine's loading task.
#[async_trait]
pub trait ModelLoader: Send + Sync {
    async fn load(&self) -> Result<Arc<dyn CausalLm>, LocalAIError>;
}

/// A model served by llama-server.
///
/// Owns the server process when it was started by [`LlamaCppLoader`]; the
/// process stops when the model is dropped.
pub struct LlamaCppModel {
    client: LlamaCppClient,
    _server: Option<Mutex<LlamaCppServer>>,
}

impl LlamaCppModel {
    /// Use a server someone else manages.
    pub fn attach(client: LlamaCppClient) -> Self {
        Self { client, _server: None }
    }

    fn owning(server: LlamaCppServer) -> Self {
        Self {
            client: server.client(),
            _server: Some(Mutex::new(server)),
        }
    }
}

#[async_trait]
impl CausalLm for LlamaCppModel {
    async fn tokenize(&self, text: &str) -> Result<Vec<u32>, LocalAIError> {
        self.client.tokenize(text).await
    }

    async fn detokenize(&self, tokens: &[u32]) -> Result<String, LocalAIError> {
        self.client.detokenize(tokens).await
    }

    async fn generate_greedy(
        &self,
        prompt: &[u32],
        max_new_tokens: u32,
    ) -> Result<Vec<u32>, LocalAIError> {
        let completion = self.client.complete_tokens(prompt, max_new_tokens).await?;

        let new_tokens = if completion.tokens.is_empty() && !completion.content.is_empty() {
            self.client.tokenize(&completion.content).await?
        } else {
            completion.tokens
        };

        let mut output = Vec::with_capacity(prompt.len() + new_tokens.len());
        output.extend_from_slice(prompt);
        output.extend(new_tokens.into_iter().take(max_new_tokens as usize));
        Ok(output)
    }
}

/// Attaches to a healthy llama-server on the configured port, or starts one.
pub struct LlamaCppLoader {
    config: LocalEngineConfig,
}

impl LlamaCppLoader {
    pub fn from_config(config: &LocalEngineConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }
}

#[async_trait]
impl ModelLoader for LlamaCppLoader {
    async fn load(&self) -> Result<Arc<dyn CausalLm>, LocalAIError> {
        let client = LlamaCppClient::with_url(self.config.base_url());
        if client.check_health().await.is_ok() {
            info!("Attaching to running llama-server at {}", client.base_url());
            return Ok(Arc::new(LlamaCppModel::attach(client)));
        }

        debug!("No llama-server on port {}, starting one", self.config.port);
        let mut server = LlamaCppServer::from_config(&self.config);
        server.start()?;
        server.wait_ready(self.config.startup_timeout).await?;

        Ok(Arc::new(LlamaCppModel::owning(server)))
    }
}
