//! Uniform completion interface over the supported backends.

mod anthropic;
#[cfg(test)]
pub(crate) mod mock;
mod openai;
mod registry;
mod stub;

use std::time::Duration;

use async_trait::async_trait;

use crate::config::ProviderKind;
use crate::error::ProviderError;
use crate::message::Message;

pub use anthropic::AnthropicProvider;
pub use openai::OpenAiProvider;
pub use registry::{ProviderFactory, ProviderRegistry};
pub use stub::StubProvider;

/// Sampling parameters for a single completion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompletionParams {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl CompletionParams {
    pub const fn new(temperature: f32, max_tokens: u32) -> Self {
        Self {
            temperature,
            max_tokens,
        }
    }
}

impl Default for CompletionParams {
    fn default() -> Self {
        Self::new(0.7, 1000)
    }
}

/// A completion backend.
///
/// Implementations resolve credentials and endpoints at construction and
/// never retry on their own.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Short name used in logs and error messages.
    fn name(&self) -> &str;

    fn kind(&self) -> ProviderKind;

    /// Send the conversation and return the text of the first completion.
    async fn complete(
        &self,
        messages: &[Message],
        params: &CompletionParams,
    ) -> Result<String, ProviderError>;
}

/// Turn a non-success response into a [`ProviderError`].
pub(crate) async fn check_status(
    provider: &str,
    response: reqwest::Response,
) -> Result<reqwest::Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let retry_after = response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs);
    let body = response.text().await.unwrap_or_default();

    Err(ProviderError::from_status(provider, status, retry_after, &body))
}
