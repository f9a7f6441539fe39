//! Placeholder backend for model ids that have no working implementation.

use async_trait::async_trait;
use tracing::warn;

use super::{CompletionParams, Provider};
use crate::config::{ProviderConfig, ProviderKind};
use crate::error::ProviderError;
use crate::message::Message;

/// Always fails with [`ProviderError::NotImplemented`]; never returns text.
#[derive(Debug, Clone)]
pub struct StubProvider {
    label: String,
}

impl StubProvider {
    pub fn new(config: &ProviderConfig) -> Self {
        Self {
            label: format!("stub ({})", config.model()),
        }
    }
}

#[async_trait]
impl Provider for StubProvider {
    fn name(&self) -> &str {
        &self.label
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Stub
    }

    async fn complete(
        &self,
        _messages: &[Message],
        _params: &CompletionParams,
    ) -> Result<String, ProviderError> {
        warn!(
            provider = %self.label,
            "completion requested from a backend that is not implemented"
        );
        Err(ProviderError::NotImplemented {
            provider: self.label.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderErrorKind;

    #[tokio::test]
    async fn test_stub_is_tagged_not_implemented() {
        let config =
            ProviderConfig::new(ProviderKind::Stub, None, "stub://localhost", "qwen-72b").unwrap();
        let provider = StubProvider::new(&config);

        let err = provider
            .complete(&[Message::user("hi")], &CompletionParams::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ProviderErrorKind::NotImplemented);
        assert!(err.to_string().contains("qwen-72b"));
    }
}
