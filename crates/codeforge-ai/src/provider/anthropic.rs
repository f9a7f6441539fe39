//! Anthropic messages API client.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{check_status, CompletionParams, Provider};
use crate::config::{ProviderConfig, ProviderKind};
use crate::error::{ConfigError, ProviderError};
use crate::message::{Message, Role};

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Client for `/v1/messages`.
pub struct AnthropicProvider {
    http: reqwest::Client,
    headers: HeaderMap,
    url: String,
    model: String,
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<&'a Message>,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

impl AnthropicProvider {
    pub fn new(http: reqwest::Client, config: &ProviderConfig) -> Result<Self, ConfigError> {
        let key = config
            .credential()
            .ok_or(ConfigError::MissingCredential(ProviderKind::Anthropic))?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            "x-api-key",
            HeaderValue::from_str(key.expose())
                .map_err(|_| ConfigError::MissingCredential(ProviderKind::Anthropic))?,
        );
        headers.insert("anthropic-version", HeaderValue::from_static(ANTHROPIC_VERSION));

        Ok(Self {
            http,
            headers,
            url: config.url("v1/messages"),
            model: config.model().to_string(),
        })
    }
}

#[async_trait]
impl Provider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Anthropic
    }

    async fn complete(
        &self,
        messages: &[Message],
        params: &CompletionParams,
    ) -> Result<String, ProviderError> {
        // System prompts travel in a dedicated field.
        let system = messages
            .iter()
            .filter(|m| m.role == Role::System)
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        let body = MessagesRequest {
            model: &self.model,
            max_tokens: params.max_tokens,
            temperature: params.temperature,
            system: (!system.is_empty()).then_some(system),
            messages: messages.iter().filter(|m| m.role != Role::System).collect(),
        };

        debug!(model = %self.model, "sending messages request");
        let response = self
            .http
            .post(&self.url)
            .headers(self.headers.clone())
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(self.name(), e))?;
        let response = check_status(self.name(), response).await?;

        let response: MessagesResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::invalid_response(self.name(), e.to_string()))?;

        let text = response
            .content
            .iter()
            .filter_map(|block| block.text.as_deref())
            .collect::<Vec<_>>()
            .join("");

        if text.is_empty() {
            return Err(ProviderError::invalid_response(self.name(), "response contained no text"));
        }
        Ok(text)
    }
}
