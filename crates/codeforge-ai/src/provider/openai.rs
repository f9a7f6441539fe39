//! OpenAI chat-completions client.
//!
//! The local llama-server speaks the same wire format, so the `Local` kind is
//! served by this client without a credential.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{check_status, CompletionParams, Provider};
use crate::config::{ProviderConfig, ProviderKind, Secret};
use crate::error::{ConfigError, ProviderError};
use crate::message::Message;

/// Client for `/chat/completions` endpoints.
pub struct OpenAiProvider {
    http: reqwest::Client,
    kind: ProviderKind,
    url: String,
    credential: Option<Secret>,
    model: String,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiProvider {
    pub fn new(http: reqwest::Client, config: &ProviderConfig) -> Result<Self, ConfigError> {
        let kind = config.kind();
        if kind.requires_credential() && config.credential().is_none() {
            return Err(ConfigError::MissingCredential(kind));
        }

        Ok(Self {
            http,
            kind,
            url: config.url("chat/completions"),
            credential: config.credential().cloned(),
            model: config.model().to_string(),
        })
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    fn name(&self) -> &str {
        self.kind.as_str()
    }

    fn kind(&self) -> ProviderKind {
        self.kind
    }

    async fn complete(
        &self,
        messages: &[Message],
        params: &CompletionParams,
    ) -> Result<String, ProviderError> {
        let body = ChatCompletionRequest {
            model: &self.model,
            messages,
            temperature: params.temperature,
            max_tokens: params.max_tokens,
        };

        let mut request = self.http.post(&self.url).json(&body);
        if let Some(key) = &self.credential {
            request = request.bearer_auth(key.expose());
        }

        debug!(provider = self.name(), model = %self.model, "sending chat completion");
        let response = request
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(self.name(), e))?;
        let response = check_status(self.name(), response).await?;

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::invalid_response(self.name(), e.to_string()))?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                ProviderError::invalid_response(self.name(), "no completion choice returned")
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderErrorKind;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider_for(server: &MockServer) -> OpenAiProvider {
        let config = ProviderConfig::new(
            ProviderKind::OpenAi,
            Some("sk-test".to_string()),
            &format!("{}/v1", server.uri()),
            "gpt-4",
        )
        .unwrap();
        OpenAiProvider::new(reqwest::Client::new(), &config).unwrap()
    }

    #[tokio::test]
    async fn test_returns_first_choice() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [
                    {"message": {"role": "assistant", "content": "first"}},
                    {"message": {"role": "assistant", "content": "second"}}
                ]
            })))
            .mount(&server)
            .await;

        let provider = provider_for(&server);
        let text = provider
            .complete(&[Message::user("hi")], &CompletionParams::default())
            .await
            .unwrap();
        assert_eq!(text, "first");
    }

    #[tokio::test]
    async fn test_auth_and_rate_limit_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "7"))
            .mount(&server)
            .await;

        let provider = provider_for(&server);
        let messages = [Message::user("hi")];

        let err = provider
            .complete(&messages, &CompletionParams::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ProviderErrorKind::AuthFailure);

        let err = provider
            .complete(&messages, &CompletionParams::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ProviderError::RateLimited {
                retry_after: Some(d),
                ..
            } if d.as_secs() == 7
        ));
    }

    #[tokio::test]
    async fn test_missing_choices_is_invalid_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
            .mount(&server)
            .await;

        let err = provider_for(&server)
            .complete(&[Message::user("hi")], &CompletionParams::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ProviderErrorKind::InvalidResponse);
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport() {
        // Bind then drop a listener so the port is known to be closed.
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let config = ProviderConfig::new(
            ProviderKind::Local,
            None,
            &format!("http://127.0.0.1:{port}"),
            "local",
        )
        .unwrap();
        let provider = OpenAiProvider::new(reqwest::Client::new(), &config).unwrap();

        let err = provider
            .complete(&[Message::user("hi")], &CompletionParams::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ProviderErrorKind::Transport);
        assert_eq!(err.provider(), "local");
    }
}
