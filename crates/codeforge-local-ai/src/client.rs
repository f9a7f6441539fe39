//! HTTP client for llama-server's native token API.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::LocalAIError;
use crate::DEFAULT_PORT;

/// Client for communicating with llama-server.
#[derive(Clone)]
pub struct LlamaCppClient {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Serialize)]
struct TokenizeRequest<'a> {
    content: &'a str,
    add_special: bool,
}

#[derive(Debug, Deserialize)]
struct TokenizeResponse {
    tokens: Vec<u32>,
}

#[derive(Debug, Serialize)]
struct DetokenizeRequest<'a> {
    tokens: &'a [u32],
}

#[derive(Debug, Deserialize)]
struct DetokenizeResponse {
    content: String,
}

/// Greedy completion over pre-tokenised input.
#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    prompt: &'a [u32],
    n_predict: u32,
    temperature: f32,
    top_k: u32,
    cache_prompt: bool,
    return_tokens: bool,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    tokens: Vec<u32>,
    #[serde(default)]
    content: String,
}

/// Tokens and text produced by a completion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Completion {
    pub tokens: Vec<u32>,
    pub content: String,
}

impl LlamaCppClient {
    /// Create a new client with default URL (localhost:11435).
    pub fn new() -> Self {
        Self::with_url(format!("http://127.0.0.1:{}", DEFAULT_PORT))
    }

    /// Create a new client with a custom URL.
    pub fn with_url(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Create a new client with a custom port on localhost.
    pub fn with_port(port: u16) -> Self {
        Self::with_url(format!("http://127.0.0.1:{}", port))
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Check if the server is running and healthy.
    pub async fn check_health(&self) -> Result<(), LocalAIError> {
        let url = format!("{}/health", self.base_url);

        let response = self
            .client
            .get(&url)
            .timeout(Duration::from_secs(5))
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(LocalAIError::ServerNotRunning(self.base_url.clone()))
        }
    }

    /// Tokenise `text` with the loaded model's vocabulary.
    pub async fn tokenize(&self, text: &str) -> Result<Vec<u32>, LocalAIError> {
        let request = TokenizeRequest {
            content: text,
            add_special: false,
        };
        let response: TokenizeResponse = self.post("tokenize", &request).await?;
        Ok(response.tokens)
    }

    /// Turn tokens back into text.
    pub async fn detokenize(&self, tokens: &[u32]) -> Result<String, LocalAIError> {
        let response: DetokenizeResponse =
            self.post("detokenize", &DetokenizeRequest { tokens }).await?;
        Ok(response.content)
    }

    /// Greedy (top-1) continuation of `prompt`, up to `n_predict` new tokens.
    pub async fn complete_tokens(
        &self,
        prompt: &[u32],
        n_predict: u32,
    ) -> Result<Completion, LocalAIError> {
        let request = CompletionRequest {
            prompt,
            n_predict,
            temperature: 0.0,
            top_k: 1,
            cache_prompt: true,
            return_tokens: true,
            stream: false,
        };
        let response: CompletionResponse = self.post("completion", &request).await?;
        Ok(Completion {
            tokens: response.tokens,
            content: response.content,
        })
    }

    async fn post<Req, Resp>(&self, path: &str, body: &Req) -> Result<Resp, LocalAIError>
    where
        Req: Serialize + ?Sized,
        Resp: for<'de> Deserialize<'de>,
    {
        let url = format!("{}/{}", self.base_url, path);

        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(LocalAIError::Api(format!("{}: {}", status, text)));
        }

        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    fn map_send_error(&self, err: reqwest::Error) -> LocalAIError {
        if err.is_connect() || err.is_timeout() {
            LocalAIError::ServerNotRunning(self.base_url.clone())
        } else {
            LocalAIError::Http(err)
        }
    }
}

impl Default for LlamaCppClient {
    fn default() -> Self {
        Self::new()
    }
}
