//! Provider configuration.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default OpenAI API base.
pub const DEFAULT_OPENAI_URL: &str = "https://api.openai.com/v1";

/// Default Anthropic API base.
pub const DEFAULT_ANTHROPIC_URL: &str = "https://api.anthropic.com";

/// Default address of the local OpenAI-compatible llama-server.
pub const DEFAULT_LOCAL_URL: &str = "http://127.0.0.1:11435";

/// Endpoint used for the stub backend; it is never contacted.
pub const STUB_ENDPOINT: &str = "stub://localhost";

/// AI model used when none is configured.
pub const DEFAULT_AI_MODEL: &str = "gpt-4";

const DEFAULT_ANTHROPIC_MODEL: &str = "claude-3-5-sonnet-20241022";

/// The completion backends known to the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// OpenAI chat completions.
    OpenAi,
    /// Anthropic messages API.
    Anthropic,
    /// OpenAI-compatible llama-server running locally.
    Local,
    /// No backend; every call fails with `NotImplemented`.
    Stub,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 4] = [
        ProviderKind::OpenAi,
        ProviderKind::Anthropic,
        ProviderKind::Local,
        ProviderKind::Stub,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::Local => "local",
            ProviderKind::Stub => "stub",
        }
    }

    /// Hosted backends refuse to construct without an API key.
    pub fn requires_credential(self) -> bool {
        matches!(self, ProviderKind::OpenAi | ProviderKind::Anthropic)
    }

    fn default_model(self) -> &'static str {
        match self {
            ProviderKind::OpenAi => DEFAULT_AI_MODEL,
            ProviderKind::Anthropic => DEFAULT_ANTHROPIC_MODEL,
            ProviderKind::Local => "local",
            ProviderKind::Stub => "stub",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(ProviderKind::OpenAi),
            "anthropic" | "claude" => Ok(ProviderKind::Anthropic),
            "local" => Ok(ProviderKind::Local),
            "stub" => Ok(ProviderKind::Stub),
            other => Err(ConfigError::UnrecognizedProvider(other.to_string())),
        }
    }
}

/// An API credential. Never printed by `Debug`.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

/// Validated, immutable settings for one provider instance.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    kind: ProviderKind,
    credential: Option<Secret>,
    endpoint: Url,
    model: String,
}

impl ProviderConfig {
    /// Validate and build a provider configuration.
    ///
    /// Fails when `kind` needs a credential and none (or a blank one) is
    /// given, or when `endpoint` is empty or not a URL.
    pub fn new(
        kind: ProviderKind,
        credential: Option<String>,
        endpoint: &str,
        model: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let credential = credential
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .map(Secret::new);

        if kind.requires_credential() && credential.is_none() {
            return Err(ConfigError::MissingCredential(kind));
        }

        let endpoint = endpoint.trim();
        if endpoint.is_empty() {
            return Err(ConfigError::InvalidEndpoint {
                kind,
                message: "endpoint is empty".to_string(),
            });
        }
        let endpoint = Url::parse(endpoint).map_err(|e| ConfigError::InvalidEndpoint {
            kind,
            message: e.to_string(),
        })?;

        let model = model.into();
        let model = if model.trim().is_empty() {
            kind.default_model().to_string()
        } else {
            model
        };

        Ok(Self {
            kind,
            credential,
            endpoint,
            model,
        })
    }

    pub fn kind(&self) -> ProviderKind {
        self.kind
    }

    pub fn credential(&self) -> Option<&Secret> {
        self.credential.as_ref()
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Append `path` to the endpoint, keeping any base path (`/v1`) intact.
    pub fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.endpoint.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

/// A resolved AI model identifier: which backend, and the model name sent on
/// the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSelection {
    pub kind: ProviderKind,
    pub model: String,
}

impl ModelSelection {
    /// Resolve an AI model identifier such as `gpt-4`, `anthropic-claude-2`
    /// or `codellama-34b`.
    ///
    /// A bare provider name selects that provider's default model. Ids that
    /// have no working backend resolve to the stub.
    pub fn resolve(ai_model: &str) -> Self {
        let id = ai_model.trim();
        let lower = id.to_ascii_lowercase();

        if let Ok(kind) = lower.parse::<ProviderKind>() {
            return Self {
                kind,
                model: kind.default_model().to_string(),
            };
        }

        let (kind, model) = if lower.starts_with("gpt-") || lower.starts_with("o1") {
            (ProviderKind::OpenAi, id.to_string())
        } else if lower.contains("claude") {
            let model = id
                .strip_prefix("anthropic-")
                .unwrap_or(id)
                .to_string();
            (ProviderKind::Anthropic, model)
        } else if lower.starts_with("codellama") || lower.starts_with("local-") {
            (ProviderKind::Local, id.to_string())
        } else {
            (ProviderKind::Stub, id.to_string())
        };

        Self { kind, model }
    }
}

/// Configuration for the hosted and local chat providers.
#[derive(Debug, Clone)]
pub struct AIConfig {
    /// Selected AI model id (default: gpt-4)
    pub ai_model: String,
    /// OpenAI API key
    pub openai_api_key: Option<String>,
    /// OpenAI API base URL
    pub openai_base_url: String,
    /// Anthropic API key
    pub anthropic_api_key: Option<String>,
    /// Anthropic API base URL
    pub anthropic_base_url: String,
    /// Local llama-server base URL
    pub local_base_url: String,
    /// Per-request timeout applied by the HTTP client
    pub request_timeout: Duration,
}

impl Default for AIConfig {
    fn default() -> Self {
        Self {
            ai_model: DEFAULT_AI_MODEL.to_string(),
            openai_api_key: None,
            openai_base_url: DEFAULT_OPENAI_URL.to_string(),
            anthropic_api_key: None,
            anthropic_base_url: DEFAULT_ANTHROPIC_URL.to_string(),
            local_base_url: DEFAULT_LOCAL_URL.to_string(),
            request_timeout: Duration::from_secs(60),
        }
    }
}

impl AIConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());

        let request_timeout = var("CODEFORGE_REQUEST_TIMEOUT")
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.request_timeout);

        Self {
            ai_model: var("CODEFORGE_AI_MODEL").unwrap_or(defaults.ai_model),
            openai_api_key: var("OPENAI_API_KEY"),
            openai_base_url: var("OPENAI_BASE_URL").unwrap_or(defaults.openai_base_url),
            anthropic_api_key: var("ANTHROPIC_API_KEY").or_else(|| var("CLAUDE_API_KEY")),
            anthropic_base_url: var("ANTHROPIC_BASE_URL").unwrap_or(defaults.anthropic_base_url),
            local_base_url: var("CODEFORGE_LOCAL_URL").unwrap_or(defaults.local_base_url),
            request_timeout,
        }
    }

    /// Create a builder for configuration.
    pub fn builder() -> AIConfigBuilder {
        AIConfigBuilder::default()
    }

    /// Resolve the configured AI model id.
    pub fn selection(&self) -> ModelSelection {
        ModelSelection::resolve(&self.ai_model)
    }

    /// Build the provider configuration for a selection. Fails fast when the
    /// selected backend has no usable credential or endpoint.
    pub fn provider_config(
        &self,
        selection: &ModelSelection,
    ) -> Result<ProviderConfig, ConfigError> {
        let model = selection.model.clone();
        match selection.kind {
            ProviderKind::OpenAi => ProviderConfig::new(
                ProviderKind::OpenAi,
                self.openai_api_key.clone(),
                &self.openai_base_url,
                model,
            ),
            ProviderKind::Anthropic => ProviderConfig::new(
                ProviderKind::Anthropic,
                self.anthropic_api_key.clone(),
                &self.anthropic_base_url,
                model,
            ),
            ProviderKind::Local => {
                ProviderConfig::new(ProviderKind::Local, None, &self.local_base_url, model)
            }
            ProviderKind::Stub => {
                ProviderConfig::new(ProviderKind::Stub, None, STUB_ENDPOINT, model)
            }
        }
    }

    /// Build the shared HTTP client.
    pub fn http_client(&self) -> Result<reqwest::Client, ConfigError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("codeforge/", env!("CARGO_PKG_VERSION")))
            .timeout(self.request_timeout)
            .build()?;
        Ok(client)
    }
}

/// Builder for AI configuration.
#[derive(Debug, Default)]
pub struct AIConfigBuilder {
    config: AIConfig,
}

impl AIConfigBuilder {
    pub fn ai_model(mut self, model: impl Into<String>) -> Self {
        self.config.ai_model = model.into();
        self
    }

    pub fn openai_api_key(mut self, key: impl Into<String>) -> Self {
        self.config.openai_api_key = Some(key.into());
        self
    }

    pub fn openai_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.openai_base_url = url.into();
        self
    }

    pub fn anthropic_api_key(mut self, key: impl Into<String>) -> Self {
        self.config.anthropic_api_key = Some(key.into());
        self
    }

    pub fn anthropic_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.anthropic_base_url = url.into();
        self
    }

    pub fn local_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.local_base_url = url.into();
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    pub fn build(self) -> AIConfig {
        self.config
    }
}
