//! Error taxonomy for provider calls and generation operations.

use std::fmt;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use crate::config::ProviderKind;
use codeforge_local_ai::LocalAIError;

/// Coarse failure class a boundary layer maps onto a response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    /// Missing or malformed caller input.
    BadInput,
    /// Provider, credential, or model unavailable.
    Unavailable,
    /// A deadline expired.
    Timeout,
    /// Anything else.
    Internal,
}

impl ErrorClass {
    /// HTTP status code equivalent.
    pub fn status_code(self) -> u16 {
        match self {
            ErrorClass::BadInput => 400,
            ErrorClass::Unavailable => 503,
            ErrorClass::Timeout => 504,
            ErrorClass::Internal => 500,
        }
    }
}

/// Discriminant of [`ProviderError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    Timeout,
    AuthFailure,
    RateLimited,
    Transport,
    InvalidResponse,
    NotImplemented,
}

/// Normalised failure from a completion backend.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("{provider}: request timed out")]
    Timeout { provider: String },

    #[error("{provider}: authentication failed: {message}")]
    AuthFailure { provider: String, message: String },

    #[error("{provider}: rate limit exceeded: {message}")]
    RateLimited {
        provider: String,
        message: String,
        retry_after: Option<Duration>,
    },

    #[error("{provider}: transport error: {message}")]
    Transport { provider: String, message: String },

    #[error("{provider}: invalid response: {message}")]
    InvalidResponse { provider: String, message: String },

    /// The backend exists in configuration only.
    #[error("{provider}: not implemented (no backend is available for this model)")]
    NotImplemented { provider: String },
}

impl ProviderError {
    pub fn transport(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transport {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn invalid_response(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Classify a `reqwest` failure.
    pub fn from_reqwest(provider: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout {
                provider: provider.to_string(),
            }
        } else if err.is_decode() {
            Self::invalid_response(provider, err.to_string())
        } else {
            Self::transport(provider, err.to_string())
        }
    }

    /// Classify a non-success HTTP status.
    pub fn from_status(
        provider: &str,
        status: reqwest::StatusCode,
        retry_after: Option<Duration>,
        body: &str,
    ) -> Self {
        let provider = provider.to_string();
        let message = format!("HTTP {status}: {}", body.trim());
        match status.as_u16() {
            401 | 403 => Self::AuthFailure { provider, message },
            429 => Self::RateLimited {
                provider,
                message,
                retry_after,
            },
            408 | 504 => Self::Timeout { provider },
            _ => Self::Transport { provider, message },
        }
    }

    pub fn kind(&self) -> ProviderErrorKind {
        match self {
            Self::Timeout { .. } => ProviderErrorKind::Timeout,
            Self::AuthFailure { .. } => ProviderErrorKind::AuthFailure,
            Self::RateLimited { .. } => ProviderErrorKind::RateLimited,
            Self::Transport { .. } => ProviderErrorKind::Transport,
            Self::InvalidResponse { .. } => ProviderErrorKind::InvalidResponse,
            Self::NotImplemented { .. } => ProviderErrorKind::NotImplemented,
        }
    }

    pub fn provider(&self) -> &str {
        match self {
            Self::Timeout { provider }
            | Self::AuthFailure { provider, .. }
            | Self::RateLimited { provider, .. }
            | Self::Transport { provider, .. }
            | Self::InvalidResponse { provider, .. }
            | Self::NotImplemented { provider } => provider,
        }
    }

    pub fn class(&self) -> ErrorClass {
        match self.kind() {
            ProviderErrorKind::Timeout => ErrorClass::Timeout,
            _ => ErrorClass::Unavailable,
        }
    }
}

/// Failure to construct a provider.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing credential for provider '{0}'")]
    MissingCredential(ProviderKind),

    #[error("invalid endpoint for provider '{kind}': {message}")]
    InvalidEndpoint { kind: ProviderKind, message: String },

    #[error("no provider registered for '{0}'")]
    UnknownProvider(ProviderKind),

    #[error("unrecognized provider '{0}'")]
    UnrecognizedProvider(String),

    #[error("failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),
}

impl ConfigError {
    pub fn class(&self) -> ErrorClass {
        match self {
            ConfigError::UnrecognizedProvider(_) => ErrorClass::BadInput,
            ConfigError::Http(_) => ErrorClass::Internal,
            _ => ErrorClass::Unavailable,
        }
    }
}

/// The orchestrator operation an error originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    GenerateCode,
    GenerateProjectStructure,
    GenerateFromTemplate,
    AnalyzeCodeQuality,
    ReviewCode,
    Chat,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::GenerateCode => "generate_code",
            Operation::GenerateProjectStructure => "generate_project_structure",
            Operation::GenerateFromTemplate => "generate_from_template",
            Operation::AnalyzeCodeQuality => "analyze_code_quality",
            Operation::ReviewCode => "review_code",
            Operation::Chat => "chat",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors from the generation orchestrator.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("{operation} failed: {source}")]
    Provider {
        operation: Operation,
        #[source]
        source: ProviderError,
    },
}

impl GenerationError {
    /// The underlying provider failure, if any.
    pub fn provider_error(&self) -> Option<&ProviderError> {
        match self {
            GenerationError::Provider { source, .. } => Some(source),
            GenerationError::InvalidInput(_) => None,
        }
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            GenerationError::InvalidInput(_) => ErrorClass::BadInput,
            GenerationError::Provider { source, .. } => source.class(),
        }
    }
}

/// Classify a local inference engine failure.
pub fn classify_local(err: &LocalAIError) -> ErrorClass {
    match err {
        LocalAIError::GenerationTimeout(_) | LocalAIError::ServerStartTimeout => {
            ErrorClass::Timeout
        }
        LocalAIError::ModelNotLoaded { .. }
        | LocalAIError::Disabled
        | LocalAIError::ServerNotRunning(_) => ErrorClass::Unavailable,
        LocalAIError::InvalidPrompt(_) => ErrorClass::BadInput,
        _ => ErrorClass::Internal,
    }
}
