//! Error responses printed by every command.

use std::fmt;

use codeforge_ai::{classify_local, ConfigError, ErrorClass, GenerationError, LocalAIError};
use serde::Serialize;

/// Failure body: `{error, details?, status}`.
#[derive(Debug, Serialize)]
pub(crate) struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    pub status: u16,
}

/// Errors that map onto a response status.
pub(crate) trait Classified: fmt::Display {
    fn class(&self) -> ErrorClass;
}

impl Classified for GenerationError {
    fn class(&self) -> ErrorClass {
        GenerationError::class(self)
    }
}

impl Classified for ConfigError {
    fn class(&self) -> ErrorClass {
        ConfigError::class(self)
    }
}

impl Classified for LocalAIError {
    fn class(&self) -> ErrorClass {
        classify_local(self)
    }
}

impl ErrorResponse {
    /// `summary` becomes `error`; the underlying error goes into `details`.
    pub fn new(summary: impl Into<String>, err: &impl Classified) -> Self {
        Self {
            error: summary.into(),
            details: Some(err.to_string()),
            status: err.class().status_code(),
        }
    }

    pub fn bad_input(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
            details: None,
            status: ErrorClass::BadInput.status_code(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
            details: None,
            status: ErrorClass::Internal.status_code(),
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self)
            .unwrap_or_else(|_| format!("{{\"error\": {:?}}}", self.error))
    }
}

impl From<ConfigError> for ErrorResponse {
    fn from(err: ConfigError) -> Self {
        Self::new("AI provider is not configured", &err)
    }
}
