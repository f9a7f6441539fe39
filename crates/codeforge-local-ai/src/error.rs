//! Error types for local inference.

use std::time::Duration;

use thiserror::Error;

use crate::engine::EngineStatus;

/// Errors that can occur during local inference.
#[derive(Debug, Error)]
pub enum LocalAIError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Server returned an error response.
    #[error("API error: {0}")]
    Api(String),

    /// Server is not running or not reachable.
    #[error("Server not running at {0}. Start it with: codeforge local --wait")]
    ServerNotRunning(String),

    /// Server failed to start.
    #[error("Failed to start server: {0}")]
    ServerStartFailed(String),

    /// Model file not found locally.
    #[error("Model '{0}' not found in the models directory")]
    ModelNotFound(String),

    /// llama-server binary not found.
    #[error("llama-server binary not found at {0}")]
    ServerBinaryNotFound(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Timeout waiting for server to start.
    #[error("Timeout waiting for server to become ready")]
    ServerStartTimeout,

    /// A request arrived before the model finished loading, or after it failed.
    #[error("Model not loaded (engine is {state})")]
    ModelNotLoaded { state: EngineStatus },

    /// The caller's deadline expired during generation.
    #[error("Generation timed out after {0:?}")]
    GenerationTimeout(Duration),

    /// The engine is turned off in configuration.
    #[error("Local engine is disabled")]
    Disabled,

    /// The prompt cannot be tokenised into anything.
    #[error("Invalid prompt: {0}")]
    InvalidPrompt(String),
}
