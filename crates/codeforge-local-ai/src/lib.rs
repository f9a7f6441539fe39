//! Local inference for CodeForge using llama.cpp.
//!
//! A small causal language model is loaded once in the background and then
//! serves short, greedy completions through [`LocalEngine`]. Results are
//! memoised in a [`ResponseCache`].
//!
//! The model itself runs inside a `llama-server` process that this crate can
//! start and supervise ([`LlamaCppServer`]); [`LlamaCppLoader`] attaches to it
//! and hands the engine a [`CausalLm`].

mod cache;
mod client;
mod config;
mod engine;
mod error;
mod model;
pub mod paths;
mod server;

pub use cache::{CacheKey, ResponseCache};
pub use client::{Completion, LlamaCppClient};
pub use config::{LocalEngineConfig, LocalEngineConfigBuilder};
pub use engine::{EngineStatus, LocalEngine};
pub use error::LocalAIError;
pub use model::{CausalLm, LlamaCppLoader, LlamaCppModel, ModelLoader};
pub use server::LlamaCppServer;

/// Default port for the local llama-server instance.
pub const DEFAULT_PORT: u16 = 11435;

/// Default model filename.
pub const DEFAULT_MODEL_FILENAME: &str = "distilgpt2.gguf";

/// Default task phrase used in the wrapper prompt.
pub const DEFAULT_TASK: &str = "Python code";

/// Prompts are cut to this many tokens, keeping the end.
pub const MAX_INPUT_TOKENS: usize = 24;

/// Tokens generated per request.
pub const MAX_NEW_TOKENS: u32 = 16;

/// Upper bound for the caller's `max_length`.
pub const MAX_LENGTH_CAP: u32 = 24;

pub const MIN_TEMPERATURE: f32 = 0.1;
pub const MAX_TEMPERATURE: f32 = 1.0;

/// Returned when the model produced nothing after the prompt.
pub const NO_CODE_SENTINEL: &str = "# No code generated";
