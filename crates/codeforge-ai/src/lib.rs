//! # CodeForge AI
//!
//! Turns a prompt into generated code, a project manifest, or a code review
//! by dispatching to one of several completion backends.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌─────────────────┐     ┌─────────────────┐
//! │  Caller (host)  │ --> │  CodeGenerator  │ --> │    Provider     │
//! │  prompt + lang  │     │ prompts/extract │     │ OpenAI/Claude/… │
//! └─────────────────┘     └─────────────────┘     └─────────────────┘
//!                                                       │
//!                                                 ┌─────┴─────┐
//!                                                 │ Registry  │
//!                                                 └───────────┘
//! ```
//!
//! ## Backends
//!
//! - **OpenAI** - hosted chat completions
//! - **Anthropic** - hosted messages API
//! - **Local** - OpenAI-compatible llama-server on this machine
//! - **Stub** - placeholder for model ids without a backend; always fails
//!   with a "not implemented" error
//!
//! The narrow local inference path (bounded greedy generation with a response
//! cache) lives in `codeforge-local-ai` and is re-exported here.
//!
//! ## Usage
//!
//! ```ignore
//! use codeforge_ai::{AIConfig, CodeGenerator, ProviderRegistry};
//!
//! let config = AIConfig::from_env();
//! let selection = config.selection();
//! let provider = ProviderRegistry::with_defaults()
//!     .create(&config.provider_config(&selection)?, &config.http_client()?)?;
//!
//! let generator = CodeGenerator::new(provider);
//! let code = generator.generate_code("add two numbers", "python").await?;
//! ```

mod config;
mod error;
mod extract;
mod generator;
mod manifest;
mod message;
mod metrics;
mod prompt;
pub mod provider;

pub use config::{AIConfig, AIConfigBuilder, ModelSelection, ProviderConfig, ProviderKind, Secret};
pub use error::{
    classify_local, ConfigError, ErrorClass, GenerationError, Operation, ProviderError,
    ProviderErrorKind,
};
pub use extract::{extract_code_blocks, locate_json_object};
pub use generator::{CodeGenerator, QualityReport, TaskParams, PLACEHOLDER_QUALITY_SCORE};
pub use manifest::{ManifestParseError, ProjectFile, ProjectManifest};
pub use message::{Message, Role};
pub use metrics::CodeMetrics;
pub use provider::{CompletionParams, Provider, ProviderRegistry};

// Re-export the local inference engine
pub use codeforge_local_ai::{
    CausalLm, EngineStatus, LlamaCppClient, LlamaCppLoader, LlamaCppServer, LocalAIError,
    LocalEngine, LocalEngineConfig, ModelLoader, ResponseCache,
};
