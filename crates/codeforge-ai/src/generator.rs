//! Generation orchestrator - the main entry point for code generation.

use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::error::{GenerationError, Operation, ProviderError};
use crate::extract::extract_code_blocks;
use crate::manifest::ProjectManifest;
use crate::message::Message;
use crate::prompt::{self, CHAT_SYSTEM_PROMPT, REVIEW_SYSTEM_PROMPT, TEMPLATE_SYSTEM_PROMPT};
use crate::provider::{CompletionParams, Provider};

/// Quality score reported by [`CodeGenerator::analyze_code_quality`].
///
/// This is a fixed placeholder; no scoring model exists yet.
pub const PLACEHOLDER_QUALITY_SCORE: f64 = 0.8;

/// Sampling parameters for each operation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TaskParams {
    pub code: CompletionParams,
    pub project: CompletionParams,
    pub template: CompletionParams,
    pub quality: CompletionParams,
    pub review: CompletionParams,
    pub chat: CompletionParams,
}

impl Default for TaskParams {
    fn default() -> Self {
        Self {
            code: CompletionParams::new(0.7, 2000),
            project: CompletionParams::new(0.7, 4000),
            template: CompletionParams::new(0.3, 2000),
            quality: CompletionParams::new(0.3, 1000),
            review: CompletionParams::new(0.3, 1000),
            chat: CompletionParams::new(0.7, 1000),
        }
    }
}

/// Result of a quality analysis.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityReport {
    pub analysis: String,
    /// Always [`PLACEHOLDER_QUALITY_SCORE`].
    pub quality_score: f64,
    /// Always empty.
    pub suggestions: Vec<String>,
}

/// Builds task prompts, calls a provider, and post-processes the reply.
///
/// Stateless between calls; safe to share across tasks.
pub struct CodeGenerator {
    provider: Arc<dyn Provider>,
    params: TaskParams,
}

impl CodeGenerator {
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        Self::with_params(provider, TaskParams::default())
    }

    pub fn with_params(provider: Arc<dyn Provider>, params: TaskParams) -> Self {
        Self { provider, params }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Generate a single piece of code.
    ///
    /// Returns the fenced blocks of the reply, or the whole reply when it
    /// has none. An empty reply is an error.
    pub async fn generate_code(
        &self,
        prompt: &str,
        language: &str,
    ) -> Result<String, GenerationError> {
        require("prompt", prompt)?;
        require("language", language)?;

        let text = self
            .run(
                Operation::GenerateCode,
                prompt::code_system_prompt(language),
                prompt.to_string(),
                self.params.code,
            )
            .await?;

        self.non_empty(Operation::GenerateCode, extract_code_blocks(&text))
    }

    /// Generate a whole project as a manifest.
    ///
    /// A reply that is not a valid manifest yields an empty manifest carrying
    /// the parse error as its only setup instruction.
    pub async fn generate_project_structure(
        &self,
        prompt: &str,
        language: &str,
    ) -> Result<ProjectManifest, GenerationError> {
        require("prompt", prompt)?;
        require("language", language)?;

        let text = self
            .run(
                Operation::GenerateProjectStructure,
                prompt::project_system_prompt(language),
                prompt.to_string(),
                self.params.project,
            )
            .await?;

        let manifest = ProjectManifest::from_response(&text);
        info!(
            "Generated project with {} files and {} dependencies",
            manifest.files.len(),
            manifest.dependencies.len()
        );
        Ok(manifest)
    }

    /// Fill a template's variables.
    pub async fn generate_from_template(
        &self,
        template_code: &str,
        variables: &Map<String, Value>,
    ) -> Result<String, GenerationError> {
        require("template code", template_code)?;

        let variables_json = serde_json::to_string_pretty(variables).unwrap_or_default();
        let text = self
            .run(
                Operation::GenerateFromTemplate,
                TEMPLATE_SYSTEM_PROMPT.to_string(),
                prompt::template_user_prompt(template_code, &variables_json),
                self.params.template,
            )
            .await?;

        self.non_empty(Operation::GenerateFromTemplate, extract_code_blocks(&text))
    }

    /// Ask for free-text quality feedback.
    pub async fn analyze_code_quality(
        &self,
        code: &str,
        language: &str,
    ) -> Result<QualityReport, GenerationError> {
        require("code", code)?;

        let analysis = self
            .run(
                Operation::AnalyzeCodeQuality,
                prompt::quality_system_prompt(language),
                code.to_string(),
                self.params.quality,
            )
            .await?;

        Ok(QualityReport {
            analysis,
            quality_score: PLACEHOLDER_QUALITY_SCORE,
            suggestions: Vec::new(),
        })
    }

    /// Review code for bugs, security issues and performance problems.
    pub async fn review_code(&self, code: &str, language: &str) -> Result<String, GenerationError> {
        require("code", code)?;

        self.run(
            Operation::ReviewCode,
            REVIEW_SYSTEM_PROMPT.to_string(),
            prompt::review_user_prompt(code, language),
            self.params.review,
        )
        .await
    }

    /// Single-turn chat.
    pub async fn chat(&self, message: &str) -> Result<String, GenerationError> {
        require("message", message)?;

        self.run(
            Operation::Chat,
            CHAT_SYSTEM_PROMPT.to_string(),
            message.to_string(),
            self.params.chat,
        )
        .await
    }

    async fn run(
        &self,
        operation: Operation,
        system: String,
        user: String,
        params: CompletionParams,
    ) -> Result<String, GenerationError> {
        let messages = [Message::system(system), Message::user(user)];

        debug!(
            "{} via {} (temperature {}, max tokens {})",
            operation,
            self.provider.name(),
            params.temperature,
            params.max_tokens
        );

        match self.provider.complete(&messages, &params).await {
            Ok(text) => {
                debug!("{} returned {} bytes", operation, text.len());
                Ok(text)
            }
            Err(source) => {
                warn!("{} failed: {}", operation, source);
                Err(GenerationError::Provider { operation, source })
            }
        }
    }

    fn non_empty(&self, operation: Operation, text: String) -> Result<String, GenerationError> {
        if text.trim().is_empty() {
            return Err(GenerationError::Provider {
                operation,
                source: ProviderError::invalid_response(self.provider.name(), "empty completion"),
            });
        }
        Ok(text)
    }
}

fn require(field: &str, value: &str) -> Result<(), GenerationError> {
    if value.trim().is_empty() {
        return Err(GenerationError::InvalidInput(format!("{field} is required")));
    }
    Ok(())
}
