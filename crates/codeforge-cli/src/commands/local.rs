//! Local command - generate with the on-device model.

use std::sync::Arc;
use std::time::Duration;

use codeforge_ai::{EngineStatus, LlamaCppLoader, LocalAIError, LocalEngine, LocalEngineConfig};
use serde_json::{json, Value};
use tracing::info;

use crate::response::ErrorResponse;

pub(crate) async fn run(
    prompt: &str,
    max_length: i64,
    temperature: f32,
    wait: bool,
    timeout_ms: Option<u64>,
) -> Result<Value, ErrorResponse> {
    if prompt.trim().is_empty() {
        return Err(ErrorResponse::bad_input("Prompt is required"));
    }

    let config = LocalEngineConfig::from_env();
    let engine = Arc::new(LocalEngine::new(&config));
    if !engine.is_enabled() {
        return Err(ErrorResponse::new("Local engine is disabled", &LocalAIError::Disabled));
    }

    let _loading = engine.start_loading(Arc::new(LlamaCppLoader::from_config(&config)));
    if wait {
        let status = engine.wait_until_settled().await;
        info!("Local engine {}", status);
    }

    let timeout = timeout_ms
        .map(Duration::from_millis)
        .unwrap_or_else(|| engine.request_timeout());

    let code = engine
        .generate_with_timeout(prompt, max_length, temperature, timeout)
        .await
        .map_err(|e| failure(&engine, &e))?;

    Ok(json!({ "generatedCode": code }))
}

fn failure(engine: &LocalEngine, err: &LocalAIError) -> ErrorResponse {
    match err {
        LocalAIError::ModelNotLoaded {
            state: EngineStatus::Failed,
        } => {
            let response = ErrorResponse::new("Model failed to load", err);
            match engine.failure_reason() {
                Some(reason) => response.with_details(reason),
                None => response,
            }
        }
        LocalAIError::ModelNotLoaded { .. } => {
            ErrorResponse::new("Model is still loading. Please try again shortly.", err)
        }
        LocalAIError::GenerationTimeout(_) => ErrorResponse::new(
            "Code generation timed out. Please try again with a simpler prompt.",
            err,
        ),
        _ => ErrorResponse::new("Failed to generate code", err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loading_is_503() {
        let engine = LocalEngine::new(&LocalEngineConfig::default());
        let err = LocalAIError::ModelNotLoaded {
            state: EngineStatus::Loading,
        };
        let response = failure(&engine, &err);
        assert_eq!(response.status, 503);
        assert!(response.error.contains("still loading"));
    }

    #[test]
    fn test_timeout_is_504() {
        let engine = LocalEngine::new(&LocalEngineConfig::default());
        let response = failure(&engine, &LocalAIError::GenerationTimeout(Duration::from_secs(1)));
        assert_eq!(response.status, 504);
    }
}
