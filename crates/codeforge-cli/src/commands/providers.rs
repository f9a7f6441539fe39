//! Providers command - show registered backends and the model selection.

use codeforge_ai::{AIConfig, ProviderKind, ProviderRegistry};
use serde_json::{json, Value};

use crate::response::ErrorResponse;

pub(crate) fn run(model: Option<&str>) -> Result<Value, ErrorResponse> {
    let mut config = AIConfig::from_env();
    if let Some(model) = model {
        config.ai_model = model.to_string();
    }

    let selection = config.selection();
    let registry = ProviderRegistry::with_defaults();
    let providers: Vec<Value> = registry
        .kinds()
        .into_iter()
        .map(|kind| {
            let configured = match kind {
                ProviderKind::OpenAi => config.openai_api_key.is_some(),
                ProviderKind::Anthropic => config.anthropic_api_key.is_some(),
                _ => true,
            };
            json!({
                "name": kind.as_str(),
                "requiresCredential": kind.requires_credential(),
                "configured": configured,
            })
        })
        .collect();

    Ok(json!({
        "aiModel": config.ai_model,
        "selected": {
            "provider": selection.kind.as_str(),
            "model": selection.model,
        },
        "providers": providers,
    }))
}
