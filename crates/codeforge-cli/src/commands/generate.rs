//! Provider-backed generation commands.

use std::path::Path;

use codeforge_ai::{AIConfig, CodeGenerator, ProviderRegistry};
use serde_json::{json, Map, Value};
use tracing::debug;

use super::read_input;
use crate::response::ErrorResponse;

/// Build the generator for the configured (or overridden) AI model.
fn generator(model: Option<&str>) -> Result<CodeGenerator, ErrorResponse> {
    let mut config = AIConfig::from_env();
    if let Some(model) = model {
        config.ai_model = model.to_string();
    }

    let selection = config.selection();
    debug!("Model {} resolved to {} ({})", config.ai_model, selection.kind, selection.model);

    let provider_config = config.provider_config(&selection)?;
    let http = config.http_client()?;
    let provider = ProviderRegistry::with_defaults().create(&provider_config, &http)?;
    let generator = CodeGenerator::new(provider);
    debug!("Generating with the {} provider", generator.provider_name());
    Ok(generator)
}

fn require(field: &str, value: &str) -> Result<(), ErrorResponse> {
    if value.trim().is_empty() {
        return Err(ErrorResponse::bad_input(format!("{field} is required")));
    }
    Ok(())
}

pub(crate) async fn code(
    model: Option<&str>,
    prompt: &str,
    language: &str,
) -> Result<Value, ErrorResponse> {
    require("Prompt", prompt)?;
    let code = generator(model)?
        .generate_code(prompt, language)
        .await
        .map_err(|e| ErrorResponse::new("Failed to generate code", &e))?;
    Ok(json!({ "generatedCode": code }))
}

pub(crate) async fn project(
    model: Option<&str>,
    prompt: &str,
    language: &str,
) -> Result<Value, ErrorResponse> {
    require("Prompt", prompt)?;
    let manifest = generator(model)?
        .generate_project_structure(prompt, language)
        .await
        .map_err(|e| ErrorResponse::new("Failed to generate project structure", &e))?;
    serde_json::to_value(manifest)
        .map_err(|e| {
            ErrorResponse::internal("Failed to encode manifest").with_details(e.to_string())
        })
}

pub(crate) async fn template(
    model: Option<&str>,
    file: &Path,
    vars: &[String],
    vars_file: Option<&Path>,
) -> Result<Value, ErrorResponse> {
    let template_code = read_input(file)?;
    require("Template code", &template_code)?;

    let mut variables = match vars_file {
        Some(path) => parse_vars_file(&read_input(path)?)?,
        None => Map::new(),
    };
    for var in vars {
        let (key, value) = parse_var(var)?;
        variables.insert(key, value);
    }

    let code = generator(model)?
        .generate_from_template(&template_code, &variables)
        .await
        .map_err(|e| ErrorResponse::new("Failed to generate from template", &e))?;
    Ok(json!({ "generatedCode": code }))
}

pub(crate) async fn quality(
    model: Option<&str>,
    file: &Path,
    language: &str,
) -> Result<Value, ErrorResponse> {
    let code = read_input(file)?;
    require("Code", &code)?;
    let report = generator(model)?
        .analyze_code_quality(&code, language)
        .await
        .map_err(|e| ErrorResponse::new("Failed to analyze code quality", &e))?;
    serde_json::to_value(report)
        .map_err(|e| ErrorResponse::internal("Failed to encode report").with_details(e.to_string()))
}

pub(crate) async fn review(
    model: Option<&str>,
    file: &Path,
    language: &str,
) -> Result<Value, ErrorResponse> {
    let code = read_input(file)?;
    require("Code", &code)?;
    let review = generator(model)?
        .review_code(&code, language)
        .await
        .map_err(|e| ErrorResponse::new("Failed to review code", &e))?;
    Ok(json!({ "review": review }))
}

pub(crate) async fn chat(model: Option<&str>, message: &str) -> Result<Value, ErrorResponse> {
    require("Message", message)?;
    let reply = generator(model)?
        .chat(message)
        .await
        .map_err(|e| ErrorResponse::new("Failed to process message", &e))?;
    Ok(json!({ "response": reply }))
}

/// `KEY=VALUE`; VALUE is parsed as JSON when it can be, else kept as a string.
fn parse_var(raw: &str) -> Result<(String, Value), ErrorResponse> {
    let (key, value) = raw
        .split_once('=')
        .filter(|(key, _)| !key.trim().is_empty())
        .ok_or_else(|| {
            ErrorResponse::bad_input(format!("Invalid variable '{raw}', expected KEY=VALUE"))
        })?;

    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.trim().to_string(), value))
}

fn parse_vars_file(content: &str) -> Result<Map<String, Value>, ErrorResponse> {
    match serde_json::from_str(content) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(ErrorResponse::bad_input("Variables file must contain a JSON object")),
        Err(e) => Err(
            ErrorResponse::bad_input("Failed to parse variables file").with_details(e.to_string())
        ),
    }
}
