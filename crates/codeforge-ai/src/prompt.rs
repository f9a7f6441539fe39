//! Prompt construction for each generation task.

/// System prompt for free-form chat.
pub const CHAT_SYSTEM_PROMPT: &str = "You are a helpful AI coding assistant.";

/// System prompt for template filling.
pub const TEMPLATE_SYSTEM_PROMPT: &str =
    "You are a template processing expert. \
     Fill in template variables and validate the resulting code.";

/// System prompt for bug, security and performance review.
pub const REVIEW_SYSTEM_PROMPT: &str =
    "You are a code analysis expert. \
     Analyze the following code for bugs, security issues, and performance improvements.";

/// System prompt for single-file code generation.
pub fn code_system_prompt(language: &str) -> String {
    format!(
        r#"You are an expert {language} developer. Generate clean, efficient, and well-documented code for the request that follows.

## Rules

1. Use modern best practices
2. Handle errors explicitly
3. Document public functions and non-obvious logic
4. Follow the {language} style guidelines
5. Keep performance and security in mind

Return the code wrapped in fenced markdown code blocks."#
    )
}

/// System prompt for whole-project generation. The reply must be a single
/// JSON object.
pub fn project_system_prompt(language: &str) -> String {
    format!(
        r#"You are an expert software architect and developer. Create a complete project structure for a {language} project based on the description that follows.

## Output Format

Respond with a single JSON object and nothing else:

```json
{{
  "files": [
    {{"path": "relative/path/to/file", "content": "file content"}}
  ],
  "dependencies": {{"package_name": "version"}},
  "setupInstructions": ["instruction 1", "instruction 2"]
}}
```

## Guidelines

1. Include every configuration file the toolchain needs (e.g. package.json, requirements.txt, Cargo.toml)
2. Include a README.md
3. Follow best practices for {language}
4. Set up testing
5. Separate source, tests and documentation into their own directories
6. Add CI configuration when it is relevant"#
    )
}

/// User prompt for template filling.
pub fn template_user_prompt(template_code: &str, variables_json: &str) -> String {
    format!(
        r#"Validate this template code and fill in the variables with appropriate values.

## Template Code

{template_code}

## Variables

```json
{variables_json}
```

Return only the final code with the variables replaced."#
    )
}

/// System prompt for quality analysis.
pub fn quality_system_prompt(language: &str) -> String {
    format!(
        "You are a code quality expert. \
         Analyze this {language} code and provide detailed feedback."
    )
}

/// User prompt for code review.
pub fn review_user_prompt(code: &str, language: &str) -> String {
    format!("Language: {language}\nCode:\n{code}")
}
