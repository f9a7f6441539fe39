//! Metrics command - static metrics, no provider involved.

use std::path::Path;

use codeforge_ai::CodeMetrics;
use serde_json::Value;

use super::read_input;
use crate::response::ErrorResponse;

pub(crate) fn run(file: &Path, language: &str) -> Result<Value, ErrorResponse> {
    let code = read_input(file)?;
    if code.trim().is_empty() || language.trim().is_empty() {
        return Err(ErrorResponse::bad_input("Both code and language are required"));
    }
    let metrics = CodeMetrics::calculate(&code, language);
    serde_json::to_value(metrics)
        .map_err(|e| {
            ErrorResponse::internal("Failed to encode metrics").with_details(e.to_string())
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_bad_input() {
        let err = run(Path::new("/nonexistent/main.py"), "python").unwrap_err();
        assert_eq!(err.status, 400);
    }

    #[test]
    fn test_blank_code_or_language_is_bad_input() {
        let file = std::env::temp_dir()
            .join(format!("codeforge-metrics-{}.py", std::process::id()));
        std::fs::write(&file, "x = 1\n\ny = 2\n").unwrap();

        let err = run(&file, " ").unwrap_err();
        assert_eq!(err.status, 400);
        assert_eq!(err.error, "Both code and language are required");

        let value = run(&file, "python").unwrap();
        assert_eq!(value["linesOfCode"], 3);

        std::fs::write(&file, "  \n").unwrap();
        assert_eq!(run(&file, "python").unwrap_err().status, 400);
        std::fs::remove_file(&file).unwrap();
    }
}
