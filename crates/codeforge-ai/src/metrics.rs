//! Static code metrics.

use serde::Serialize;

/// Size and complexity figures for a code snippet.
///
/// Only `lines_of_code` is measured. Complexity and maintainability carry
/// fixed placeholder values until a per-language analyser exists.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeMetrics {
    pub language: String,
    pub lines_of_code: usize,
    pub cyclomatic_complexity: u32,
    pub maintainability_index: f64,
}

impl CodeMetrics {
    pub const PLACEHOLDER_COMPLEXITY: u32 = 1;
    pub const PLACEHOLDER_MAINTAINABILITY: f64 = 100.0;

    /// Count every line, blank ones included.
    pub fn calculate(code: &str, language: &str) -> Self {
        let lines_of_code = code.lines().count();

        Self {
            language: language.to_string(),
            lines_of_code,
            cyclomatic_complexity: Self::PLACEHOLDER_COMPLEXITY,
            maintainability_index: Self::PLACEHOLDER_MAINTAINABILITY,
        }
    }
}
