//! Post-processing of raw completion text.

use once_cell::sync::Lazy;
use regex::Regex;

/// A fence, an optional language tag, a newline, then the body up to the
/// next closing fence.
static FENCED_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"```([\w+#.-]*)[ \t]*\r?\n([\s\S]*?)```").expect("fenced block pattern is valid")
});

/// A ```json fence whose closing marker starts a line. Backticks inside JSON
/// strings never do, since string newlines are escaped.
static JSON_FENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?mi)```json[ \t]*\r?\n([\s\S]*?)^[ \t]*```[ \t]*\r?$")
        .expect("json fence pattern is valid")
});

/// Extract the bodies of all fenced code blocks, in order, joined by a
/// blank line.
///
/// Text without fences is returned unchanged. Fences that are all empty
/// yield an empty string.
pub fn extract_code_blocks(text: &str) -> String {
    let mut found = false;
    let blocks: Vec<&str> = FENCED_BLOCK
        .captures_iter(text)
        .filter_map(|caps| caps.get(2))
        .inspect(|_| found = true)
        .map(|body| body.as_str().trim())
        .filter(|body| !body.is_empty())
        .collect();

    if found {
        blocks.join("\n\n")
    } else {
        text.to_string()
    }
}

/// Find the JSON object in a completion.
///
/// Prefers the body of a ```json fence; otherwise see [`outermost_braces`].
pub fn locate_json_object(text: &str) -> &str {
    match JSON_FENCE.captures(text).and_then(|caps| caps.get(1)) {
        Some(body) => body.as_str().trim(),
        None => outermost_braces(text),
    }
}

/// Everything from the first `{` to the last `}`, or the whole text.
pub fn outermost_braces(text: &str) -> &str {
    match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => &text[start..=end],
        _ => text.trim(),
    }
}
