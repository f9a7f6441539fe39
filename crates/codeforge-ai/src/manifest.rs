//! Project manifests returned by project-structure generation.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::extract::{locate_json_object, outermost_braces};

/// One generated file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectFile {
    pub path: String,
    pub content: String,
}

/// Files, dependencies and setup steps of a generated project.
///
/// `files` is required when parsing; the other two default to empty.
/// Dependencies keep the order the provider listed them in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectManifest {
    pub files: Vec<ProjectFile>,
    #[serde(default)]
    pub dependencies: IndexMap<String, String>,
    #[serde(default, alias = "setup_instructions")]
    pub setup_instructions: Vec<String>,
}

/// The provider reply could not be read as a manifest.
#[derive(Debug, Error)]
#[error("Failed to parse project structure: {0}")]
pub struct ManifestParseError(#[from] serde_json::Error);

impl ProjectManifest {
    /// Parse a provider reply, tolerating surrounding prose or a ```json fence.
    ///
    /// When the located object does not parse, the span between the first
    /// `{` and the last `}` is tried before giving up with the first error.
    pub fn parse(text: &str) -> Result<Self, ManifestParseError> {
        let located = locate_json_object(text);
        match serde_json::from_str(located) {
            Ok(manifest) => Ok(manifest),
            Err(err) => {
                let outer = outermost_braces(text);
                if outer == located {
                    return Err(err.into());
                }
                serde_json::from_str(outer).map_err(|_| err.into())
            }
        }
    }

    /// An empty manifest whose only setup instruction is `message`.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            files: Vec::new(),
            dependencies: IndexMap::new(),
            setup_instructions: vec![message.into()],
        }
    }

    /// Parse, recovering from failure into [`ProjectManifest::failed`].
    pub fn from_response(text: &str) -> Self {
        Self::parse(text).unwrap_or_else(|err| {
            warn!("{}", err);
            Self::failed(err.to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_manifest() {
        let raw = r#"{
            "files": [{"path": "src/main.py", "content": "print('hi')"}],
            "dependencies": {"requests": "2.31", "flask": "3.0"},
            "setupInstructions": ["pip install -r requirements.txt"]
        }"#;

        let manifest = ProjectManifest::parse(raw).unwrap();
        assert_eq!(manifest.files.len(), 1);
        assert_eq!(manifest.files[0].path, "src/main.py");
        let deps: Vec<_> = manifest.dependencies.keys().cloned().collect();
        assert_eq!(deps, vec!["requests", "flask"]);
        assert_eq!(manifest.setup_instructions, vec!["pip install -r requirements.txt"]);
    }

    #[test]
    fn test_snake_case_instructions_accepted() {
        let raw = r#"{"files": [], "setup_instructions": ["npm install"]}"#;
        let manifest = ProjectManifest::parse(raw).unwrap();
        assert_eq!(manifest.setup_instructions, vec!["npm install"]);
    }

    #[test]
    fn test_malformed_json_recovers() {
        let manifest = ProjectManifest::from_response("I could not do that, sorry.");
        assert!(manifest.files.is_empty());
        assert!(manifest.dependencies.is_empty());
        assert_eq!(manifest.setup_instructions.len(), 1);
        assert!(manifest.setup_instructions[0].starts_with("Failed to parse project structure"));
    }

    #[test]
    fn test_missing_files_key_recovers() {
        let manifest = ProjectManifest::from_response(r#"{"dependencies": {}}"#);
        assert!(manifest.files.is_empty());
        assert!(manifest.dependencies.is_empty());
        assert_eq!(manifest.setup_instructions.len(), 1);
    }

    #[test]
    fn test_fenced_manifest_with_readme_code_block() {
        let json = serde_json::json!({
            "files": [{
                "path": "README.md",
                "content": "# App\n```bash\npip install -r requirements.txt\n```",
            }],
            "setupInstructions": ["pip install -r requirements.txt"],
        })
        .to_string();
        assert!(ProjectManifest::parse(&json).is_ok());

        let manifest = ProjectManifest::from_response(&format!("```json\n{json}\n```"));
        assert_eq!(manifest.files.len(), 1);
        assert!(manifest.files[0].content.contains("```bash"));
        assert_eq!(manifest.setup_instructions, vec!["pip install -r requirements.txt"]);
    }

    #[test]
    fn test_unterminated_json_fence_falls_back_to_braces() {
        let raw = "```json\n{\"files\": [{\"path\": \"a.py\", \"content\": \"x = 1\"}]}";
        let manifest = ProjectManifest::parse(raw).unwrap();
        assert_eq!(manifest.files[0].path, "a.py");
    }

    #[test]
    fn test_serializes_camel_case() {
        let json = serde_json::to_value(ProjectManifest::failed("boom")).unwrap();
        assert_eq!(json["setupInstructions"][0], "boom");
        assert!(json["files"].as_array().unwrap().is_empty());
    }
}
