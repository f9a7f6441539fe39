//! Path utilities for CodeForge data directories.

use std::path::{Path, PathBuf};

/// The CodeForge data directory (`~/.codeforge/`), or `./.codeforge` when no
/// home directory is known.
pub fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".codeforge")
}

/// `<root>/models/`
pub fn models_dir(root: &Path) -> PathBuf {
    root.join("models")
}

/// `<root>/bin/`
pub fn bin_dir(root: &Path) -> PathBuf {
    root.join("bin")
}

/// Path to the llama-server binary.
pub fn llama_server_path(root: &Path) -> PathBuf {
    let binary_name = if cfg!(target_os = "windows") {
        "llama-server.exe"
    } else {
        "llama-server"
    };
    bin_dir(root).join(binary_name)
}

/// Path to a model file.
pub fn model_path(root: &Path, filename: &str) -> PathBuf {
    models_dir(root).join(filename)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout() {
        let root = Path::new("/tmp/codeforge");
        assert_eq!(model_path(root, "m.gguf"), Path::new("/tmp/codeforge/models/m.gguf"));
        assert!(llama_server_path(root).starts_with("/tmp/codeforge/bin"));
    }
}
