//! Configuration for the local inference engine.

use std::path::PathBuf;
use std::time::Duration;

use crate::paths::default_data_dir;
use crate::{DEFAULT_MODEL_FILENAME, DEFAULT_PORT, DEFAULT_TASK};

/// Configuration for [`LocalEngine`](crate::LocalEngine) and its loader.
#[derive(Debug, Clone)]
pub struct LocalEngineConfig {
    /// Whether the host should start the engine at all
    pub enabled: bool,
    /// Task phrase in the wrapper prompt (default: "Python code")
    pub task: String,
    /// GGUF model filename under `<data_dir>/models`
    pub model_filename: String,
    /// Port of the managed llama-server
    pub port: u16,
    /// Root of the models/ and bin/ directories
    pub data_dir: PathBuf,
    /// How long to wait for llama-server to report healthy
    pub startup_timeout: Duration,
    /// Deadline for a single generation
    pub request_timeout: Duration,
    /// Maximum cached responses; `None` keeps every entry
    pub cache_capacity: Option<usize>,
}

impl Default for LocalEngineConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            task: DEFAULT_TASK.to_string(),
            model_filename: DEFAULT_MODEL_FILENAME.to_string(),
            port: DEFAULT_PORT,
            data_dir: default_data_dir(),
            startup_timeout: Duration::from_secs(120),
            request_timeout: Duration::from_secs(1),
            cache_capacity: None,
        }
    }
}

impl LocalEngineConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());

        let enabled = var("CODEFORGE_LOCAL_ENGINE")
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
            .unwrap_or(defaults.enabled);

        Self {
            enabled,
            model_filename: var("CODEFORGE_LOCAL_MODEL").unwrap_or(defaults.model_filename),
            port: var("CODEFORGE_LOCAL_PORT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.port),
            cache_capacity: var("CODEFORGE_CACHE_CAPACITY").and_then(|v| v.parse().ok()),
            ..defaults
        }
    }

    /// Create a builder for configuration.
    pub fn builder() -> LocalEngineConfigBuilder {
        LocalEngineConfigBuilder::default()
    }

    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }
}

/// Builder for local engine configuration.
#[derive(Debug, Default)]
pub struct LocalEngineConfigBuilder {
    config: LocalEngineConfig,
}

impl LocalEngineConfigBuilder {
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.config.enabled = enabled;
        self
    }

    pub fn task(mut self, task: impl Into<String>) -> Self {
        self.config.task = task.into();
        self
    }

    pub fn model_filename(mut self, filename: impl Into<String>) -> Self {
        self.config.model_filename = filename.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    pub fn data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.data_dir = dir.into();
        self
    }

    pub fn startup_timeout(mut self, timeout: Duration) -> Self {
        self.config.startup_timeout = timeout;
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    pub fn cache_capacity(mut self, capacity: usize) -> Self {
        self.config.cache_capacity = Some(capacity);
        self
    }

    pub fn build(self) -> LocalEngineConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LocalEngineConfig::default();
        assert!(config.enabled);
        assert_eq!(config.task, "Python code");
        assert_eq!(config.cache_capacity, None);
        assert_eq!(config.base_url(), "http://127.0.0.1:11435");
    }

    #[test]
    fn test_builder() {
        let config = LocalEngineConfig::builder()
            .enabled(false)
            .port(9000)
            .cache_capacity(32)
            .request_timeout(Duration::from_millis(250))
            .build();
        assert!(!config.enabled);
        assert_eq!(config.port, 9000);
        assert_eq!(config.cache_capacity, Some(32));
        assert_eq!(config.request_timeout, Duration::from_millis(250));
    }
}
