//! Process manager for llama-server.

use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::client::LlamaCppClient;
use crate::config::LocalEngineConfig;
use crate::error::LocalAIError;
use crate::paths::{llama_server_path, model_path};
use crate::{DEFAULT_PORT, MAX_INPUT_TOKENS, MAX_NEW_TOKENS};

/// How long a stopped server may take to exit before it is killed.
const STOP_GRACE: Duration = Duration::from_millis(500);

/// Manager for the llama-server process.
pub struct LlamaCppServer {
    port: u16,
    model_filename: String,
    data_dir: PathBuf,
    process: Option<Child>,
}

impl LlamaCppServer {
    /// Create a server manager for `model_filename` under `data_dir`.
    pub fn new(data_dir: impl Into<PathBuf>, model_filename: impl Into<String>) -> Self {
        Self {
            port: DEFAULT_PORT,
            model_filename: model_filename.into(),
            data_dir: data_dir.into(),
            process: None,
        }
    }

    pub fn from_config(config: &LocalEngineConfig) -> Self {
        Self::new(config.data_dir.clone(), config.model_filename.clone()).with_port(config.port)
    }

    /// Set a custom port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn binary_path(&self) -> PathBuf {
        llama_server_path(&self.data_dir)
    }

    pub fn model_path(&self) -> PathBuf {
        model_path(&self.data_dir, &self.model_filename)
    }

    /// Start the llama-server process.
    pub fn start(&mut self) -> Result<(), LocalAIError> {
        let server_path = self.binary_path();
        let model = self.model_path();

        if !server_path.exists() {
            return Err(LocalAIError::ServerBinaryNotFound(
                server_path.display().to_string(),
            ));
        }

        if !model.exists() {
            return Err(LocalAIError::ModelNotFound(self.model_filename.clone()));
        }

        info!(
            "Starting llama-server on port {} with model {}",
            self.port, self.model_filename
        );

        // Context only has to hold the truncated prompt plus the new tokens.
        let ctx_size = (MAX_INPUT_TOKENS as u32 + MAX_NEW_TOKENS).next_power_of_two().max(64);

        let child = Command::new(&server_path)
            .arg("--model")
            .arg(&model)
            .arg("--host")
            .arg("127.0.0.1")
            .arg("--port")
            .arg(self.port.to_string())
            .arg("--ctx-size")
            .arg(ctx_size.to_string())
            .arg("--n-predict")
            .arg(MAX_NEW_TOKENS.to_string())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| LocalAIError::ServerStartFailed(e.to_string()))?;

        debug!("llama-server process started with PID: {}", child.id());
        self.process = Some(child);

        Ok(())
    }

    /// Wait for the server to become ready.
    pub async fn wait_ready(&mut self, timeout: Duration) -> Result<(), LocalAIError> {
        let client = self.client();
        let start = Instant::now();
        let check_interval = Duration::from_millis(500);

        info!("Waiting for llama-server to become ready...");

        while start.elapsed() < timeout {
            if client.check_health().await.is_ok() {
                info!("llama-server is ready");
                return Ok(());
            }
            if self.process.is_some() && !self.is_running() {
                return Err(LocalAIError::ServerStartFailed(
                    "llama-server exited during start-up".to_string(),
                ));
            }
            sleep(check_interval).await;
        }

        Err(LocalAIError::ServerStartTimeout)
    }

    /// Stop the server process.
    ///
    /// Sends SIGTERM and returns at once. A reaper thread gives the process
    /// [`STOP_GRACE`] to exit before killing it, so this never blocks an
    /// async worker.
    pub fn stop(&mut self) -> Result<(), LocalAIError> {
        let Some(mut child) = self.process.take() else {
            return Ok(());
        };
        info!("Stopping llama-server (PID: {})", child.id());

        #[cfg(unix)]
        {
            // SAFETY: the PID belongs to a child we spawned and have not reaped.
            unsafe {
                libc::kill(child.id() as i32, libc::SIGTERM);
            }
        }

        std::thread::Builder::new()
            .name("llama-server-reaper".to_string())
            .spawn(move || reap(&mut child))
            .map_err(LocalAIError::Io)?;
        Ok(())
    }

    /// Check if the managed process is still alive.
    pub fn is_running(&mut self) -> bool {
        let Some(child) = self.process.as_mut() else {
            return false;
        };
        match child.try_wait() {
            Ok(None) => true,
            Ok(Some(_)) | Err(_) => {
                self.process = None;
                false
            }
        }
    }

    /// Get a client connected to this server.
    pub fn client(&self) -> LlamaCppClient {
        LlamaCppClient::with_port(self.port)
    }
}

/// Wait up to [`STOP_GRACE`] for a terminated child, then kill it.
fn reap(child: &mut Child) {
    let deadline = Instant::now() + STOP_GRACE;
    loop {
        match child.try_wait() {
            Ok(Some(status)) => {
                debug!("Server exited with status: {:?}", status);
                return;
            }
            Ok(None) if Instant::now() < deadline => {
                std::thread::sleep(Duration::from_millis(50));
            }
            Ok(None) => {
                warn!("Server didn't exit gracefully, killing...");
                let _ = child.kill();
                let _ = child.wait();
                return;
            }
            Err(e) => {
                warn!("Error checking server status: {}", e);
                let _ = child.kill();
                return;
            }
        }
    }
}

impl Drop for LlamaCppServer {
    fn drop(&mut self) {
        if self.process.is_some() {
            let _ = self.stop();
        }
    }
}
