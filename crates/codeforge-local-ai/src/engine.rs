//! Local inference engine: background model loading, bounded greedy
//! generation, and response caching.

use std::fmt;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::cache::{CacheKey, ResponseCache};
use crate::config::LocalEngineConfig;
use crate::error::LocalAIError;
use crate::model::{CausalLm, ModelLoader};
use crate::{
    MAX_INPUT_TOKENS, MAX_LENGTH_CAP, MAX_NEW_TOKENS, MAX_TEMPERATURE, MIN_TEMPERATURE,
    NO_CODE_SENTINEL,
};

/// Prompt used to exercise a freshly loaded model.
const WARM_UP_PROMPT: &str = "def test():";
const WARM_UP_TOKENS: u32 = 2;

/// Lifecycle of the engine's model.
///
/// `Uninitialized -> Loading -> Ready | Failed`. `Failed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineStatus {
    Uninitialized,
    Loading,
    Ready,
    Failed,
}

impl EngineStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            EngineStatus::Uninitialized => "uninitialized",
            EngineStatus::Loading => "loading",
            EngineStatus::Ready => "ready",
            EngineStatus::Failed => "failed",
        }
    }

    /// Loading has finished, one way or the other.
    pub fn is_settled(self) -> bool {
        matches!(self, EngineStatus::Ready | EngineStatus::Failed)
    }
}

impl fmt::Display for EngineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

struct EngineState {
    status: EngineStatus,
    model: Option<Arc<dyn CausalLm>>,
    failure: Option<String>,
}

/// Owns one causal LM and serves short greedy completions from it.
///
/// Construct once at host start-up and share by `Arc`.
pub struct LocalEngine {
    enabled: bool,
    task: String,
    request_timeout: Duration,
    state: RwLock<EngineState>,
    status_tx: watch::Sender<EngineStatus>,
    cache: ResponseCache,
}

impl LocalEngine {
    pub fn new(config: &LocalEngineConfig) -> Self {
        let (status_tx, _) = watch::channel(EngineStatus::Uninitialized);
        Self {
            enabled: config.enabled,
            task: config.task.clone(),
            request_timeout: config.request_timeout,
            state: RwLock::new(EngineState {
                status: EngineStatus::Uninitialized,
                model: None,
                failure: None,
            }),
            status_tx,
            cache: ResponseCache::new(config.cache_capacity),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn status(&self) -> EngineStatus {
        self.read_state().status
    }

    /// Why loading failed, once the engine is `Failed`.
    pub fn failure_reason(&self) -> Option<String> {
        self.read_state().failure.clone()
    }

    /// Default deadline for [`LocalEngine::generate_with_timeout`].
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    /// Spawn the loading task.
    ///
    /// Returns `None` when the engine is disabled or loading was already
    /// started.
    pub fn start_loading(self: &Arc<Self>, loader: Arc<dyn ModelLoader>) -> Option<JoinHandle<()>> {
        if !self.enabled {
            info!("Local engine disabled, not loading a model");
            return None;
        }
        if !self.begin_loading() {
            return None;
        }

        let engine = Arc::clone(self);
        Some(tokio::spawn(async move {
            // Failures are logged and recorded in the engine state.
            let _ = engine.finish_loading(loader.as_ref()).await;
        }))
    }

    /// Load the model on the current task.
    ///
    /// Does nothing unless the engine is still `Uninitialized`. A loader
    /// failure leaves the engine `Failed` and is returned.
    pub async fn load(&self, loader: &dyn ModelLoader) -> Result<(), LocalAIError> {
        if !self.enabled {
            return Err(LocalAIError::Disabled);
        }
        if !self.begin_loading() {
            return Ok(());
        }
        self.finish_loading(loader).await
    }

    /// Wait until loading has settled and return the final status.
    pub async fn wait_until_settled(&self) -> EngineStatus {
        let mut rx = self.status_tx.subscribe();
        let settled = rx.wait_for(|status| status.is_settled()).await.map(|status| *status);
        settled.unwrap_or_else(|_| self.status())
    }

    /// Generate a short continuation for `prompt`.
    ///
    /// `max_length` is clamped to `[1, 24]` and `temperature` to
    /// `[0.1, 1.0]`; both only take part in the cache key, decoding is
    /// always greedy with a fixed number of new tokens. A cached answer is
    /// returned even while the model is not ready.
    pub async fn generate(
        &self,
        prompt: &str,
        max_length: i64,
        temperature: f32,
    ) -> Result<String, LocalAIError> {
        if !self.enabled {
            return Err(LocalAIError::Disabled);
        }
        if prompt.trim().is_empty() {
            return Err(LocalAIError::InvalidPrompt("prompt is empty".to_string()));
        }

        let key = CacheKey::new(
            prompt,
            clamp_max_length(max_length),
            clamp_temperature(temperature),
        );
        if let Some(cached) = self.cache.get(&key) {
            info!("Using cached response");
            return Ok(cached);
        }

        let model = {
            let state = self.read_state();
            match (&state.model, state.status) {
                (Some(model), EngineStatus::Ready) => Arc::clone(model),
                (_, status) => return Err(LocalAIError::ModelNotLoaded { state: status }),
            }
        };

        let full_prompt = wrap_prompt(&self.task, prompt);
        debug!("Using prompt: {:?}", full_prompt);

        let tokens = model.tokenize(&full_prompt).await?;
        if tokens.is_empty() {
            return Err(LocalAIError::InvalidPrompt("prompt produced no tokens".to_string()));
        }
        let input = keep_trailing(&tokens, MAX_INPUT_TOKENS);

        let output = model.generate_greedy(input, MAX_NEW_TOKENS).await?;

        let text = match output.strip_prefix(input) {
            Some(new_tokens) => model.detokenize(new_tokens).await?,
            None => {
                let decoded = model.detokenize(&output).await?;
                match decoded.strip_prefix(full_prompt.as_str()) {
                    Some(rest) => rest.to_string(),
                    None => decoded,
                }
            }
        };

        let code = match text.trim() {
            "" => NO_CODE_SENTINEL.to_string(),
            code => code.to_string(),
        };
        debug!("Generated code: {:?}", code);

        self.cache.insert(key, code.clone());
        Ok(code)
    }

    /// [`LocalEngine::generate`] under a deadline. On expiry the in-flight
    /// generation is dropped.
    pub async fn generate_with_timeout(
        &self,
        prompt: &str,
        max_length: i64,
        temperature: f32,
        timeout: Duration,
    ) -> Result<String, LocalAIError> {
        match tokio::time::timeout(timeout, self.generate(prompt, max_length, temperature)).await {
            Ok(result) => result,
            Err(_) => {
                warn!("Generation exceeded {:?}", timeout);
                Err(LocalAIError::GenerationTimeout(timeout))
            }
        }
    }

    fn begin_loading(&self) -> bool {
        let mut state = self.write_state();
        if state.status != EngineStatus::Uninitialized {
            debug!("Model loading already {}", state.status);
            return false;
        }
        state.status = EngineStatus::Loading;
        drop(state);

        self.status_tx.send_replace(EngineStatus::Loading);
        info!("Preloading model in background...");
        true
    }

    async fn finish_loading(&self, loader: &dyn ModelLoader) -> Result<(), LocalAIError> {
        let outcome = match loader.load().await {
            Ok(model) => {
                let warmed = warm_up(model.as_ref()).await;
                warmed.map(|()| model)
            }
            Err(err) => Err(err),
        };

        let (status, result) = {
            let mut state = self.write_state();
            let result = match outcome {
                Ok(model) => {
                    state.model = Some(model);
                    state.status = EngineStatus::Ready;
                    info!("Model preloaded successfully");
                    Ok(())
                }
                Err(err) => {
                    error!("Error preloading model: {}", err);
                    state.failure = Some(err.to_string());
                    state.status = EngineStatus::Failed;
                    Err(err)
                }
            };
            (state.status, result)
        };

        self.status_tx.send_replace(status);
        result
    }

    fn read_state(&self) -> RwLockReadGuard<'_, EngineState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, EngineState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }
}

async fn warm_up(model: &dyn CausalLm) -> Result<(), LocalAIError> {
    let tokens = model.tokenize(WARM_UP_PROMPT).await?;
    let output = model.generate_greedy(&tokens, WARM_UP_TOKENS).await?;
    let text = model.detokenize(&output).await?;
    info!("Test generation: {}", text);
    Ok(())
}

/// Wrapper prompt around the caller's request.
pub(crate) fn wrap_prompt(task: &str, prompt: &str) -> String {
    format!("# {task} to {prompt}:\ndef")
}

pub(crate) fn clamp_max_length(max_length: i64) -> u32 {
    max_length.clamp(1, i64::from(MAX_LENGTH_CAP)) as u32
}

pub(crate) fn clamp_temperature(temperature: f32) -> f32 {
    if temperature.is_nan() {
        return MIN_TEMPERATURE;
    }
    temperature.clamp(MIN_TEMPERATURE, MAX_TEMPERATURE)
}

fn keep_trailing(tokens: &[u32], limit: usize) -> &[u32] {
    &tokens[tokens.len().saturating_sub(limit)..]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tokio::sync::Notify;

    /// One token per char; continues every prompt with a fixed string.
    struct FakeModel {
        continuation: String,
        delay: Mutex<Option<Duration>>,
        invocations: AtomicUsize,
        last_input: Mutex<Vec<u32>>,
    }

    impl FakeModel {
        fn new(continuation: &str) -> Self {
            Self {
                continuation: continuation.to_string(),
                delay: Mutex::new(None),
                invocations: AtomicUsize::new(0),
                last_input: Mutex::new(Vec::new()),
            }
        }

        fn set_delay(&self, delay: Duration) {
            *self.delay.lock().unwrap() = Some(delay);
        }

        fn invocations(&self) -> usize {
            self.invocations.load(Ordering::SeqCst)
        }

        fn last_input_text(&self) -> String {
            self.last_input
                .lock()
                .unwrap()
                .iter()
                .filter_map(|&t| char::from_u32(t))
                .collect()
        }
    }

    #[async_trait::async_trait]
    impl CausalLm for FakeModel {
        async fn tokenize(&self, text: &str) -> Result<Vec<u32>, LocalAIError> {
            Ok(text.chars().map(u32::from).collect())
        }

        async fn detokenize(&self, tokens: &[u32]) -> Result<String, LocalAIError> {
            Ok(tokens.iter().filter_map(|&t| char::from_u32(t)).collect())
        }

        async fn generate_greedy(
            &self,
            prompt: &[u32],
            max_new_tokens: u32,
        ) -> Result<Vec<u32>, LocalAIError> {
            self.invocations.fetch_add(1, Ordering::SeqCst);
            *self.last_input.lock().unwrap() = prompt.to_vec();
            let delay = *self.delay.lock().unwrap();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            let mut output = prompt.to_vec();
            output.extend(self.continuation.chars().take(max_new_tokens as usize).map(u32::from));
            Ok(output)
        }
    }

    struct FakeLoader {
        model: Option<Arc<FakeModel>>,
        gate: Option<Arc<Notify>>,
    }

    impl FakeLoader {
        fn ready(model: Arc<FakeModel>) -> Self {
            Self {
                model: Some(model),
                gate: None,
            }
        }

        fn failing() -> Self {
            Self {
                model: None,
                gate: None,
            }
        }
    }

    #[async_trait::async_trait]
    impl ModelLoader for FakeLoader {
        async fn load(&self) -> Result<Arc<dyn CausalLm>, LocalAIError> {
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            match &self.model {
                Some(model) => Ok(model.clone() as Arc<dyn CausalLm>),
                None => Err(LocalAIError::ModelNotFound("distilgpt2.gguf".to_string())),
            }
        }
    }

    async fn ready_engine(model: Arc<FakeModel>) -> LocalEngine {
        let engine = LocalEngine::new(&LocalEngineConfig::default());
        engine.load(&FakeLoader::ready(model)).await.unwrap();
        engine
    }

    #[test]
    fn test_clamps() {
        assert_eq!(clamp_temperature(5.0), 1.0);
        assert_eq!(clamp_temperature(-1.0), 0.1);
        assert_eq!(clamp_temperature(0.5), 0.5);
        assert_eq!(clamp_temperature(f32::NAN), 0.1);
        assert_eq!(clamp_max_length(1000), 24);
        assert_eq!(clamp_max_length(0), 1);
        assert_eq!(clamp_max_length(-5), 1);
        assert_eq!(clamp_max_length(10), 10);
    }

    #[test]
    fn test_wrap_prompt() {
        assert_eq!(
            wrap_prompt("Python code", "add two numbers"),
            "# Python code to add two numbers:\ndef"
        );
    }

    #[tokio::test]
    async fn test_generation_strips_prompt() {
        let model = Arc::new(FakeModel::new(" add(a, b):"));
        let engine = ready_engine(model.clone()).await;

        let code = engine.generate("add", 200, 0.7).await.unwrap();
        assert_eq!(code, "add(a, b):");
    }

    #[tokio::test]
    async fn test_cache_hit_invokes_model_once() {
        let model = Arc::new(FakeModel::new(" add(a, b):"));
        let engine = ready_engine(model.clone()).await;
        let after_warm_up = model.invocations();

        let first = engine.generate("add two numbers", 200, 0.7).await.unwrap();
        let second = engine.generate("add two numbers", 200, 0.7).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(model.invocations() - after_warm_up, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_misses_settle_on_one_entry() {
        let model = Arc::new(FakeModel::new(" add(a, b):"));
        let engine = ready_engine(model.clone()).await;
        let after_warm_up = model.invocations();
        model.set_delay(Duration::from_millis(50));

        let (a, b, c, d) = tokio::join!(
            engine.generate("add two numbers", 10, 0.5),
            engine.generate("add two numbers", 10, 0.5),
            engine.generate("add two numbers", 10, 0.5),
            engine.generate("add two numbers", 10, 0.5),
        );

        let results = [a.unwrap(), b.unwrap(), c.unwrap(), d.unwrap()];
        assert!(results.iter().all(|code| code == "add(a, b):"));
        assert!(model.invocations() - after_warm_up >= 1);
        assert_eq!(engine.cache().len(), 1);
    }

    #[tokio::test]
    async fn test_clamped_parameters_share_cache_entry() {
        let model = Arc::new(FakeModel::new(" x():"));
        let engine = ready_engine(model.clone()).await;
        let after_warm_up = model.invocations();

        engine.generate("x", 1000, 5.0).await.unwrap();
        engine.generate("x", 24, 1.0).await.unwrap();
        engine.generate("x", -3, -1.0).await.unwrap();
        engine.generate("x", 1, 0.1).await.unwrap();

        // (24, 1.0) and (1, 0.1) are the only distinct keys after clamping
        assert_eq!(model.invocations() - after_warm_up, 2);
        assert_eq!(engine.cache().len(), 2);
    }

    #[tokio::test]
    async fn test_empty_continuation_yields_sentinel() {
        let model = Arc::new(FakeModel::new("   "));
        let engine = ready_engine(model).await;
        assert_eq!(engine.generate("nothing", 10, 0.5).await.unwrap(), NO_CODE_SENTINEL);
    }

    #[tokio::test]
    async fn test_long_prompt_keeps_instruction_suffix() {
        let model = Arc::new(FakeModel::new(" f():"));
        let engine = ready_engine(model.clone()).await;

        let prompt = "a".repeat(200);
        engine.generate(&prompt, 10, 0.5).await.unwrap();

        let input = model.last_input_text();
        assert_eq!(input.chars().count(), MAX_INPUT_TOKENS);
        assert!(input.ends_with(":\ndef"));
    }

    #[tokio::test]
    async fn test_request_before_ready() {
        let engine = LocalEngine::new(&LocalEngineConfig::default());
        let err = engine.generate("add", 10, 0.5).await.unwrap_err();
        assert!(matches!(
            err,
            LocalAIError::ModelNotLoaded {
                state: EngineStatus::Uninitialized
            }
        ));
    }

    #[tokio::test]
    async fn test_request_while_loading_fails_fast() {
        let gate = Arc::new(Notify::new());
        let loader = Arc::new(FakeLoader {
            model: Some(Arc::new(FakeModel::new(" f():"))),
            gate: Some(gate.clone()),
        });
        let engine = Arc::new(LocalEngine::new(&LocalEngineConfig::default()));

        let handle = engine.start_loading(loader.clone()).unwrap();
        assert_eq!(engine.status(), EngineStatus::Loading);
        assert!(engine.start_loading(loader).is_none());

        let err = engine.generate("add", 10, 0.5).await.unwrap_err();
        assert!(matches!(
            err,
            LocalAIError::ModelNotLoaded {
                state: EngineStatus::Loading
            }
        ));

        gate.notify_one();
        handle.await.unwrap();
        assert_eq!(engine.wait_until_settled().await, EngineStatus::Ready);
        assert!(engine.generate("add", 10, 0.5).await.is_ok());
    }

    #[tokio::test]
    async fn test_failed_load_is_terminal() {
        let engine = Arc::new(LocalEngine::new(&LocalEngineConfig::default()));
        let handle = engine.start_loading(Arc::new(FakeLoader::failing())).unwrap();
        handle.await.unwrap();

        assert_eq!(engine.status(), EngineStatus::Failed);
        assert!(engine.failure_reason().unwrap().contains("distilgpt2.gguf"));

        let retry = engine.start_loading(Arc::new(FakeLoader::ready(Arc::new(
            FakeModel::new("x"),
        ))));
        assert!(retry.is_none());
        assert!(matches!(
            engine.generate("add", 10, 0.5).await,
            Err(LocalAIError::ModelNotLoaded {
                state: EngineStatus::Failed
            })
        ));
    }

    #[tokio::test]
    async fn test_timeout_is_distinct_from_not_loaded() {
        let model = Arc::new(FakeModel::new(" f():"));
        let engine = ready_engine(model.clone()).await;
        model.set_delay(Duration::from_secs(5));

        let err = engine
            .generate_with_timeout("add", 10, 0.5, Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LocalAIError::GenerationTimeout(d) if d == Duration::from_millis(50)
        ));
        assert!(engine.cache().is_empty());
    }

    #[tokio::test]
    async fn test_cache_served_when_not_ready() {
        let engine = LocalEngine::new(&LocalEngineConfig::default());
        engine
            .cache()
            .insert(CacheKey::new("add", 10, 0.5), "return a + b".to_string());

        assert_eq!(engine.generate("add", 10, 0.5).await.unwrap(), "return a + b");
    }

    #[tokio::test]
    async fn test_disabled_engine() {
        let config = LocalEngineConfig::builder().enabled(false).build();
        let engine = Arc::new(LocalEngine::new(&config));
        assert!(engine
            .start_loading(Arc::new(FakeLoader::failing()))
            .is_none());
        assert!(matches!(
            engine.generate("add", 10, 0.5).await,
            Err(LocalAIError::Disabled)
        ));
    }
}
