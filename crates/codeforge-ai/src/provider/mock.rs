//! Scripted provider for unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{CompletionParams, Provider};
use crate::config::ProviderKind;
use crate::error::ProviderError;
use crate::message::Message;

/// Returns queued replies in order and records every call.
pub struct MockProvider {
    replies: Mutex<VecDeque<Result<String, ProviderError>>>,
    calls: Mutex<Vec<(Vec<Message>, CompletionParams)>>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn replying(text: impl Into<String>) -> Self {
        let mock = Self::new();
        mock.push_reply(Ok(text.into()));
        mock
    }

    pub fn failing(err: ProviderError) -> Self {
        let mock = Self::new();
        mock.push_reply(Err(err));
        mock
    }

    pub fn push_reply(&self, reply: Result<String, ProviderError>) {
        self.replies.lock().unwrap().push_back(reply);
    }

    pub fn calls(&self) -> Vec<(Vec<Message>, CompletionParams)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Stub
    }

    async fn complete(
        &self,
        messages: &[Message],
        params: &CompletionParams,
    ) -> Result<String, ProviderError> {
        self.calls.lock().unwrap().push((messages.to_vec(), *params));
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok("Mock response".to_string()))
    }
}
