use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tracing::debug;

use crate::core::{ExtractionRequest, ModelClient, RawModelResponse};
use crate::error::{AIError, ProviderError};

/// One scripted reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockResponse {
    /// Completion text, returned verbatim.
    Success(String),
    /// The provider refused with this reason.
    Blocked(String),
    /// A transport failure.
    Failure(String),
    /// The call timed out.
    Timeout,
}

/// What the client was asked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockCall {
    pub prompt: String,
    pub mime_type: String,
    pub document_len: usize,
}

/// Shared control over a `MockClient`: queue replies, inspect calls.
#[derive(Debug, Default)]
pub struct MockHandle {
    responses: Mutex<VecDeque<MockResponse>>,
    calls: Mutex<Vec<MockCall>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MockHandle {
    pub fn add_response(&self, response: MockResponse) {
        lock(&self.responses).push_back(response);
    }

    pub fn add_responses(&self, responses: impl IntoIterator<Item = MockResponse>) {
        lock(&self.responses).extend(responses);
    }

    pub fn calls(&self) -> Vec<MockCall> {
        lock(&self.calls).clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }

    pub fn remaining(&self) -> usize {
        lock(&self.responses).len()
    }

    fn next(&self, call: MockCall) -> Option<MockResponse> {
        lock(&self.calls).push(call);
        lock(&self.responses).pop_front()
    }
}

/// Scripted client standing in for a provider. Replies are consumed in order;
/// once they run out every call fails.
#[derive(Debug, Clone)]
pub struct MockClient {
    handle: Arc<MockHandle>,
}

impl MockClient {
    pub fn new() -> (Self, Arc<MockHandle>) {
        let handle = Arc::new(MockHandle::default());
        (Self { handle: handle.clone() }, handle)
    }

    pub fn with_responses(responses: impl IntoIterator<Item = MockResponse>) -> (Self, Arc<MockHandle>) {
        let (client, handle) = Self::new();
        handle.add_responses(responses);
        (client, handle)
    }
}

#[async_trait]
impl ModelClient for MockClient {
    async fn invoke(&self, prompt: String, document: &ExtractionRequest) -> Result<RawModelResponse, AIError> {
        let call = MockCall { prompt, mime_type: document.mime_type.clone(), document_len: document.len() };
        let response = self.handle.next(call);
        debug!(response = ?response, "Mock client replying");
        match response {
            Some(MockResponse::Success(text)) => Ok(RawModelResponse::text(text)),
            Some(MockResponse::Blocked(reason)) => Ok(RawModelResponse::blocked(reason)),
            Some(MockResponse::Failure(message)) => Err(AIError::Mock(message)),
            Some(MockResponse::Timeout) => Err(AIError::Gemini(ProviderError::Timeout)),
            None => Err(AIError::Mock("no scripted response left".to_string())),
        }
    }

    fn clone_box(&self) -> Box<dyn ModelClient> {
        Box::new(self.clone())
    }
}
