//! Scripted in-memory backend
//!
//! Plays back a queue of pre-arranged outcomes, one per `complete` call.
//! Used by the test suite and the offline demos to exercise retry behavior
//! without a network.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::ProviderError;
use crate::streaming::{ChatStream, ChatStreamEvent};
use crate::types::{ChatRequest, ChatResponse};

use super::ChatBackend;

/// A backend that answers from a script instead of a provider.
pub struct ScriptedBackend {
    provider_id: String,
    steps: Mutex<VecDeque<Result<ChatResponse, ProviderError>>>,
    stream_events: Mutex<Option<Vec<Result<ChatStreamEvent, ProviderError>>>>,
    calls: AtomicU32,
}

impl ScriptedBackend {
    pub fn new(provider_id: impl Into<String>) -> Self {
        Self {
            provider_id: provider_id.into(),
            steps: Mutex::new(VecDeque::new()),
            stream_events: Mutex::new(None),
            calls: AtomicU32::new(0),
        }
    }

    /// Queue a successful text response.
    pub fn then_text(mut self, text: &str) -> Self {
        self.steps
            .get_mut()
            .push_back(Ok(ChatResponse::from_text(text)));
        self
    }

    /// Queue a successful response.
    pub fn then_ok(mut self, response: ChatResponse) -> Self {
        self.steps.get_mut().push_back(Ok(response));
        self
    }

    /// Queue a failure.
    pub fn then_err(mut self, error: ProviderError) -> Self {
        self.steps.get_mut().push_back(Err(error));
        self
    }

    /// Queue `n` copies of the same failure.
    pub fn fail_times(mut self, n: u32, error: ProviderError) -> Self {
        for _ in 0..n {
            self.steps.get_mut().push_back(Err(error.clone()));
        }
        self
    }

    /// Script the events `complete_stream` plays back.
    pub fn with_stream_events(
        mut self,
        events: Vec<Result<ChatStreamEvent, ProviderError>>,
    ) -> Self {
        *self.stream_events.get_mut() = Some(events);
        self
    }

    /// Number of `complete` calls received so far.
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChatBackend for ScriptedBackend {
    fn provider_id(&self) -> &str {
        &self.provider_id
    }

    async fn complete(&self, _request: ChatRequest) -> Result<ChatResponse, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.steps.lock().await.pop_front() {
            Some(step) => step,
            None => Err(ProviderError::Internal(
                "scripted backend has no steps left".to_string(),
            )),
        }
    }

    async fn complete_stream(&self, _request: ChatRequest) -> Result<ChatStream, ProviderError> {
        match self.stream_events.lock().await.take() {
            Some(events) => Ok(Box::pin(futures_util::stream::iter(events))),
            None => Err(ProviderError::Stream(
                "scripted backend has no stream events".to_string(),
            )),
        }
    }
}
