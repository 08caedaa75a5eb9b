//! Backend trait and extensions
//!
//! A backend performs exactly one completion attempt per call and reports
//! failures as classified [`ProviderError`]s; everything about retrying,
//! cancellation and convenience wrapping lives in [`ChatBackendExt`], which
//! every backend gets for free.

use async_trait::async_trait;

use crate::cancel::make_cancellable_stream;
use crate::error::ProviderError;
use crate::retry::{InvocationResult, RetryPolicy, RetryingInvoker};
use crate::streaming::{ChatStream, ChatStreamHandle};
use crate::types::{ChatMessage, ChatRequest, ChatResponse};

pub mod openai_compat;
pub mod scripted;

pub use openai_compat::OpenAiCompatibleBackend;
pub use scripted::ScriptedBackend;

/// A client able to perform single chat completion calls.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Short label identifying the provider behind this backend.
    fn provider_id(&self) -> &str;

    /// Perform one completion call. One invocation, one attempt; retry
    /// belongs to the caller.
    async fn complete(&self, request: ChatRequest) -> Result<ChatResponse, ProviderError>;

    /// Perform one streaming completion call.
    async fn complete_stream(&self, request: ChatRequest) -> Result<ChatStream, ProviderError>;
}

/// Retry wiring and conveniences available on every [`ChatBackend`].
#[async_trait]
pub trait ChatBackendExt: ChatBackend {
    /// Run a completion under a retry policy, reporting the terminal outcome
    /// with its attempt count. The request is cloned into each attempt.
    async fn complete_with_retry(
        &self,
        request: ChatRequest,
        policy: &RetryPolicy,
    ) -> InvocationResult<ChatResponse> {
        let invoker = RetryingInvoker::new(policy.clone());
        invoker
            .invoke(|| {
                let request = request.clone();
                async move { self.complete(request).await }
            })
            .await
    }

    /// Like [`complete_with_retry`](Self::complete_with_retry), but observing
    /// a cancellation handle before each attempt and during each backoff.
    async fn complete_with_retry_cancellable(
        &self,
        request: ChatRequest,
        policy: &RetryPolicy,
        cancel: crate::cancel::CancelHandle,
    ) -> InvocationResult<ChatResponse> {
        let invoker = RetryingInvoker::new(policy.clone()).with_cancellation(cancel);
        invoker
            .invoke(|| {
                let request = request.clone();
                async move { self.complete(request).await }
            })
            .await
    }

    /// Open a stream and pair it with a cancel handle.
    async fn complete_stream_cancellable(
        &self,
        request: ChatRequest,
    ) -> Result<ChatStreamHandle, ProviderError> {
        let stream = self.complete_stream(request).await?;
        let (stream, cancel) = make_cancellable_stream(stream);
        Ok(ChatStreamHandle { stream, cancel })
    }

    /// One-line question, text answer.
    async fn ask(&self, model: &str, prompt: &str) -> Result<String, ProviderError> {
        let request = ChatRequest::builder(model).user(prompt).build();
        let response = self.complete(request).await?;
        extract_text(response)
    }

    /// One-line question under a system prompt.
    async fn ask_with_system(
        &self,
        model: &str,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<String, ProviderError> {
        let request = ChatRequest::builder(model)
            .message(ChatMessage::system(system_prompt))
            .message(ChatMessage::user(user_prompt))
            .build();
        let response = self.complete(request).await?;
        extract_text(response)
    }
}

impl<T: ChatBackend + ?Sized> ChatBackendExt for T {}

fn extract_text(response: ChatResponse) -> Result<String, ProviderError> {
    let text = response.all_text();
    if text.is_empty() {
        Err(ProviderError::Internal(
            "no text in response".to_string(),
        ))
    } else {
        Ok(text)
    }
}
