//! # refrain
//!
//! A resilient chat-completion harness for OpenAI-compatible LLM providers.
//!
//! One [`OpenAiCompatibleBackend`] speaks the shared `chat/completions` wire
//! shape, so the same code path reaches OpenAI, Anthropic and Gemini; every
//! call site wraps its requests in the [`RetryingInvoker`], which classifies
//! failures, backs off exponentially with optional jitter, and reports a
//! terminal [`InvocationResult`] instead of raising for expected failures.
//!
//! ```rust,no_run
//! use refrain::prelude::*;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ProviderConfig::openai_from_env()?;
//!     let backend = OpenAiCompatibleBackend::new(config)?;
//!
//!     let policy = RetryPolicy::new()
//!         .with_max_attempts(3)
//!         .with_initial_delay(Duration::from_secs(2))
//!         .with_jitter_range(Duration::from_millis(250));
//!
//!     let request = ChatRequest::builder("gpt-4o-mini")
//!         .user("What is the capital of France? Answer in one word.")
//!         .build();
//!
//!     match backend.complete_with_retry(request, &policy).await {
//!         InvocationResult::Completed { value, attempts } => {
//!             println!("{} (attempts: {attempts})", value.all_text());
//!         }
//!         InvocationResult::GaveUp { error, attempts } => {
//!             println!("gave up after {attempts} attempt(s): {error}");
//!         }
//!         InvocationResult::Cancelled { .. } => println!("cancelled"),
//!     }
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod cancel;
pub mod config;
pub mod error;
pub mod observability;
pub mod retry;
pub mod streaming;
pub mod types;

pub use backend::{ChatBackend, ChatBackendExt, OpenAiCompatibleBackend, ScriptedBackend};
pub use cancel::CancelHandle;
pub use config::ProviderConfig;
pub use error::{ErrorCategory, ProviderError};
pub use retry::{
    AttemptOutcome, InvocationResult, RetryPolicy, RetryingInvoker, retry, retry_with,
};
pub use streaming::{ChatStream, ChatStreamEvent, ChatStreamHandle};

/// Common imports for applications.
pub mod prelude {
    pub use crate::backend::{
        ChatBackend, ChatBackendExt, OpenAiCompatibleBackend, ScriptedBackend,
    };
    pub use crate::cancel::CancelHandle;
    pub use crate::config::ProviderConfig;
    pub use crate::error::ProviderError;
    pub use crate::retry::{InvocationResult, RetryPolicy, RetryingInvoker};
    pub use crate::streaming::{ChatStream, ChatStreamEvent, ChatStreamHandle};
    pub use crate::types::{
        ChatMessage, ChatRequest, ChatResponse, ContentPart, MediaSource, MessageContent,
        MessageRole, ModelParams, Tool, ToolCall, ToolChoice, Usage,
    };
}
