//! Streaming chat types
//!
//! A [`ChatStream`] yields incremental [`ChatStreamEvent`]s as the provider
//! generates the response; the final `StreamEnd` carries the accumulated
//! [`ChatResponse`].

use std::pin::Pin;

use futures::Stream;

use crate::cancel::CancelHandle;
use crate::error::ProviderError;
use crate::types::{ChatResponse, Usage};

/// Incremental event emitted while a completion streams.
#[derive(Debug, Clone)]
pub enum ChatStreamEvent {
    /// First chunk arrived; identifiers as reported by the provider.
    StreamStart {
        id: Option<String>,
        model: Option<String>,
    },
    /// A piece of response text.
    ContentDelta { delta: String, index: usize },
    /// A piece of a tool call under construction.
    ToolCallDelta {
        index: usize,
        id: Option<String>,
        name: Option<String>,
        arguments_delta: Option<String>,
    },
    /// Token accounting, usually once near the end.
    UsageUpdate { usage: Usage },
    /// The stream finished; `response` is everything accumulated so far.
    StreamEnd { response: ChatResponse },
}

/// Boxed stream of chat events.
pub type ChatStream = Pin<Box<dyn Stream<Item = Result<ChatStreamEvent, ProviderError>> + Send>>;

/// A stream paired with the handle that cancels it.
pub struct ChatStreamHandle {
    pub stream: ChatStream,
    pub cancel: CancelHandle,
}
