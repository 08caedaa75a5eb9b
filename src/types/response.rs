//! Chat response types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::content::MessageContent;
use super::tools::ToolCall;

/// Token accounting reported by the provider.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Why the model stopped generating.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum FinishReason {
    Stop,
    Length,
    ToolCalls,
    ContentFilter,
    Other(String),
}

impl FinishReason {
    /// Map the wire string of the OpenAI-compatible shape.
    pub fn from_wire(reason: &str) -> Self {
        match reason {
            "stop" => Self::Stop,
            "length" => Self::Length,
            "tool_calls" => Self::ToolCalls,
            "content_filter" => Self::ContentFilter,
            other => Self::Other(other.to_string()),
        }
    }
}

/// One chat completion response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub id: Option<String>,
    /// Model that actually served the request, as reported by the provider
    pub model: Option<String>,
    pub content: MessageContent,
    pub tool_calls: Option<Vec<ToolCall>>,
    pub finish_reason: Option<FinishReason>,
    pub usage: Option<Usage>,
    /// Creation timestamp reported by the provider
    pub created: Option<DateTime<Utc>>,
}

impl ChatResponse {
    /// A bare text response, mainly for test doubles.
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            id: None,
            model: None,
            content: MessageContent::Text(text.into()),
            tool_calls: None,
            finish_reason: Some(FinishReason::Stop),
            usage: None,
            created: None,
        }
    }

    /// The response text, if the content is plain text.
    pub fn text(&self) -> Option<&str> {
        self.content.as_text()
    }

    /// All text in the response, including text parts.
    pub fn all_text(&self) -> String {
        self.content.all_text()
    }

    pub fn has_tool_calls(&self) -> bool {
        self.tool_calls.as_ref().is_some_and(|calls| !calls.is_empty())
    }
}
