//! Chat request types

use serde::{Deserialize, Serialize};

use super::message::ChatMessage;
use super::tools::{Tool, ToolChoice};

/// Model selection and sampling parameters shared by all backends.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ModelParams {
    /// Model identifier, e.g. `gpt-4o-mini`
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
}

/// One chat completion request.
#[derive(Debug, Clone, Default)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    pub params: ModelParams,
    pub tools: Option<Vec<Tool>>,
    pub tool_choice: Option<ToolChoice>,
    /// Ask the backend for an event stream instead of a single response
    pub stream: bool,
}

impl ChatRequest {
    /// Start building a request for the given model.
    pub fn builder(model: impl Into<String>) -> ChatRequestBuilder {
        ChatRequestBuilder {
            request: Self {
                params: ModelParams {
                    model: model.into(),
                    ..Default::default()
                },
                ..Default::default()
            },
        }
    }
}

/// Builder for [`ChatRequest`].
#[derive(Debug, Clone)]
pub struct ChatRequestBuilder {
    request: ChatRequest,
}

impl ChatRequestBuilder {
    /// Append a system message.
    pub fn system(mut self, content: impl Into<String>) -> Self {
        self.request.messages.push(ChatMessage::system(content));
        self
    }

    /// Append a user message.
    pub fn user(mut self, content: impl Into<String>) -> Self {
        self.request.messages.push(ChatMessage::user(content));
        self
    }

    /// Append an arbitrary message.
    pub fn message(mut self, message: ChatMessage) -> Self {
        self.request.messages.push(message);
        self
    }

    /// Append several messages in order.
    pub fn messages(mut self, messages: impl IntoIterator<Item = ChatMessage>) -> Self {
        self.request.messages.extend(messages);
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.request.params.temperature = Some(temperature);
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.request.params.max_tokens = Some(max_tokens);
        self
    }

    pub fn top_p(mut self, top_p: f32) -> Self {
        self.request.params.top_p = Some(top_p);
        self
    }

    pub fn tools(mut self, tools: Vec<Tool>) -> Self {
        self.request.tools = Some(tools);
        self
    }

    pub fn tool_choice(mut self, tool_choice: ToolChoice) -> Self {
        self.request.tool_choice = Some(tool_choice);
        self
    }

    pub fn stream(mut self, stream: bool) -> Self {
        self.request.stream = stream;
        self
    }

    pub fn build(self) -> ChatRequest {
        self.request
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::message::MessageRole;

    #[test]
    fn builder_accumulates_messages_in_order() {
        let request = ChatRequest::builder("gpt-4o-mini")
            .system("You are terse.")
            .user("What is the capital of France?")
            .max_tokens(20)
            .temperature(0.2)
            .build();

        assert_eq!(request.params.model, "gpt-4o-mini");
        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.messages[0].role, MessageRole::System);
        assert_eq!(request.messages[1].role, MessageRole::User);
        assert_eq!(request.params.max_tokens, Some(20));
        assert!(!request.stream);
    }

    #[test]
    fn builder_attaches_tools() {
        let request = ChatRequest::builder("gpt-4o")
            .user("Weather in London?")
            .tools(vec![Tool::function(
                "get_weather",
                "Get current weather",
                serde_json::json!({"type": "object"}),
            )])
            .tool_choice(ToolChoice::Auto)
            .build();

        assert_eq!(request.tools.as_ref().map(Vec::len), Some(1));
        assert_eq!(request.tool_choice, Some(ToolChoice::Auto));
    }
}
