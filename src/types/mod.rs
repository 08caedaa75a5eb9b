//! Chat data model shared by all backends.

pub mod content;
pub mod message;
pub mod request;
pub mod response;
pub mod tools;

pub use content::{ContentPart, MediaSource, MessageContent};
pub use message::{ChatMessage, MessageRole};
pub use request::{ChatRequest, ChatRequestBuilder, ModelParams};
pub use response::{ChatResponse, FinishReason, Usage};
pub use tools::{FunctionCall, Tool, ToolCall, ToolChoice, ToolFunction};
