//! OpenAI-compatible HTTP backend
//!
//! One transport speaks the `POST {base_url}/chat/completions` shape that
//! OpenAI, Anthropic and Gemini all expose, so a single client covers every
//! configured provider. HTTP failures are classified into specific
//! [`ProviderError`] kinds before they reach the retry layer.

use std::collections::BTreeMap;
use std::time::Instant;

use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures_util::StreamExt;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::config::ProviderConfig;
use crate::error::{ProviderError, classify_http_response};
use crate::streaming::{ChatStream, ChatStreamEvent};
use crate::types::{
    ChatRequest, ChatResponse, ContentPart, FinishReason, MediaSource, MessageContent, Tool,
    ToolCall, ToolChoice, Usage,
};

use super::ChatBackend;

/// HTTP backend for one OpenAI-compatible provider endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiCompatibleBackend {
    config: ProviderConfig,
    http: reqwest::Client,
}

impl OpenAiCompatibleBackend {
    /// Build a backend with its own HTTP client, honouring
    /// [`ProviderConfig::timeout`].
    pub fn new(config: ProviderConfig) -> Result<Self, ProviderError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(|e| {
            ProviderError::Configuration(format!("failed to build http client: {e}"))
        })?;
        Ok(Self { config, http })
    }

    /// Build a backend on a shared HTTP client (connection pooling across
    /// backends). The client's own timeout settings apply.
    pub fn with_http_client(config: ProviderConfig, http: reqwest::Client) -> Self {
        Self { config, http }
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    fn completions_url(&self) -> String {
        format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        )
    }

    async fn send(
        &self,
        body: &WireRequest,
        sse: bool,
    ) -> Result<reqwest::Response, ProviderError> {
        let mut request = self
            .http
            .post(self.completions_url())
            .bearer_auth(self.config.api_key.expose_secret())
            .json(body);
        if sse {
            request = request
                .header(reqwest::header::ACCEPT, "text/event-stream")
                .header(reqwest::header::CACHE_CONTROL, "no-cache");
        }
        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            let headers = response.headers().clone();
            let body_text = response.text().await.unwrap_or_default();
            let error = classify_http_response(
                &self.config.provider_id,
                status.as_u16(),
                &body_text,
                &headers,
            );
            tracing::warn!(
                target: "refrain::backend",
                provider = %self.config.provider_id,
                status = status.as_u16(),
                category = error.category().as_str(),
                error = %error,
                "chat completion request failed"
            );
            return Err(error);
        }
        Ok(response)
    }
}

#[async_trait]
impl ChatBackend for OpenAiCompatibleBackend {
    fn provider_id(&self) -> &str {
        &self.config.provider_id
    }

    async fn complete(&self, request: ChatRequest) -> Result<ChatResponse, ProviderError> {
        let body = build_wire_request(&request, false)?;
        tracing::debug!(
            target: "refrain::backend",
            provider = %self.config.provider_id,
            model = %request.params.model,
            messages = request.messages.len(),
            "sending chat completion request"
        );

        let started = Instant::now();
        let response = self.send(&body, false).await?;
        let wire: WireResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(format!("invalid chat completion payload: {e}")))?;
        let converted = convert_response(wire)?;

        tracing::debug!(
            target: "refrain::backend",
            provider = %self.config.provider_id,
            model = %request.params.model,
            latency_ms = started.elapsed().as_millis() as u64,
            "chat completion succeeded"
        );
        Ok(converted)
    }

    async fn complete_stream(&self, request: ChatRequest) -> Result<ChatStream, ProviderError> {
        let body = build_wire_request(&request, true)?;
        tracing::debug!(
            target: "refrain::backend",
            provider = %self.config.provider_id,
            model = %request.params.model,
            "opening chat completion stream"
        );

        let response = self.send(&body, true).await?;
        let mut events = response.bytes_stream().eventsource();

        let stream = async_stream::stream! {
            let mut acc = StreamAccumulator::default();
            while let Some(event) = events.next().await {
                match event {
                    Ok(event) => {
                        let data = event.data.trim();
                        if data.is_empty() {
                            continue;
                        }
                        if data == "[DONE]" {
                            yield Ok(ChatStreamEvent::StreamEnd { response: acc.finish() });
                            return;
                        }
                        match serde_json::from_str::<WireChunk>(data) {
                            Ok(chunk) => {
                                for item in acc.ingest(chunk) {
                                    yield Ok(item);
                                }
                            }
                            Err(e) => {
                                yield Err(ProviderError::Parse(format!(
                                    "invalid stream chunk: {e}"
                                )));
                                return;
                            }
                        }
                    }
                    Err(e) => {
                        yield Err(ProviderError::Stream(format!("sse transport error: {e}")));
                        return;
                    }
                }
            }
            // Stream closed without a [DONE] marker; emit what we have.
            yield Ok(ChatStreamEvent::StreamEnd { response: acc.finish() });
        };
        Ok(Box::pin(stream))
    }
}

// -- wire shapes --------------------------------------------------------------

#[derive(Debug, Serialize)]
struct WireRequest {
    model: String,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<Tool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    stream: bool,
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    id: Option<String>,
    model: Option<String>,
    created: Option<i64>,
    choices: Vec<WireChoice>,
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct WireChoice {
    message: WireResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireResponseMessage {
    content: Option<String>,
    tool_calls: Option<Vec<ToolCall>>,
}

#[derive(Debug, Deserialize)]
struct WireUsage {
    prompt_tokens: Option<u32>,
    completion_tokens: Option<u32>,
    total_tokens: Option<u32>,
}

impl From<WireUsage> for Usage {
    fn from(wire: WireUsage) -> Self {
        let prompt_tokens = wire.prompt_tokens.unwrap_or(0);
        let completion_tokens = wire.completion_tokens.unwrap_or(0);
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: wire
                .total_tokens
                .unwrap_or(prompt_tokens + completion_tokens),
        }
    }
}

#[derive(Debug, Deserialize)]
struct WireChunk {
    id: Option<String>,
    model: Option<String>,
    choices: Vec<WireChunkChoice>,
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct WireChunkChoice {
    #[serde(default)]
    index: usize,
    delta: WireDelta,
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct WireDelta {
    content: Option<String>,
    tool_calls: Option<Vec<WireToolCallDelta>>,
}

#[derive(Debug, Deserialize)]
struct WireToolCallDelta {
    #[serde(default)]
    index: usize,
    id: Option<String>,
    function: Option<WireFunctionDelta>,
}

#[derive(Debug, Deserialize)]
struct WireFunctionDelta {
    name: Option<String>,
    arguments: Option<String>,
}

fn build_wire_request(request: &ChatRequest, stream: bool) -> Result<WireRequest, ProviderError> {
    if request.params.model.is_empty() {
        return Err(ProviderError::InvalidRequest("model is not set".to_string()));
    }
    if request.messages.is_empty() {
        return Err(ProviderError::InvalidRequest(
            "request has no messages".to_string(),
        ));
    }

    let messages = request
        .messages
        .iter()
        .map(|message| WireMessage {
            role: message.role.as_str(),
            content: if message.content.is_empty() && message.tool_calls.is_some() {
                None
            } else {
                Some(content_value(&message.content))
            },
            tool_calls: message.tool_calls.clone(),
            tool_call_id: message.tool_call_id.clone(),
        })
        .collect();

    Ok(WireRequest {
        model: request.params.model.clone(),
        messages,
        temperature: request.params.temperature,
        max_tokens: request.params.max_tokens,
        top_p: request.params.top_p,
        tools: request.tools.clone(),
        tool_choice: request.tool_choice.as_ref().map(tool_choice_value),
        stream,
    })
}

fn content_value(content: &MessageContent) -> serde_json::Value {
    match content {
        MessageContent::Text(text) => serde_json::Value::String(text.clone()),
        MessageContent::Parts(parts) => {
            serde_json::Value::Array(parts.iter().map(part_value).collect())
        }
    }
}

fn part_value(part: &ContentPart) -> serde_json::Value {
    match part {
        ContentPart::Text { text } => json!({ "type": "text", "text": text }),
        ContentPart::Image { source, mime_type } => {
            let url = match source {
                MediaSource::Url { url } => url.clone(),
                MediaSource::Base64 { data } => format!(
                    "data:{};base64,{data}",
                    mime_type.as_deref().unwrap_or("image/jpeg")
                ),
            };
            json!({ "type": "image_url", "image_url": { "url": url } })
        }
    }
}

fn tool_choice_value(choice: &ToolChoice) -> serde_json::Value {
    match choice {
        ToolChoice::Auto => json!("auto"),
        ToolChoice::None => json!("none"),
        ToolChoice::Required => json!("required"),
        ToolChoice::Tool { name } => json!({
            "type": "function",
            "function": { "name": name }
        }),
    }
}

fn convert_response(wire: WireResponse) -> Result<ChatResponse, ProviderError> {
    let choice = wire
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::Parse("response has no choices".to_string()))?;
    let tool_calls = choice.message.tool_calls.filter(|calls| !calls.is_empty());

    Ok(ChatResponse {
        id: wire.id,
        model: wire.model,
        content: MessageContent::Text(choice.message.content.unwrap_or_default()),
        tool_calls,
        finish_reason: choice.finish_reason.as_deref().map(FinishReason::from_wire),
        usage: wire.usage.map(Usage::from),
        created: wire
            .created
            .and_then(|secs| chrono::DateTime::from_timestamp(secs, 0)),
    })
}

// -- stream accumulation ------------------------------------------------------

/// Folds chunk deltas into the final response while forwarding each one as an
/// event.
#[derive(Default)]
struct StreamAccumulator {
    started: bool,
    id: Option<String>,
    model: Option<String>,
    content: String,
    // Keyed by the wire index, which is server-controlled and may be sparse
    // or arbitrarily large. Never size a Vec from it.
    tool_calls: BTreeMap<usize, PartialToolCall>,
    finish_reason: Option<FinishReason>,
    usage: Option<Usage>,
}

#[derive(Default)]
struct PartialToolCall {
    id: String,
    name: String,
    arguments: String,
}

impl StreamAccumulator {
    fn ingest(&mut self, chunk: WireChunk) -> Vec<ChatStreamEvent> {
        let mut events = Vec::new();

        if !self.started {
            self.started = true;
            self.id = chunk.id.clone();
            self.model = chunk.model.clone();
            events.push(ChatStreamEvent::StreamStart {
                id: chunk.id,
                model: chunk.model,
            });
        }

        for choice in chunk.choices {
            if let Some(delta) = choice.delta.content {
                if !delta.is_empty() {
                    self.content.push_str(&delta);
                    events.push(ChatStreamEvent::ContentDelta {
                        delta,
                        index: choice.index,
                    });
                }
            }
            for call in choice.delta.tool_calls.unwrap_or_default() {
                let partial = self.tool_calls.entry(call.index).or_default();
                if let Some(id) = &call.id {
                    partial.id = id.clone();
                }
                let (name, arguments_delta) = match &call.function {
                    Some(function) => (function.name.clone(), function.arguments.clone()),
                    None => (None, None),
                };
                if let Some(name) = &name {
                    partial.name = name.clone();
                }
                if let Some(arguments) = &arguments_delta {
                    partial.arguments.push_str(arguments);
                }
                events.push(ChatStreamEvent::ToolCallDelta {
                    index: call.index,
                    id: call.id,
                    name,
                    arguments_delta,
                });
            }
            if let Some(reason) = choice.finish_reason.as_deref() {
                self.finish_reason = Some(FinishReason::from_wire(reason));
            }
        }

        if let Some(usage) = chunk.usage {
            let usage = Usage::from(usage);
            self.usage = Some(usage);
            events.push(ChatStreamEvent::UsageUpdate { usage });
        }

        events
    }

    fn finish(self) -> ChatResponse {
        let tool_calls: Vec<ToolCall> = self
            .tool_calls
            .into_values()
            .filter(|call| !call.name.is_empty())
            .map(|call| ToolCall::new(call.id, call.name, call.arguments))
            .collect();

        ChatResponse {
            id: self.id,
            model: self.model,
            content: MessageContent::Text(self.content),
            tool_calls: if tool_calls.is_empty() {
                None
            } else {
                Some(tool_calls)
            },
            finish_reason: self.finish_reason,
            usage: self.usage,
            created: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChatMessage;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn wire_request_uses_plain_text_content() {
        let request = ChatRequest::builder("gpt-4o-mini")
            .system("Answer briefly.")
            .user("What is the capital of France?")
            .max_tokens(30)
            .build();
        let wire = build_wire_request(&request, false).unwrap();
        let value = serde_json::to_value(&wire).unwrap();

        assert_eq!(value["model"], "gpt-4o-mini");
        assert_eq!(value["messages"][0]["role"], "system");
        assert_eq!(value["messages"][1]["content"], "What is the capital of France?");
        assert_eq!(value["max_tokens"], 30);
        assert!(value.get("stream").is_none());
        assert!(value.get("tools").is_none());
    }

    #[test]
    fn wire_request_encodes_image_parts_as_data_urls() {
        let request = ChatRequest::builder("gpt-4o")
            .message(ChatMessage::user_parts(vec![
                ContentPart::text("What is in this image?"),
                ContentPart::image_base64("aGVsbG8=", "image/jpeg"),
            ]))
            .build();
        let wire = build_wire_request(&request, false).unwrap();
        let value = serde_json::to_value(&wire).unwrap();

        let parts = value["messages"][0]["content"].as_array().unwrap();
        assert_eq!(parts[0]["type"], "text");
        assert_eq!(parts[1]["type"], "image_url");
        assert_eq!(
            parts[1]["image_url"]["url"],
            "data:image/jpeg;base64,aGVsbG8="
        );
    }

    #[test]
    fn wire_request_carries_tool_round_trip_messages() {
        let call = ToolCall::new("call_1", "get_weather", r#"{"location":"SF"}"#);
        let request = ChatRequest::builder("gpt-4o")
            .user("Weather in SF?")
            .message(ChatMessage::assistant_tool_calls(vec![call]))
            .message(ChatMessage::tool_result("call_1", r#"{"temperature":18}"#))
            .build();
        let wire = build_wire_request(&request, false).unwrap();
        let value = serde_json::to_value(&wire).unwrap();

        let assistant = &value["messages"][1];
        assert_eq!(assistant["role"], "assistant");
        assert!(assistant.get("content").is_none());
        assert_eq!(assistant["tool_calls"][0]["id"], "call_1");
        assert_eq!(assistant["tool_calls"][0]["type"], "function");

        let tool = &value["messages"][2];
        assert_eq!(tool["role"], "tool");
        assert_eq!(tool["tool_call_id"], "call_1");
    }

    #[test]
    fn wire_request_sets_stream_flag_only_when_streaming() {
        let request = ChatRequest::builder("m").user("hi").build();
        let wire = build_wire_request(&request, true).unwrap();
        let value = serde_json::to_value(&wire).unwrap();
        assert_eq!(value["stream"], true);
    }

    #[test]
    fn wire_request_rejects_missing_model_and_messages() {
        let no_model = ChatRequest::builder("").user("hi").build();
        assert!(matches!(
            build_wire_request(&no_model, false),
            Err(ProviderError::InvalidRequest(_))
        ));

        let no_messages = ChatRequest::builder("m").build();
        assert!(matches!(
            build_wire_request(&no_messages, false),
            Err(ProviderError::InvalidRequest(_))
        ));
    }

    #[test]
    fn tool_choice_values_follow_the_wire_shape() {
        assert_eq!(tool_choice_value(&ToolChoice::Auto), json!("auto"));
        assert_eq!(
            tool_choice_value(&ToolChoice::Tool { name: "get_weather".into() }),
            json!({"type": "function", "function": {"name": "get_weather"}})
        );
    }

    #[test]
    fn convert_response_maps_the_first_choice() {
        let wire: WireResponse = serde_json::from_value(json!({
            "id": "chatcmpl-1",
            "model": "gpt-4o-mini",
            "created": 1727000000,
            "choices": [{
                "message": { "content": "Paris", "role": "assistant" },
                "finish_reason": "stop"
            }],
            "usage": { "prompt_tokens": 12, "completion_tokens": 1, "total_tokens": 13 }
        }))
        .unwrap();

        let response = convert_response(wire).unwrap();
        assert_eq!(response.text(), Some("Paris"));
        assert_eq!(response.finish_reason, Some(FinishReason::Stop));
        assert_eq!(response.usage.unwrap().total_tokens, 13);
        assert!(response.created.is_some());
    }

    #[test]
    fn convert_response_requires_a_choice() {
        let wire: WireResponse = serde_json::from_value(json!({ "choices": [] })).unwrap();
        assert!(matches!(
            convert_response(wire),
            Err(ProviderError::Parse(_))
        ));
    }

    #[test]
    fn accumulator_reassembles_text_and_tool_calls() {
        let mut acc = StreamAccumulator::default();

        let first: WireChunk = serde_json::from_value(json!({
            "id": "c1",
            "model": "gpt-4o",
            "choices": [{ "index": 0, "delta": { "content": "Hel" } }]
        }))
        .unwrap();
        let events = acc.ingest(first);
        assert!(matches!(events[0], ChatStreamEvent::StreamStart { .. }));
        assert!(matches!(
            &events[1],
            ChatStreamEvent::ContentDelta { delta, .. } if delta == "Hel"
        ));

        let second: WireChunk = serde_json::from_value(json!({
            "choices": [{
                "index": 0,
                "delta": {
                    "content": "lo",
                    "tool_calls": [{
                        "index": 0,
                        "id": "call_1",
                        "function": { "name": "get_weather", "arguments": "{\"loc" }
                    }]
                }
            }]
        }))
        .unwrap();
        acc.ingest(second);

        let third: WireChunk = serde_json::from_value(json!({
            "choices": [{
                "index": 0,
                "delta": {
                    "tool_calls": [{
                        "index": 0,
                        "function": { "arguments": "ation\":\"SF\"}" }
                    }]
                },
                "finish_reason": "tool_calls"
            }],
            "usage": { "prompt_tokens": 9, "completion_tokens": 5, "total_tokens": 14 }
        }))
        .unwrap();
        let events = acc.ingest(third);
        assert!(matches!(events.last(), Some(ChatStreamEvent::UsageUpdate { .. })));

        let response = acc.finish();
        assert_eq!(response.text(), Some("Hello"));
        assert_eq!(response.finish_reason, Some(FinishReason::ToolCalls));
        let calls = response.tool_calls.unwrap();
        assert_eq!(calls[0].function.name, "get_weather");
        assert_eq!(calls[0].function.arguments, r#"{"location":"SF"}"#);
    }

    #[test]
    fn accumulator_accepts_arbitrary_tool_call_indices() {
        let mut acc = StreamAccumulator::default();

        let chunk: WireChunk = serde_json::from_value(json!({
            "id": "c2",
            "model": "gpt-4o",
            "choices": [{
                "index": 0,
                "delta": {
                    "tool_calls": [
                        {
                            "index": 18446744073709551615u64,
                            "id": "call_far",
                            "function": { "name": "lookup", "arguments": "{}" }
                        },
                        {
                            "index": 7,
                            "id": "call_near",
                            "function": { "name": "get_weather", "arguments": "{}" }
                        }
                    ]
                },
                "finish_reason": "tool_calls"
            }]
        }))
        .unwrap();
        acc.ingest(chunk);

        let calls = acc.finish().tool_calls.unwrap();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].function.name, "get_weather");
        assert_eq!(calls[1].function.name, "lookup");
    }

    #[tokio::test]
    async fn shared_http_client_serves_the_backend() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "chatcmpl-1",
                "model": "gpt-4o-mini",
                "choices": [{
                    "index": 0,
                    "message": { "role": "assistant", "content": "Paris" },
                    "finish_reason": "stop"
                }]
            })))
            .mount(&server)
            .await;

        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(5))
            .build()
            .unwrap();
        let config = ProviderConfig::openai_compatible("pooled", "test-key", server.uri());
        let backend = OpenAiCompatibleBackend::with_http_client(config, http);

        let request = ChatRequest::builder("gpt-4o-mini").user("hi").build();
        let response = backend.complete(request).await.unwrap();
        assert_eq!(response.text(), Some("Paris"));
    }
}
