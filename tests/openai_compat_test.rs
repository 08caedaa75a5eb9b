//! Mock API tests for the OpenAI-compatible backend.
//!
//! wiremock plays the provider; response bodies follow the published
//! `chat/completions` formats so the classification and accumulation logic
//! is exercised against realistic payloads.

use std::time::Duration;

use futures_util::StreamExt;
use refrain::prelude::*;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn backend_for(server: &MockServer) -> OpenAiCompatibleBackend {
    let config = ProviderConfig::openai_compatible("test", "test-key", server.uri());
    OpenAiCompatibleBackend::new(config).unwrap()
}

fn chat_completion_body() -> serde_json::Value {
    json!({
        "id": "chatcmpl-123",
        "object": "chat.completion",
        "created": 1727000000,
        "model": "gpt-4o-mini",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": "Paris" },
            "finish_reason": "stop"
        }],
        "usage": { "prompt_tokens": 14, "completion_tokens": 1, "total_tokens": 15 }
    })
}

fn error_body(error_type: &str, message: &str) -> serde_json::Value {
    json!({ "error": { "type": error_type, "message": message, "param": null } })
}

#[tokio::test]
async fn completes_a_chat_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .and(header("content-type", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_completion_body()))
        .mount(&server)
        .await;

    let backend = backend_for(&server);
    let request = ChatRequest::builder("gpt-4o-mini")
        .user("What is the capital of France? One word answer.")
        .build();

    let response = backend.complete(request).await.unwrap();
    assert_eq!(response.text(), Some("Paris"));
    assert_eq!(response.model.as_deref(), Some("gpt-4o-mini"));
    assert_eq!(response.usage.unwrap().total_tokens, 15);
    assert!(!response.has_tool_calls());
}

#[tokio::test]
async fn sends_the_chat_completions_wire_shape() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({
            "model": "gpt-4o-mini",
            "max_tokens": 30,
            "messages": [
                { "role": "system", "content": "Answer briefly." },
                { "role": "user", "content": "Capital of France?" }
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_completion_body()))
        .mount(&server)
        .await;

    let backend = backend_for(&server);
    let request = ChatRequest::builder("gpt-4o-mini")
        .system("Answer briefly.")
        .user("Capital of France?")
        .max_tokens(30)
        .build();

    // Fails with a 404-shaped error if the body does not match the mock.
    backend.complete(request).await.unwrap();
}

#[tokio::test]
async fn classifies_provider_failures_by_status_and_body() {
    async fn fail_with(status: u16, body: serde_json::Value) -> ProviderError {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(status).set_body_json(body))
            .mount(&server)
            .await;
        let request = ChatRequest::builder("gpt-4o-mini").user("hi").build();
        backend_for(&server).complete(request).await.unwrap_err()
    }

    let err = fail_with(401, error_body("invalid_request_error", "Incorrect API key")).await;
    assert!(matches!(err, ProviderError::Authentication(_)));
    assert!(!err.is_retryable());

    let err = fail_with(404, error_body("invalid_request_error", "model not found")).await;
    assert!(matches!(err, ProviderError::ModelNotFound(_)));
    assert!(!err.is_retryable());

    let err = fail_with(400, error_body("invalid_request_error", "missing messages")).await;
    assert!(matches!(err, ProviderError::InvalidRequest(_)));
    assert!(!err.is_retryable());

    let err = fail_with(529, error_body("overloaded_error", "Overloaded")).await;
    assert!(matches!(err, ProviderError::Overloaded(_)));
    assert!(err.is_retryable());

    // Overload announced in the body even though the status is generic.
    let err = fail_with(503, error_body("overloaded_error", "Overloaded")).await;
    assert!(matches!(err, ProviderError::Overloaded(_)));
    assert!(err.is_retryable());

    let err = fail_with(500, json!({"message": "internal"})).await;
    match &err {
        ProviderError::Api { status, .. } => assert_eq!(*status, 500),
        other => panic!("unexpected error variant: {other:?}"),
    }
    assert!(err.is_retryable());
}

#[tokio::test]
async fn rate_limits_carry_the_retry_after_header() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("retry-after", "30")
                .set_body_json(error_body("rate_limit_error", "Too many requests")),
        )
        .mount(&server)
        .await;

    let request = ChatRequest::builder("gpt-4o-mini").user("hi").build();
    let err = backend_for(&server).complete(request).await.unwrap_err();
    match err {
        ProviderError::RateLimited { retry_after, .. } => {
            assert_eq!(retry_after, Some(Duration::from_secs(30)));
        }
        other => panic!("unexpected error variant: {other:?}"),
    }
}

#[tokio::test]
async fn retries_transient_failures_until_success() {
    let server = MockServer::start().await;

    // Two 503s, then the real answer.
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(503).set_body_json(error_body("overloaded_error", "Overloaded")),
        )
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_completion_body()))
        .mount(&server)
        .await;

    let backend = backend_for(&server);
    let policy = RetryPolicy::new()
        .with_max_attempts(3)
        .with_initial_delay(Duration::from_millis(5));
    let request = ChatRequest::builder("gpt-4o-mini").user("hi").build();

    match backend.complete_with_retry(request, &policy).await {
        InvocationResult::Completed { value, attempts } => {
            assert_eq!(value.text(), Some("Paris"));
            assert_eq!(attempts, 3);
        }
        other => panic!("expected Completed, got {other:?}"),
    }
}

#[tokio::test]
async fn fatal_failures_are_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(error_body("invalid_request_error", "Incorrect API key")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let backend = backend_for(&server);
    let policy = RetryPolicy::new()
        .with_max_attempts(5)
        .with_initial_delay(Duration::from_millis(5));
    let request = ChatRequest::builder("gpt-4o-mini").user("hi").build();

    match backend.complete_with_retry(request, &policy).await {
        InvocationResult::GaveUp { error, attempts } => {
            assert_eq!(attempts, 1);
            assert!(matches!(error, ProviderError::Authentication(_)));
        }
        other => panic!("expected GaveUp, got {other:?}"),
    }
}

#[tokio::test]
async fn streams_content_deltas_and_accumulates_the_final_response() {
    let server = MockServer::start().await;
    let sse = concat!(
        "data: {\"id\":\"chatcmpl-9\",\"model\":\"gpt-4o-mini\",\"choices\":[{\"index\":0,\"delta\":{\"role\":\"assistant\",\"content\":\"\"}}]}\n\n",
        "data: {\"id\":\"chatcmpl-9\",\"choices\":[{\"index\":0,\"delta\":{\"content\":\"Hel\"}}]}\n\n",
        "data: {\"id\":\"chatcmpl-9\",\"choices\":[{\"index\":0,\"delta\":{\"content\":\"lo\"}}]}\n\n",
        "data: {\"id\":\"chatcmpl-9\",\"choices\":[{\"index\":0,\"delta\":{},\"finish_reason\":\"stop\"}],\"usage\":{\"prompt_tokens\":9,\"completion_tokens\":2,\"total_tokens\":11}}\n\n",
        "data: [DONE]\n\n",
    );

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("accept", "text/event-stream"))
        .and(body_partial_json(json!({ "stream": true })))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .set_body_raw(sse, "text/event-stream"),
        )
        .mount(&server)
        .await;

    let backend = backend_for(&server);
    let request = ChatRequest::builder("gpt-4o-mini")
        .user("Say hello.")
        .build();

    let mut stream = backend.complete_stream(request).await.unwrap();
    let mut events = Vec::new();
    while let Some(event) = stream.next().await {
        events.push(event.unwrap());
    }

    assert!(matches!(
        &events[0],
        ChatStreamEvent::StreamStart { id: Some(id), .. } if id == "chatcmpl-9"
    ));
    let text: String = events
        .iter()
        .filter_map(|event| match event {
            ChatStreamEvent::ContentDelta { delta, .. } => Some(delta.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(text, "Hello");
    assert!(matches!(
        &events[events.len() - 2],
        ChatStreamEvent::UsageUpdate { usage } if usage.total_tokens == 11
    ));
    match events.last() {
        Some(ChatStreamEvent::StreamEnd { response }) => {
            assert_eq!(response.text(), Some("Hello"));
            assert_eq!(response.usage.unwrap().total_tokens, 11);
        }
        other => panic!("expected StreamEnd, got {other:?}"),
    }
}

#[tokio::test]
async fn maps_tool_call_responses() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "chatcmpl-55",
            "model": "gpt-4o",
            "choices": [{
                "index": 0,
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_abc123",
                        "type": "function",
                        "function": {
                            "name": "get_weather",
                            "arguments": "{\"location\":\"San Francisco, CA\"}"
                        }
                    }]
                },
                "finish_reason": "tool_calls"
            }]
        })))
        .mount(&server)
        .await;

    let backend = backend_for(&server);
    let request = ChatRequest::builder("gpt-4o")
        .user("What's the weather like in San Francisco today?")
        .tools(vec![Tool::function(
            "get_weather",
            "Get the current weather in a given location",
            json!({"type": "object", "properties": {"location": {"type": "string"}}}),
        )])
        .build();

    let response = backend.complete(request).await.unwrap();
    assert!(response.has_tool_calls());
    let calls = response.tool_calls.unwrap();
    assert_eq!(calls[0].id, "call_abc123");
    assert_eq!(calls[0].function.name, "get_weather");
    let args = calls[0].parsed_arguments().unwrap();
    assert_eq!(args["location"], "San Francisco, CA");
}

#[tokio::test]
async fn streams_tool_calls_with_oversized_wire_indices() {
    let server = MockServer::start().await;
    // The delta index is whatever the server says it is; usize::MAX here.
    let sse = concat!(
        "data: {\"id\":\"chatcmpl-77\",\"model\":\"gpt-4o\",\"choices\":[{\"index\":0,\"delta\":{\"role\":\"assistant\",\"tool_calls\":[{\"index\":18446744073709551615,\"id\":\"call_far\",\"function\":{\"name\":\"get_weather\",\"arguments\":\"{\"}}]}}]}\n\n",
        "data: {\"id\":\"chatcmpl-77\",\"choices\":[{\"index\":0,\"delta\":{\"tool_calls\":[{\"index\":18446744073709551615,\"function\":{\"arguments\":\"}\"}}]},\"finish_reason\":\"tool_calls\"}]}\n\n",
        "data: [DONE]\n\n",
    );

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .set_body_raw(sse, "text/event-stream"),
        )
        .mount(&server)
        .await;

    let backend = backend_for(&server);
    let request = ChatRequest::builder("gpt-4o")
        .user("What's the weather like in San Francisco today?")
        .build();

    let mut stream = backend.complete_stream(request).await.unwrap();
    let mut events = Vec::new();
    while let Some(event) = stream.next().await {
        events.push(event.unwrap());
    }

    let delta_names: Vec<_> = events
        .iter()
        .filter_map(|event| match event {
            ChatStreamEvent::ToolCallDelta { name, .. } => Some(name.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(delta_names, vec![Some("get_weather".to_string()), None]);
    match events.last() {
        Some(ChatStreamEvent::StreamEnd { response }) => {
            let calls = response.tool_calls.clone().unwrap();
            assert_eq!(calls.len(), 1);
            assert_eq!(calls[0].id, "call_far");
            assert_eq!(calls[0].function.name, "get_weather");
            assert_eq!(calls[0].function.arguments, "{}");
        }
        other => panic!("expected StreamEnd, got {other:?}"),
    }
}
