//! HTTP-level tests for the OpenAI-compatible adapter: response parsing,
//! auth headers, and the status-to-error-kind mapping, plus one full
//! dispatch through real HTTP against two mock servers.

use llmux_router::{
    DispatchRequest, Dispatcher, ErrorKind, OpenAiAdapter, ProviderAdapter, ProviderConfig,
    ProviderKind, RouterConfig,
};
use llmux_core::Message;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn provider_for(server: &MockServer, name: &str) -> ProviderConfig {
    ProviderConfig {
        name: name.to_string(),
        kind: ProviderKind::OpenAi,
        model: "gpt-4.1-mini".to_string(),
        reasoning_model: None,
        api_key: "sk-test".to_string(),
        api_base_url: Some(server.uri()),
        timeout_secs: 5,
        max_retries: 1,
        temperature: 0.7,
    }
}

fn completion_body(content: &str) -> serde_json::Value {
    serde_json::json!({
        "choices": [{
            "message": { "role": "assistant", "content": content },
            "finish_reason": "stop"
        }]
    })
}

#[tokio::test]
async fn successful_completion_returns_content() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("Authorization", "Bearer sk-test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("hello there")))
        .expect(1)
        .mount(&server)
        .await;

    let adapter = OpenAiAdapter::new(provider_for(&server, "openai"));
    let text = adapter
        .complete(&[Message::user("hi")], "gpt-4.1-mini", Duration::from_secs(5))
        .await
        .unwrap();
    assert_eq!(text, "hello there");
}

#[tokio::test]
async fn request_body_carries_configured_temperature() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_partial_json(serde_json::json!({"temperature": 0.2})))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("ok")))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = provider_for(&server, "openai");
    config.temperature = 0.2;
    let adapter = OpenAiAdapter::new(config);
    adapter
        .complete(&[Message::user("hi")], "gpt-4.1-mini", Duration::from_secs(5))
        .await
        .unwrap();
}

#[tokio::test]
async fn http_statuses_map_to_typed_kinds() {
    let cases = [
        (401, ErrorKind::Auth),
        (403, ErrorKind::Auth),
        (429, ErrorKind::RateLimit),
        (400, ErrorKind::InvalidRequest),
        (500, ErrorKind::Overloaded),
        (503, ErrorKind::Overloaded),
        (404, ErrorKind::Unknown),
    ];

    for (status, expected) in cases {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(status).set_body_string("nope"))
            .mount(&server)
            .await;

        let adapter = OpenAiAdapter::new(provider_for(&server, "openai"));
        let err = adapter
            .complete(&[Message::user("hi")], "gpt-4.1-mini", Duration::from_secs(5))
            .await
            .unwrap_err();
        assert_eq!(err.kind, expected, "status {status}");
        assert!(err.message.contains(&status.to_string()), "status {status}");
    }
}

#[tokio::test]
async fn slow_response_maps_to_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(completion_body("late"))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let adapter = OpenAiAdapter::new(provider_for(&server, "openai"));
    let err = adapter
        .complete(&[Message::user("hi")], "gpt-4.1-mini", Duration::from_millis(50))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Timeout);
}

#[tokio::test]
async fn unreachable_host_maps_to_network() {
    // `MockServer::start()` hands out pooled servers whose listener survives
    // drop; a builder-created server actually shuts down, so the port stops
    // serving once dropped.
    let server = MockServer::builder().start().await;
    let uri = server.uri();
    drop(server);

    let config = ProviderConfig {
        name: "openai".to_string(),
        kind: ProviderKind::OpenAi,
        model: "gpt-4.1-mini".to_string(),
        reasoning_model: None,
        api_key: "sk-test".to_string(),
        api_base_url: Some(uri),
        timeout_secs: 5,
        max_retries: 1,
        temperature: 0.7,
    };

    let adapter = OpenAiAdapter::new(config);
    let err = adapter
        .complete(&[Message::user("hi")], "gpt-4.1-mini", Duration::from_secs(5))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Network);
}

#[tokio::test]
async fn malformed_success_body_is_unknown() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"choices": []})))
        .mount(&server)
        .await;

    let adapter = OpenAiAdapter::new(provider_for(&server, "openai"));
    let err = adapter
        .complete(&[Message::user("hi")], "gpt-4.1-mini", Duration::from_secs(5))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Unknown);
    assert!(err.message.contains("missing message content"));
}

#[tokio::test]
async fn dispatch_fails_over_between_real_http_servers() {
    // Primary always rate-limits; secondary answers.
    let primary_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
        .expect(1)
        .mount(&primary_server)
        .await;

    let secondary_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("served by b")))
        .expect(1)
        .mount(&secondary_server)
        .await;

    let config = RouterConfig {
        providers: vec![
            provider_for(&primary_server, "primary"),
            provider_for(&secondary_server, "secondary"),
        ],
        cooldown_secs: 60,
        backoff_base_ms: 10,
        backoff_max_ms: 100,
        attempt_log_capacity: 64,
        auto_complexity_detection: false,
    };

    let dispatcher = Dispatcher::from_config(config);
    let result = dispatcher
        .dispatch(DispatchRequest::prompt("hi"))
        .await
        .unwrap();
    assert_eq!(result.provider, "secondary");
    assert_eq!(result.text, "served by b");
    assert_eq!(dispatcher.stats().total_fallbacks, 1);
}
