mod common;

use common::MockTransport;
use serde_json::json;
use tsunagi::error::LlmError;
use tsunagi::types::{EmbeddingOptions, LlmOptions, Message};
use tsunagi::{ClientConfig, LlmClient, ProviderKind};

fn openai_config() -> ClientConfig {
    ClientConfig {
        provider: ProviderKind::OpenAi,
        api_key: Some("test-key".to_string()),
        endpoint: None,
        default_model: Some("gpt-4.1-mini".to_string()),
        embedding_model: Some("text-embedding-3-small".to_string()),
        default_options: LlmOptions::default(),
    }
}

#[tokio::test]
async fn send_conversation_builds_the_expected_payload() {
    let transport = MockTransport::new();
    transport.push_json(
        200,
        json!({
            "id": "chatcmpl-1",
            "model": "gpt-4.1-mini",
            "choices": [{
                "message": {"role": "assistant", "content": "hello!"},
                "finish_reason": "stop"
            }],
            "usage": {"prompt_tokens": 8, "completion_tokens": 2, "total_tokens": 10}
        }),
    );
    let client = LlmClient::from_config(&openai_config(), transport.clone()).expect("client");

    let mut options = LlmOptions {
        temperature: Some(0.5),
        system_prompt: Some("Be brief.".to_string()),
        ..Default::default()
    };
    options.extra.insert("top_k".to_string(), json!(40));

    let response = client
        .send_conversation(&[Message::user("hi")], &options)
        .await
        .expect("send should succeed");

    assert_eq!(response.content, "hello!");
    assert_eq!(response.model, "gpt-4.1-mini");
    assert_eq!(response.metadata["provider"], json!("openai"));
    let usage = response.usage.expect("usage present");
    assert_eq!(usage.total_tokens, Some(10));

    let requests = transport.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(
        requests[0].url,
        "https://api.openai.com/v1/chat/completions"
    );
    assert_eq!(
        requests[0].headers.get("Authorization"),
        Some(&"Bearer test-key".to_string())
    );

    let body = transport.request_body(0);
    assert_eq!(body["model"], json!("gpt-4.1-mini"));
    assert_eq!(body["temperature"], json!(0.5));
    assert_eq!(body["stream"], json!(false));
    // 未识别的键原样透传 不会换名或重复
    assert_eq!(body["top_k"], json!(40));
    // system_prompt 注入为首条 system 消息
    let messages = body["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["role"], json!("system"));
    assert_eq!(messages[0]["content"], json!("Be brief."));
}

#[tokio::test]
async fn backend_errors_are_normalized() {
    let transport = MockTransport::new();
    transport.push_json(
        401,
        json!({"error": {"message": "invalid api key", "type": "invalid_request_error"}}),
    );
    let client = LlmClient::from_config(&openai_config(), transport.clone()).expect("client");

    let err = client
        .send_message("hi", &LlmOptions::default())
        .await
        .expect_err("call should fail");

    match err {
        LlmError::Api {
            provider,
            status,
            message,
            details,
        } => {
            assert_eq!(provider, "openai");
            assert_eq!(status, 401);
            assert_eq!(message, "invalid api key");
            assert!(details.is_some(), "original payload is preserved");
        }
        other => panic!("unexpected error type: {other:?}"),
    }
}

#[tokio::test]
async fn stream_conversation_delivers_fragments_in_order() {
    let transport = MockTransport::new();
    transport.push_stream(
        200,
        &[
            "data: {\"model\":\"gpt-4.1-mini\",\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"!\"},\"finish_reason\":\"stop\"}]}\n\n",
            "data: [DONE]\n\n",
        ],
    );
    let client = LlmClient::from_config(&openai_config(), transport.clone()).expect("client");

    let mut seen = Vec::new();
    let mut callback = |fragment: &str| seen.push(fragment.to_string());
    let response = client
        .stream_conversation(&[Message::user("hi")], &mut callback, &LlmOptions::default())
        .await
        .expect("stream should succeed");

    assert_eq!(seen, vec!["Hel", "lo", "!"]);
    assert_eq!(response.content, "Hello!");
    assert!(response.usage.is_none(), "no usage unless the backend sent it");

    let body = transport.request_body(0);
    assert_eq!(body["stream"], json!(true));
}

#[tokio::test]
async fn embed_preserves_input_order_and_forces_float_encoding() {
    let transport = MockTransport::new();
    transport.push_json(
        200,
        json!({
            "model": "text-embedding-3-small",
            "data": [
                {"index": 1, "embedding": [0.2, 0.2]},
                {"index": 0, "embedding": [0.1, 0.1]},
                {"index": 2, "embedding": [0.3, 0.3]}
            ],
            "usage": {"prompt_tokens": 6, "total_tokens": 6}
        }),
    );
    let client = LlmClient::from_config(&openai_config(), transport.clone()).expect("client");

    let texts = vec!["t1".to_string(), "t2".to_string(), "t3".to_string()];
    let response = client
        .embed(&texts, &EmbeddingOptions::default())
        .await
        .expect("embed should succeed");

    assert_eq!(
        response.embeddings,
        vec![vec![0.1, 0.1], vec![0.2, 0.2], vec![0.3, 0.3]],
        "vectors must follow input order"
    );
    let usage = response.usage.expect("usage present");
    assert_eq!(usage.prompt_tokens, Some(6));
    assert_eq!(usage.completion_tokens, None);

    let requests = transport.requests();
    assert_eq!(requests[0].url, "https://api.openai.com/v1/embeddings");
    let body = transport.request_body(0);
    assert_eq!(body["encoding_format"], json!("float"));
    assert_eq!(body["input"], json!(["t1", "t2", "t3"]));
}

#[tokio::test]
async fn embed_without_a_model_fails_fast() {
    let transport = MockTransport::new();
    let mut config = openai_config();
    config.embedding_model = None;
    let client = LlmClient::from_config(&config, transport.clone()).expect("client");

    let err = client
        .embed(&["t".to_string()], &EmbeddingOptions::default())
        .await
        .expect_err("embed should fail");
    assert_eq!(err.status(), Some(400));
    assert!(transport.requests().is_empty(), "no network attempt");
}

#[tokio::test]
async fn available_models_returns_flat_ids() {
    let transport = MockTransport::new();
    transport.push_json(
        200,
        json!({"data": [{"id": "gpt-4.1"}, {"id": "gpt-4.1-mini"}]}),
    );
    let client = LlmClient::from_config(&openai_config(), transport.clone()).expect("client");

    let models = client.available_models().await.expect("models");
    assert_eq!(models, vec!["gpt-4.1".to_string(), "gpt-4.1-mini".to_string()]);
    assert_eq!(transport.requests()[0].url, "https://api.openai.com/v1/models");
}

#[tokio::test]
async fn endpoint_override_reroutes_every_call() {
    let transport = MockTransport::new();
    transport.push_json(
        200,
        json!({
            "model": "gpt-4.1-mini",
            "choices": [{"message": {"content": "ok"}, "finish_reason": "stop"}]
        }),
    );
    let mut config = openai_config();
    config.endpoint = Some("http://proxy.internal/v1".to_string());
    let client = LlmClient::from_config(&config, transport.clone()).expect("client");

    client
        .send_message("hi", &LlmOptions::default())
        .await
        .expect("send should succeed");
    assert_eq!(
        transport.requests()[0].url,
        "http://proxy.internal/v1/chat/completions"
    );
}
