use std::collections::HashMap;

use futures_util::StreamExt;
use serde_json::Value;

use crate::error::LlmError;
use crate::http::HttpBodyStream;
use crate::provider::FragmentHandler;
use crate::provider::normalize;
use crate::stream::{StreamDecoder, StreamEvent};
use crate::types::LlmResponse;

use super::types::StreamEnvelope;

/// 驱动一次 Messages SSE 流 input_tokens 来自 message_start
/// output_tokens 来自 message_delta 在 message_stop 处收尾
pub(crate) async fn run_stream(
    body: HttpBodyStream,
    provider: &'static str,
    requested_model: &str,
    on_fragment: FragmentHandler<'_>,
) -> Result<LlmResponse, LlmError> {
    let mut decoder = StreamDecoder::sse(body, provider);

    let mut content = String::new();
    let mut model: Option<String> = None;
    let mut input_tokens: Option<u64> = None;
    let mut output_tokens: Option<u64> = None;
    let mut stop_reason: Option<String> = None;

    while let Some(event) = decoder.next().await {
        match event? {
            StreamEvent::Done => break,
            StreamEvent::Data(payload) => {
                let envelope: StreamEnvelope = serde_json::from_str(&payload)
                    .map_err(|err| normalize::parse_failure(provider, "stream event", err))?;
                match envelope.kind.as_str() {
                    "message_start" => {
                        if let Some(message) = envelope.message {
                            if let Some(m) = message.model {
                                model.get_or_insert(m);
                            }
                            if let Some(usage) = message.usage {
                                input_tokens = usage.input_tokens.or(input_tokens);
                            }
                        }
                    }
                    "content_block_delta" => {
                        if let Some(delta) = envelope.delta {
                            if delta.kind.as_deref() == Some("text_delta") {
                                if let Some(text) = delta.text {
                                    if !text.is_empty() {
                                        on_fragment(&text);
                                        content.push_str(&text);
                                    }
                                }
                            }
                        }
                    }
                    "message_delta" => {
                        if let Some(delta) = envelope.delta {
                            if let Some(reason) = delta.stop_reason {
                                stop_reason = Some(reason);
                            }
                        }
                        if let Some(usage) = envelope.usage {
                            output_tokens = usage.output_tokens.or(output_tokens);
                        }
                    }
                    "message_stop" => break,
                    // ping / content_block_start / content_block_stop 等事件无需处理
                    _ => {}
                }
            }
        }
    }

    let mut metadata = HashMap::from([(
        "provider".to_string(),
        Value::String(provider.to_string()),
    )]);
    if let Some(reason) = stop_reason {
        metadata.insert("stop_reason".to_string(), Value::String(reason));
    }

    Ok(LlmResponse {
        content,
        model: model.unwrap_or_else(|| requested_model.to_string()),
        usage: normalize::usage(input_tokens, output_tokens, None),
        metadata,
    })
}

#[cfg(test)]
mod tests {
    use futures_util::stream;

    use super::*;

    fn sse_body(events: &[&str]) -> HttpBodyStream {
        let chunks: Vec<Result<Vec<u8>, LlmError>> = events
            .iter()
            .map(|event| Ok(format!("data: {event}\n\n").into_bytes()))
            .collect();
        Box::pin(stream::iter(chunks))
    }

    #[tokio::test]
    async fn run_stream_collects_usage_from_start_and_delta_events() {
        let body = sse_body(&[
            r#"{"type":"message_start","message":{"model":"claude-3-5-sonnet","usage":{"input_tokens":25,"output_tokens":1}}}"#,
            r#"{"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"Hel"}}"#,
            r#"{"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"lo"}}"#,
            r#"{"type":"message_delta","delta":{"stop_reason":"end_turn"},"usage":{"output_tokens":15}}"#,
            r#"{"type":"message_stop"}"#,
        ]);

        let mut seen = Vec::new();
        let mut callback = |fragment: &str| seen.push(fragment.to_string());
        let response = run_stream(body, "anthropic", "claude-3-5-sonnet", &mut callback)
            .await
            .expect("stream should succeed");

        assert_eq!(seen, vec!["Hel", "lo"]);
        assert_eq!(response.content, "Hello");
        assert_eq!(response.model, "claude-3-5-sonnet");
        let usage = response.usage.expect("usage assembled at completion");
        assert_eq!(usage.prompt_tokens, Some(25));
        assert_eq!(usage.completion_tokens, Some(15));
        assert_eq!(usage.total_tokens, None);
        assert_eq!(
            response.metadata["stop_reason"],
            serde_json::json!("end_turn")
        );
    }

    #[tokio::test]
    async fn run_stream_ignores_ping_events() {
        let body = sse_body(&[
            r#"{"type":"ping"}"#,
            r#"{"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"ok"}}"#,
            r#"{"type":"message_stop"}"#,
        ]);
        let mut callback = |_: &str| {};
        let response = run_stream(body, "anthropic", "claude-3-5-sonnet", &mut callback)
            .await
            .expect("stream should succeed");
        assert_eq!(response.content, "ok");
        assert!(response.usage.is_none(), "no usage events means no usage");
    }
}
