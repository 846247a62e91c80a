use std::collections::HashMap;

use futures_util::StreamExt;
use serde_json::Value;

use crate::error::LlmError;
use crate::http::HttpBodyStream;
use crate::provider::normalize;
use crate::provider::FragmentHandler;
use crate::stream::{StreamDecoder, StreamEvent};
use crate::types::{LlmResponse, TokenUsage};

use super::types::StreamChunk;

/// 驱动一次 SSE 流式响应 逐片段同步调用回调并累积全文
pub(crate) async fn run_stream(
    body: HttpBodyStream,
    provider: &'static str,
    requested_model: &str,
    on_fragment: FragmentHandler<'_>,
) -> Result<LlmResponse, LlmError> {
    let mut decoder = StreamDecoder::sse(body, provider);

    let mut content = String::new();
    let mut model: Option<String> = None;
    let mut usage: Option<TokenUsage> = None;
    let mut finish_reason: Option<String> = None;

    while let Some(event) = decoder.next().await {
        match event? {
            StreamEvent::Done => break,
            StreamEvent::Data(payload) => {
                let chunk: StreamChunk = serde_json::from_str(&payload)
                    .map_err(|err| normalize::parse_failure(provider, "stream chunk", err))?;
                if let Some(m) = chunk.model {
                    model.get_or_insert(m);
                }
                if let Some(u) = chunk.usage {
                    usage = normalize::usage(u.prompt_tokens, u.completion_tokens, u.total_tokens);
                }
                for choice in &chunk.choices {
                    if let Some(text) = choice.delta.as_ref().and_then(|d| d.content.as_deref()) {
                        if !text.is_empty() {
                            on_fragment(text);
                            content.push_str(text);
                        }
                    }
                    if let Some(reason) = &choice.finish_reason {
                        finish_reason = Some(reason.clone());
                    }
                }
            }
        }
    }

    let mut metadata = HashMap::from([(
        "provider".to_string(),
        Value::String(provider.to_string()),
    )]);
    if let Some(reason) = finish_reason {
        metadata.insert("finish_reason".to_string(), Value::String(reason));
    }

    Ok(LlmResponse {
        content,
        model: model.unwrap_or_else(|| requested_model.to_string()),
        usage,
        metadata,
    })
}
