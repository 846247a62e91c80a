use std::collections::HashMap;

use futures_util::StreamExt;
use serde_json::Value;

use crate::error::LlmError;
use crate::http::HttpBodyStream;
use crate::provider::FragmentHandler;
use crate::provider::normalize;
use crate::stream::{StreamDecoder, StreamEvent};
use crate::types::LlmResponse;

use super::types::ChatResponse;

/// 驱动一次行分隔 JSON 流 终止行 done=true 携带累计 token 计数
pub(crate) async fn run_stream(
    body: HttpBodyStream,
    provider: &'static str,
    requested_model: &str,
    on_fragment: FragmentHandler<'_>,
) -> Result<LlmResponse, LlmError> {
    let mut decoder = StreamDecoder::json_lines(body, provider);

    let mut content = String::new();
    let mut model: Option<String> = None;
    let mut usage = None;
    let mut done_reason: Option<String> = None;

    while let Some(event) = decoder.next().await {
        match event? {
            StreamEvent::Done => break,
            StreamEvent::Data(payload) => {
                let line: ChatResponse = serde_json::from_str(&payload)
                    .map_err(|err| normalize::parse_failure(provider, "stream line", err))?;
                if let Some(m) = line.model {
                    model.get_or_insert(m);
                }
                if let Some(message) = &line.message {
                    if !message.content.is_empty() {
                        on_fragment(&message.content);
                        content.push_str(&message.content);
                    }
                }
                if line.done {
                    usage = normalize::usage(line.prompt_eval_count, line.eval_count, None);
                    done_reason = line.done_reason;
                    break;
                }
            }
        }
    }

    let mut metadata = HashMap::from([(
        "provider".to_string(),
        Value::String(provider.to_string()),
    )]);
    if let Some(reason) = done_reason {
        metadata.insert("done_reason".to_string(), Value::String(reason));
    }

    Ok(LlmResponse {
        content,
        model: model.unwrap_or_else(|| requested_model.to_string()),
        usage,
        metadata,
    })
}
