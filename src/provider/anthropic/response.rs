use std::collections::HashMap;

use serde_json::Value;

use crate::error::LlmError;
use crate::provider::normalize;
use crate::types::LlmResponse;

use super::types::MessagesResponse;

pub(crate) fn map_response(
    resp: MessagesResponse,
    provider: &'static str,
) -> Result<LlmResponse, LlmError> {
    let mut content = String::new();
    for block in &resp.content {
        if block.kind == "text" {
            if let Some(text) = &block.text {
                content.push_str(text);
            }
        }
    }

    let mut metadata = HashMap::from([(
        "provider".to_string(),
        Value::String(provider.to_string()),
    )]);
    if let Some(reason) = &resp.stop_reason {
        metadata.insert("stop_reason".to_string(), Value::String(reason.clone()));
    }
    if let Some(id) = &resp.id {
        metadata.insert("request_id".to_string(), Value::String(id.clone()));
    }

    // 后端只报告 input/output 两项 总数缺失时保持缺失
    let usage = resp
        .usage
        .and_then(|u| normalize::usage(u.input_tokens, u.output_tokens, None));

    Ok(LlmResponse {
        content,
        model: resp.model,
        usage,
        metadata,
    })
}
