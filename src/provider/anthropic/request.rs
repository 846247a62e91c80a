use serde_json::{Map, Value};

use crate::provider::normalize;
use crate::types::{LlmOptions, Message, ResponseFormat};

use super::DEFAULT_MAX_TOKENS;

/// 构建 Messages 请求体
pub(crate) fn build_messages_body(
    messages: &[Message],
    options: &LlmOptions,
    model: &str,
    stream: bool,
) -> Value {
    let mut body = Map::new();
    body.insert("model".to_string(), Value::String(model.to_string()));

    // system 折叠为顶层参数 绝不在 messages 里重复出现
    let (system, rest) = normalize::extract_system(messages, options);
    body.insert(
        "messages".to_string(),
        Value::Array(rest.iter().map(|m| convert_message(m)).collect()),
    );
    if let Some(system) = system {
        body.insert("system".to_string(), Value::String(system));
    }

    // wire 必填字段
    body.insert(
        "max_tokens".to_string(),
        Value::from(options.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS)),
    );
    if let Some(temperature) = options.temperature {
        body.insert("temperature".to_string(), Value::from(temperature));
    }
    if let Some(ResponseFormat::Json) = options.response_format {
        // Messages API 没有结构化输出开关 由模型侧提示约束
        tracing::debug!("anthropic backend has no JSON mode; response_format ignored");
    }

    normalize::merge_passthrough(&mut body, &options.extra);
    body.insert("stream".to_string(), Value::Bool(stream));
    Value::Object(body)
}

fn convert_message(message: &Message) -> Value {
    serde_json::json!({
        "role": message.role.as_str(),
        "content": message.content,
    })
}
