use serde_json::{Map, Value};

use crate::provider::normalize;
use crate::types::{EmbeddingOptions, LlmOptions, Message, ResponseFormat};

/// 构建 /api/chat 请求体 采样参数按该后端惯例嵌套在 options 下
pub(crate) fn build_chat_body(
    messages: &[Message],
    options: &LlmOptions,
    model: &str,
    stream: bool,
) -> Value {
    let ordered = normalize::with_system_prompt(messages, options);

    let mut body = Map::new();
    body.insert("model".to_string(), Value::String(model.to_string()));
    body.insert(
        "messages".to_string(),
        Value::Array(ordered.iter().map(convert_message).collect()),
    );

    let mut sampling = Map::new();
    if let Some(temperature) = options.temperature {
        sampling.insert("temperature".to_string(), Value::from(temperature));
    }
    if let Some(max_tokens) = options.max_tokens {
        // 生成上限在该后端叫 num_predict
        sampling.insert("num_predict".to_string(), Value::from(max_tokens));
    }
    if !sampling.is_empty() {
        body.insert("options".to_string(), Value::Object(sampling));
    }

    if let Some(ResponseFormat::Json) = options.response_format {
        body.insert("format".to_string(), Value::String("json".to_string()));
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

/// 构建 /api/embed 请求体
pub(crate) fn build_embed_body(texts: &[String], options: &EmbeddingOptions, model: &str) -> Value {
    let mut body = Map::new();
    body.insert("model".to_string(), Value::String(model.to_string()));
    body.insert(
        "input".to_string(),
        Value::Array(texts.iter().map(|t| Value::String(t.clone())).collect()),
    );
    if let Some(truncate) = options.truncate {
        body.insert("truncate".to_string(), Value::Bool(truncate));
    }
    normalize::merge_passthrough(&mut body, &options.extra);
    Value::Object(body)
}
