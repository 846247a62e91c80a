use serde_json::{Map, Value};

use crate::provider::normalize;
use crate::types::{EmbeddingOptions, LlmOptions, Message, ResponseFormat};

/// 构建 Chat Completions 请求体 openrouter 走同一格式
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
    if let Some(temperature) = options.temperature {
        body.insert("temperature".to_string(), Value::from(temperature));
    }
    if let Some(max_tokens) = options.max_tokens {
        body.insert("max_tokens".to_string(), Value::from(max_tokens));
    }
    if let Some(ResponseFormat::Json) = options.response_format {
        body.insert(
            "response_format".to_string(),
            serde_json::json!({ "type": "json_object" }),
        );
    }
    // 透传未识别的 provider 参数 已识别字段不会重复出现在这里
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

/// 构建 embeddings 请求体
pub(crate) fn build_embeddings_body(texts: &[String], options: &EmbeddingOptions, model: &str) -> Value {
    let mut body = Map::new();
    body.insert("model".to_string(), Value::String(model.to_string()));
    body.insert(
        "input".to_string(),
        Value::Array(texts.iter().map(|t| Value::String(t.clone())).collect()),
    );
    // 默认的 base64 编码与常见自托管推理栈不兼容，必须显式要求 float 输出
    body.insert(
        "encoding_format".to_string(),
        Value::String("float".to_string()),
    );
    normalize::merge_passthrough(&mut body, &options.extra);
    Value::Object(body)
}
