use std::collections::HashMap;

use serde_json::Value;

use crate::error::{LlmError, STATUS_UNCLASSIFIED};
use crate::provider::normalize;
use crate::types::{EmbeddingResponse, LlmResponse};

use super::types::{ChatCompletionResponse, EmbeddingsResponse};

pub(crate) fn map_chat_response(
    resp: ChatCompletionResponse,
    provider: &'static str,
) -> Result<LlmResponse, LlmError> {
    let choice = resp.choices.first().ok_or_else(|| {
        LlmError::api(
            provider,
            STATUS_UNCLASSIFIED,
            "response contained no choices",
        )
    })?;
    let content = choice
        .message
        .as_ref()
        .and_then(|m| m.content.clone())
        .unwrap_or_default();

    let mut metadata = HashMap::from([(
        "provider".to_string(),
        Value::String(provider.to_string()),
    )]);
    if let Some(reason) = &choice.finish_reason {
        metadata.insert("finish_reason".to_string(), Value::String(reason.clone()));
    }
    if let Some(id) = &resp.id {
        metadata.insert("request_id".to_string(), Value::String(id.clone()));
    }

    let usage = resp
        .usage
        .and_then(|u| normalize::usage(u.prompt_tokens, u.completion_tokens, u.total_tokens));

    Ok(LlmResponse {
        content,
        model: resp.model,
        usage,
        metadata,
    })
}

pub(crate) fn map_embeddings_response(
    resp: EmbeddingsResponse,
    provider: &'static str,
    requested_model: &str,
) -> EmbeddingResponse {
    // 按 index 还原输入顺序 缺失 index 时保持到达顺序
    let mut entries = resp.data;
    entries.sort_by_key(|entry| entry.index.unwrap_or(usize::MAX));
    let embeddings = entries.into_iter().map(|entry| entry.embedding).collect();

    let usage = resp
        .usage
        .and_then(|u| normalize::usage(u.prompt_tokens, u.completion_tokens, u.total_tokens));

    EmbeddingResponse {
        embeddings,
        model: resp.model.unwrap_or_else(|| requested_model.to_string()),
        usage,
        metadata: HashMap::from([(
            "provider".to_string(),
            Value::String(provider.to_string()),
        )]),
    }
}
