use std::collections::HashMap;

use serde_json::Value;

use crate::error::LlmError;
use crate::provider::normalize;
use crate::types::{EmbeddingResponse, LlmResponse};

use super::types::{ChatResponse, EmbedResponse};

pub(crate) fn map_chat_response(
    resp: ChatResponse,
    provider: &'static str,
    requested_model: &str,
) -> Result<LlmResponse, LlmError> {
    let content = resp.message.map(|m| m.content).unwrap_or_default();

    let mut metadata = HashMap::from([(
        "provider".to_string(),
        Value::String(provider.to_string()),
    )]);
    if let Some(reason) = &resp.done_reason {
        metadata.insert("done_reason".to_string(), Value::String(reason.clone()));
    }
    if let Some(duration) = resp.total_duration {
        metadata.insert("total_duration_ns".to_string(), Value::from(duration));
    }

    Ok(LlmResponse {
        content,
        model: resp
            .model
            .unwrap_or_else(|| requested_model.to_string()),
        usage: normalize::usage(resp.prompt_eval_count, resp.eval_count, None),
        metadata,
    })
}

pub(crate) fn map_embed_response(
    resp: EmbedResponse,
    provider: &'static str,
    requested_model: &str,
) -> EmbeddingResponse {
    EmbeddingResponse {
        embeddings: resp.embeddings,
        model: resp
            .model
            .unwrap_or_else(|| requested_model.to_string()),
        usage: normalize::usage(resp.prompt_eval_count, None, None),
        metadata: HashMap::from([(
            "provider".to_string(),
            Value::String(provider.to_string()),
        )]),
    }
}

#[cfg(test)]
mod tests {
    use super::super::types::ChatMessage;
    use super::*;

    #[test]
    fn map_chat_response_reads_eval_counters() {
        let resp = ChatResponse {
            model: Some("llama3.2".to_string()),
            message: Some(ChatMessage {
                content: "hello".to_string(),
            }),
            done: true,
            done_reason: Some("stop".to_string()),
            prompt_eval_count: Some(9),
            eval_count: Some(4),
            total_duration: Some(12345),
        };

        let mapped = map_chat_response(resp, "ollama", "fallback").expect("map should succeed");
        assert_eq!(mapped.content, "hello");
        assert_eq!(mapped.model, "llama3.2");
        let usage = mapped.usage.expect("usage present");
        assert_eq!(usage.prompt_tokens, Some(9));
        assert_eq!(usage.completion_tokens, Some(4));
        assert_eq!(usage.total_tokens, None);
    }
}
