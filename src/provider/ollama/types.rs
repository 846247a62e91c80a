use serde::{Deserialize, Serialize};

/// /api/chat 的完整响应与流式行共用同一形状
#[derive(Debug, Deserialize, Serialize, Clone)]
pub(crate) struct ChatResponse {
    #[serde(default)]
    pub(crate) model: Option<String>,
    #[serde(default)]
    pub(crate) message: Option<ChatMessage>,
    #[serde(default)]
    pub(crate) done: bool,
    #[serde(default)]
    pub(crate) done_reason: Option<String>,
    #[serde(default)]
    pub(crate) prompt_eval_count: Option<u64>,
    #[serde(default)]
    pub(crate) eval_count: Option<u64>,
    #[serde(default)]
    pub(crate) total_duration: Option<u64>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub(crate) struct ChatMessage {
    #[serde(default)]
    pub(crate) content: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub(crate) struct EmbedResponse {
    #[serde(default)]
    pub(crate) model: Option<String>,
    #[serde(default)]
    pub(crate) embeddings: Vec<Vec<f32>>,
    #[serde(default)]
    pub(crate) prompt_eval_count: Option<u64>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub(crate) struct TagsResponse {
    #[serde(default)]
    pub(crate) models: Vec<TagEntry>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub(crate) struct TagEntry {
    pub(crate) name: String,
}
