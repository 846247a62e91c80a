use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub(crate) struct MessagesResponse {
    #[serde(default)]
    pub(crate) id: Option<String>,
    pub(crate) model: String,
    #[serde(default)]
    pub(crate) content: Vec<ContentBlock>,
    #[serde(default)]
    pub(crate) stop_reason: Option<String>,
    #[serde(default)]
    pub(crate) usage: Option<MessagesUsage>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub(crate) struct ContentBlock {
    #[serde(rename = "type")]
    pub(crate) kind: String,
    #[serde(default)]
    pub(crate) text: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub(crate) struct MessagesUsage {
    #[serde(default)]
    pub(crate) input_tokens: Option<u64>,
    #[serde(default)]
    pub(crate) output_tokens: Option<u64>,
}

/// SSE 事件外壳 按 type 字段区分 message_start / content_block_delta /
/// message_delta / message_stop 等事件
#[derive(Debug, Deserialize, Serialize, Clone)]
pub(crate) struct StreamEnvelope {
    #[serde(rename = "type")]
    pub(crate) kind: String,
    #[serde(default)]
    pub(crate) message: Option<StartMessage>,
    #[serde(default)]
    pub(crate) delta: Option<EnvelopeDelta>,
    #[serde(default)]
    pub(crate) usage: Option<MessagesUsage>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub(crate) struct StartMessage {
    #[serde(default)]
    pub(crate) model: Option<String>,
    #[serde(default)]
    pub(crate) usage: Option<MessagesUsage>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub(crate) struct EnvelopeDelta {
    #[serde(rename = "type", default)]
    pub(crate) kind: Option<String>,
    #[serde(default)]
    pub(crate) text: Option<String>,
    #[serde(default)]
    pub(crate) stop_reason: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub(crate) struct ModelPage {
    #[serde(default)]
    pub(crate) data: Vec<ModelEntry>,
    #[serde(default)]
    pub(crate) has_more: bool,
    #[serde(default)]
    pub(crate) last_id: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub(crate) struct ModelEntry {
    pub(crate) id: String,
}
