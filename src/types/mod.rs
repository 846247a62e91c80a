//! Shared data structures modeling chat requests, responses, and embeddings.
//!
//! These types normalize provider-specific payloads so the rest of the crate can
//! stay agnostic of individual API differences.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Conversation role understood by every backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    /// Wire name of the role, identical across the supported backends.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One conversation turn.
///
/// Messages are immutable once appended to a [`crate::conversation::Conversation`];
/// their position in the sequence is the chronological order sent to the backend.
///
/// # Examples
///
/// ```
/// use tsunagi::types::{Message, Role};
///
/// let msg = Message::user("Summarize Rust traits.");
/// assert_eq!(msg.role, Role::User);
/// assert!(msg.timestamp.is_none());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Role associated with this message.
    pub role: Role,
    /// Plain UTF-8 text.
    pub content: String,
    /// Optional creation time, stamped by the conversation holder on append.
    pub timestamp: Option<DateTime<Utc>>,
}

impl Message {
    /// Creates a message with the given role and no timestamp.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: None,
        }
    }

    /// Creates a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// Creates a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Creates an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Output shape requested from the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseFormat {
    /// Free-form text output.
    Text,
    /// Structured JSON output, mapped to each backend's JSON mode.
    Json,
}

/// Request-scoped configuration bag shared across all providers.
///
/// Every known field is optional so callers only set knobs they care about.
/// Anything a specific backend understands beyond the known set goes into
/// [`LlmOptions::extra`] and is forwarded verbatim by the adapter, never
/// validated or interpreted by the common layer.
///
/// # Examples
///
/// ```
/// use tsunagi::types::LlmOptions;
///
/// let mut options = LlmOptions {
///     temperature: Some(0.3),
///     max_tokens: Some(200),
///     ..Default::default()
/// };
/// options.extra.insert("num_ctx".into(), serde_json::json!(8192));
/// assert!(options.model.is_none());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LlmOptions {
    /// Optional model identifier override.
    pub model: Option<String>,
    /// Sampling temperature; the accepted range is backend-defined, typically
    /// `0.0..=2.0`.
    pub temperature: Option<f32>,
    /// Maximum number of generated tokens.
    pub max_tokens: Option<u32>,
    /// Convenience for a single leading system instruction. Injected into the
    /// outgoing request only when the message sequence carries no system message;
    /// never written back into stored history.
    pub system_prompt: Option<String>,
    /// Requested output shape.
    pub response_format: Option<ResponseFormat>,
    /// Set internally by the streaming verb; callers should leave this unset.
    pub stream: Option<bool>,
    /// Provider-specific options forwarded to the backend without validation.
    #[serde(default)]
    pub extra: HashMap<String, Value>,
}

impl LlmOptions {
    /// Shallowly overlays `over` on top of `self`, returning the merged options.
    ///
    /// Each known field set in `over` replaces the value in `self`; unset fields
    /// keep the base value. Passthrough keys merge key-by-key with `over` winning.
    /// Nested structures inside [`LlmOptions::extra`] are replaced wholesale,
    /// never deep-merged.
    ///
    /// # Examples
    ///
    /// ```
    /// use tsunagi::types::LlmOptions;
    ///
    /// let base = LlmOptions { temperature: Some(0.2), ..Default::default() };
    /// let call = LlmOptions { temperature: Some(0.9), max_tokens: Some(50), ..Default::default() };
    /// let merged = base.overlay(&call);
    /// assert_eq!(merged.temperature, Some(0.9));
    /// assert_eq!(merged.max_tokens, Some(50));
    /// ```
    pub fn overlay(&self, over: &LlmOptions) -> LlmOptions {
        let mut extra = self.extra.clone();
        extra.extend(over.extra.iter().map(|(k, v)| (k.clone(), v.clone())));
        LlmOptions {
            model: over.model.clone().or_else(|| self.model.clone()),
            temperature: over.temperature.or(self.temperature),
            max_tokens: over.max_tokens.or(self.max_tokens),
            system_prompt: over
                .system_prompt
                .clone()
                .or_else(|| self.system_prompt.clone()),
            response_format: over.response_format.or(self.response_format),
            stream: over.stream.or(self.stream),
            extra,
        }
    }
}

/// Token usage metrics reported by the backend.
///
/// Any subset may be absent; absent values are left as `None` and are never
/// synthesized from the fields that are present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: Option<u64>,
    pub completion_tokens: Option<u64>,
    pub total_tokens: Option<u64>,
}

/// Normalized chat result returned by every provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResponse {
    /// Full generated text. For streaming calls this equals the concatenation of
    /// every fragment delivered to the callback.
    pub content: String,
    /// Model that actually served the request; may differ from the requested one.
    pub model: String,
    /// Token accounting when the backend supplied it.
    pub usage: Option<TokenUsage>,
    /// Open metadata bag. Always carries `"provider"`; adapters add fields such
    /// as the stop reason or upstream request id when known.
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

/// Request-scoped configuration for embedding calls.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmbeddingOptions {
    /// Optional embedding model override.
    pub model: Option<String>,
    /// Ask the backend to truncate oversized inputs instead of rejecting them.
    /// Forwarded only by backends that understand it.
    pub truncate: Option<bool>,
    /// Provider-specific options forwarded to the backend without validation.
    #[serde(default)]
    pub extra: HashMap<String, Value>,
}

/// Normalized embedding result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingResponse {
    /// One vector per input text, in input order.
    pub embeddings: Vec<Vec<f32>>,
    /// Model that produced the vectors.
    pub model: String,
    /// Token accounting when the backend supplied it.
    pub usage: Option<TokenUsage>,
    /// Open metadata bag, always carrying `"provider"`.
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}
