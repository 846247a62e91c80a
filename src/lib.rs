//! LLM 多后端统一接入层 聊天 / 流式 / 向量嵌入共用一套契约

pub mod client;
pub mod config;
pub mod conversation;
pub mod error;
pub mod http;
pub mod provider;
pub mod stream;
pub mod types;

pub use client::LlmClient;
pub use config::{ClientConfig, ProviderKind};
pub use conversation::{Conversation, ConversationBackend};
pub use error::LlmError;
pub use provider::{DynProvider, FragmentHandler, LlmProvider};
pub use types::*;
