//! Anthropic Messages 适配器 系统指令走顶层 system 参数 不支持向量嵌入

mod provider;
mod request;
mod response;
mod stream;
mod types;

pub use provider::AnthropicProvider;

pub(crate) const ERROR_MESSAGE_PATHS: &[&[&str]] = &[&["error", "message"]];

/// Wire 要求必填 max_tokens 调用方未设置时使用该默认值
pub(crate) const DEFAULT_MAX_TOKENS: u32 = 1024;
