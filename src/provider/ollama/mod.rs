//! Ollama 本地推理服务适配器 流式走行分隔 JSON 采样参数嵌套在 options 下

mod provider;
mod request;
mod response;
mod stream;
mod types;

pub use provider::OllamaProvider;

/// 本地服务直接以 {"error": "..."} 返回错误
pub(crate) const ERROR_MESSAGE_PATHS: &[&[&str]] = &[&["error"]];
