//! OpenRouter 代理网关适配器 走 OpenAI 兼容格式 复用 openai 模块的 wire 映射

mod provider;

pub use provider::OpenRouterProvider;
