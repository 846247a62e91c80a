use std::sync::Arc;

use async_trait::async_trait;

use crate::error::LlmError;
use crate::types::{EmbeddingOptions, EmbeddingResponse, LlmOptions, LlmResponse, Message};

pub mod anthropic;
pub(crate) mod normalize;
pub mod ollama;
pub mod openai;
pub mod openrouter;

/// 流式回调 每收到一个增量文本片段同步调用一次
pub type FragmentHandler<'a> = &'a mut (dyn FnMut(&str) + Send);

/// 统一的 Provider Trait 所有后端适配器实现该接口即可接入
#[async_trait]
pub trait LlmProvider: Send + Sync + std::fmt::Debug {
    /// 单条消息语法糖 构造单轮对话并委托给 send_conversation
    async fn send_message(
        &self,
        text: &str,
        options: &LlmOptions,
    ) -> Result<LlmResponse, LlmError> {
        let messages = [Message::user(text)];
        self.send_conversation(&messages, options).await
    }

    /// 提交完整对话并等待完整响应 失败时不返回任何部分内容
    async fn send_conversation(
        &self,
        messages: &[Message],
        options: &LlmOptions,
    ) -> Result<LlmResponse, LlmError>;

    /// 流式请求 按后端产出顺序逐片段调用回调 结束后返回累积全文
    async fn stream_conversation(
        &self,
        messages: &[Message],
        on_fragment: FragmentHandler<'_>,
        options: &LlmOptions,
    ) -> Result<LlmResponse, LlmError>;

    /// 可选能力 不支持的后端返回 501 Api 错误 而不是静默空结果
    async fn embed(
        &self,
        _texts: &[String],
        _options: &EmbeddingOptions,
    ) -> Result<EmbeddingResponse, LlmError> {
        Err(LlmError::not_implemented(self.name(), "embeddings"))
    }

    /// 能力查询 门面在调用 embed 前必须先检查
    fn supports_embeddings(&self) -> bool {
        false
    }

    /// 返回后端的全部可用模型 分页后端必须翻完所有页
    async fn available_models(&self) -> Result<Vec<String>, LlmError>;

    /// 稳定的小写供应商标识 用于 metadata 与错误标注
    fn name(&self) -> &'static str;
}

/// 线程安全 Provider
pub type DynProvider = Arc<dyn LlmProvider>;
