use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::config::{ClientConfig, build_provider};
use crate::conversation::{Conversation, ConversationBackend};
use crate::error::LlmError;
use crate::http::DynHttpTransport;
use crate::provider::{DynProvider, FragmentHandler};
use crate::types::{
    EmbeddingOptions, EmbeddingResponse, LlmOptions, LlmResponse, Message,
};

/// LLM 调用门面 持有唯一的 Provider 与模块级默认选项
///
/// 构建成功后即就绪 每个动词调用相互独立 不共享可变状态
/// 构建失败是致命的 不存在可恢复的中间状态
pub struct LlmClient {
    provider: DynProvider,
    defaults: LlmOptions,
}

impl std::fmt::Debug for LlmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmClient")
            .field("provider", &self.provider.name())
            .finish()
    }
}

impl LlmClient {
    /// 按配置校验并构建 Provider 失败返回 Configuration 错误
    pub fn from_config(
        config: &ClientConfig,
        transport: DynHttpTransport,
    ) -> Result<Self, LlmError> {
        let provider = build_provider(config, transport)?;
        debug!(provider = provider.name(), "client constructed");
        Ok(Self {
            provider,
            defaults: config.default_options.clone(),
        })
    }

    /// 直接用现成 Provider 构建 便于测试与自定义后端
    pub fn with_provider(provider: DynProvider, defaults: LlmOptions) -> Self {
        Self { provider, defaults }
    }

    /// 当前后端的稳定标识
    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    /// 选项合并顺序 内置默认 < 模块默认 < 调用选项 < 动词强制覆盖
    fn resolved(&self, call: &LlmOptions, stream: bool) -> LlmOptions {
        let forced = LlmOptions {
            stream: Some(stream),
            ..Default::default()
        };
        self.defaults.overlay(call).overlay(&forced)
    }

    /// 发送单条消息
    pub async fn send_message(
        &self,
        text: &str,
        options: &LlmOptions,
    ) -> Result<LlmResponse, LlmError> {
        let options = self.resolved(options, false);
        debug!(provider = self.provider_name(), "sending single message");
        self.provider.send_message(text, &options).await
    }

    /// 发送完整对话
    pub async fn send_conversation(
        &self,
        messages: &[Message],
        options: &LlmOptions,
    ) -> Result<LlmResponse, LlmError> {
        let options = self.resolved(options, false);
        debug!(
            provider = self.provider_name(),
            turns = messages.len(),
            "sending conversation"
        );
        self.provider.send_conversation(messages, &options).await
    }

    /// 流式发送对话 强制 stream=true
    pub async fn stream_conversation(
        &self,
        messages: &[Message],
        on_fragment: FragmentHandler<'_>,
        options: &LlmOptions,
    ) -> Result<LlmResponse, LlmError> {
        let options = self.resolved(options, true);
        debug!(
            provider = self.provider_name(),
            turns = messages.len(),
            "streaming conversation"
        );
        self.provider
            .stream_conversation(messages, on_fragment, &options)
            .await
    }

    /// 向量嵌入 调用前先做能力检查 不支持的后端立即失败
    pub async fn embed(
        &self,
        texts: &[String],
        options: &EmbeddingOptions,
    ) -> Result<EmbeddingResponse, LlmError> {
        if !self.provider.supports_embeddings() {
            warn!(
                provider = self.provider_name(),
                "embed called on a backend without embedding support"
            );
            return Err(LlmError::not_implemented(
                self.provider_name(),
                "embeddings",
            ));
        }
        debug!(
            provider = self.provider_name(),
            inputs = texts.len(),
            "embedding texts"
        );
        self.provider.embed(texts, options).await
    }

    /// 列出后端全部可用模型
    pub async fn available_models(&self) -> Result<Vec<String>, LlmError> {
        self.provider.available_models().await
    }

    /// 新建一个绑定到本客户端的会话 会话生命周期归调用方所有
    /// 客户端句柄可廉价克隆 `client.clone().start_conversation()`
    pub fn start_conversation(self: Arc<Self>) -> Conversation {
        Conversation::new(self as Arc<dyn ConversationBackend>)
    }
}

#[async_trait]
impl ConversationBackend for LlmClient {
    async fn send_conversation(
        &self,
        messages: &[Message],
        options: &LlmOptions,
    ) -> Result<LlmResponse, LlmError> {
        LlmClient::send_conversation(self, messages, options).await
    }

    async fn stream_conversation(
        &self,
        messages: &[Message],
        on_fragment: FragmentHandler<'_>,
        options: &LlmOptions,
    ) -> Result<LlmResponse, LlmError> {
        LlmClient::stream_conversation(self, messages, on_fragment, options).await
    }
}
