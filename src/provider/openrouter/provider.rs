use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::LlmError;
use crate::http::{
    DynHttpTransport, get_with_headers, post_json_stream_with_headers, post_json_with_headers,
};
use crate::provider::openai::ERROR_MESSAGE_PATHS;
use crate::provider::openai::request::build_chat_body;
use crate::provider::openai::response::map_chat_response;
use crate::provider::openai::stream::run_stream;
use crate::provider::openai::types::{ChatCompletionResponse, ModelList};
use crate::provider::{FragmentHandler, LlmProvider, normalize};
use crate::types::{LlmOptions, LlmResponse, Message};

const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";
const PROVIDER: &str = "openrouter";

/// 代理网关适配器 请求格式与托管 Chat Completions 相同 不提供向量嵌入
pub struct OpenRouterProvider {
    transport: DynHttpTransport,
    base_url: String,
    api_key: String,
    default_model: String,
}

impl std::fmt::Debug for OpenRouterProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenRouterProvider")
            .field("base_url", &self.base_url)
            .field("default_model", &self.default_model)
            .finish()
    }
}

impl OpenRouterProvider {
    /// 创建指向公共网关的适配器
    pub fn new(
        transport: DynHttpTransport,
        api_key: impl Into<String>,
        default_model: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            default_model: default_model.into(),
        }
    }

    /// 自定义网关地址
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url.trim_end_matches('/'))
    }

    fn build_headers(&self) -> HashMap<String, String> {
        HashMap::from([
            (
                "Authorization".to_string(),
                format!("Bearer {}", self.api_key),
            ),
            ("Accept".to_string(), "application/json".to_string()),
        ])
    }

    fn resolve_model(&self, options: &LlmOptions) -> String {
        options
            .model
            .clone()
            .unwrap_or_else(|| self.default_model.clone())
    }
}

#[async_trait]
impl LlmProvider for OpenRouterProvider {
    async fn send_conversation(
        &self,
        messages: &[Message],
        options: &LlmOptions,
    ) -> Result<LlmResponse, LlmError> {
        let model = self.resolve_model(options);
        let body = build_chat_body(messages, options, &model, false);
        let response = post_json_with_headers(
            self.transport.as_ref(),
            self.endpoint("chat/completions"),
            self.build_headers(),
            &body,
        )
        .await?;
        let text = normalize::expect_success(response, PROVIDER, ERROR_MESSAGE_PATHS)?;
        let parsed: ChatCompletionResponse = serde_json::from_str(&text)
            .map_err(|err| normalize::parse_failure(PROVIDER, "chat response", err))?;
        map_chat_response(parsed, PROVIDER)
    }

    async fn stream_conversation(
        &self,
        messages: &[Message],
        on_fragment: FragmentHandler<'_>,
        options: &LlmOptions,
    ) -> Result<LlmResponse, LlmError> {
        let model = self.resolve_model(options);
        let body = build_chat_body(messages, options, &model, true);
        let response = post_json_stream_with_headers(
            self.transport.as_ref(),
            self.endpoint("chat/completions"),
            self.build_headers(),
            &body,
        )
        .await?;
        if !(200..300).contains(&response.status) {
            let text = normalize::drain_error_body(response.body, PROVIDER).await?;
            return Err(normalize::wrap_error(
                PROVIDER,
                response.status,
                &text,
                ERROR_MESSAGE_PATHS,
            ));
        }
        run_stream(response.body, PROVIDER, &model, on_fragment).await
    }

    async fn available_models(&self) -> Result<Vec<String>, LlmError> {
        let response = get_with_headers(
            self.transport.as_ref(),
            self.endpoint("models"),
            self.build_headers(),
        )
        .await?;
        let text = normalize::expect_success(response, PROVIDER, ERROR_MESSAGE_PATHS)?;
        let parsed: ModelList = serde_json::from_str(&text)
            .map_err(|err| normalize::parse_failure(PROVIDER, "model list", err))?;
        Ok(parsed.data.into_iter().map(|entry| entry.id).collect())
    }

    fn name(&self) -> &'static str {
        PROVIDER
    }
}
