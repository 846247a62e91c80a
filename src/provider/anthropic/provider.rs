use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::LlmError;
use crate::http::{
    DynHttpTransport, get_with_headers, post_json_stream_with_headers, post_json_with_headers,
};
use crate::provider::{FragmentHandler, LlmProvider, normalize};
use crate::types::{LlmOptions, LlmResponse, Message};

use super::ERROR_MESSAGE_PATHS;
use super::request::build_messages_body;
use super::response::map_response;
use super::stream::run_stream;
use super::types::{MessagesResponse, ModelPage};

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const DEFAULT_VERSION: &str = "2023-06-01";
const MODELS_PAGE_LIMIT: usize = 100;
const PROVIDER: &str = "anthropic";

/// Anthropic Messages 后端适配器 聊天专用 无向量嵌入能力
pub struct AnthropicProvider {
    transport: DynHttpTransport,
    base_url: String,
    api_key: String,
    version: String,
    default_model: String,
}

impl std::fmt::Debug for AnthropicProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicProvider")
            .field("base_url", &self.base_url)
            .field("version", &self.version)
            .field("default_model", &self.default_model)
            .finish()
    }
}

impl AnthropicProvider {
    /// 创建带默认 base_url 与 API 版本的适配器
    pub fn new(
        transport: DynHttpTransport,
        api_key: impl Into<String>,
        default_model: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            version: DEFAULT_VERSION.to_string(),
            default_model: default_model.into(),
        }
    }

    /// 自定义 base_url
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// 覆盖 anthropic-version 请求头
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    fn endpoint(&self, path: &str) -> String {
        let base = self.base_url.trim_end_matches('/');
        if base.ends_with("/v1") {
            format!("{base}/{path}")
        } else {
            format!("{base}/v1/{path}")
        }
    }

    fn build_headers(&self) -> HashMap<String, String> {
        HashMap::from([
            ("x-api-key".to_string(), self.api_key.clone()),
            ("anthropic-version".to_string(), self.version.clone()),
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
impl LlmProvider for AnthropicProvider {
    async fn send_conversation(
        &self,
        messages: &[Message],
        options: &LlmOptions,
    ) -> Result<LlmResponse, LlmError> {
        let model = self.resolve_model(options);
        let body = build_messages_body(messages, options, &model, false);
        let response = post_json_with_headers(
            self.transport.as_ref(),
            self.endpoint("messages"),
            self.build_headers(),
            &body,
        )
        .await?;
        let text = normalize::expect_success(response, PROVIDER, ERROR_MESSAGE_PATHS)?;
        let parsed: MessagesResponse = serde_json::from_str(&text)
            .map_err(|err| normalize::parse_failure(PROVIDER, "messages response", err))?;
        map_response(parsed, PROVIDER)
    }

    async fn stream_conversation(
        &self,
        messages: &[Message],
        on_fragment: FragmentHandler<'_>,
        options: &LlmOptions,
    ) -> Result<LlmResponse, LlmError> {
        let model = self.resolve_model(options);
        let body = build_messages_body(messages, options, &model, true);
        let response = post_json_stream_with_headers(
            self.transport.as_ref(),
            self.endpoint("messages"),
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

    /// 分页拉取模型列表 直到 has_more 为假
    async fn available_models(&self) -> Result<Vec<String>, LlmError> {
        let mut models = Vec::new();
        let mut after_id: Option<String> = None;

        loop {
            let mut url = format!("{}?limit={MODELS_PAGE_LIMIT}", self.endpoint("models"));
            if let Some(after) = &after_id {
                url.push_str(&format!("&after_id={after}"));
            }
            let response =
                get_with_headers(self.transport.as_ref(), url, self.build_headers()).await?;
            let text = normalize::expect_success(response, PROVIDER, ERROR_MESSAGE_PATHS)?;
            let page: ModelPage = serde_json::from_str(&text)
                .map_err(|err| normalize::parse_failure(PROVIDER, "model page", err))?;

            models.extend(page.data.into_iter().map(|entry| entry.id));
            tracing::debug!(count = models.len(), has_more = page.has_more, "model page fetched");

            if !page.has_more {
                break;
            }
            match page.last_id {
                Some(last) => after_id = Some(last),
                // has_more 缺少游标时无法翻页 只能停在当前页
                None => break,
            }
        }

        Ok(models)
    }

    fn name(&self) -> &'static str {
        PROVIDER
    }
}
