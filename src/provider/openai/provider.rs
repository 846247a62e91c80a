use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::LlmError;
use crate::http::{
    DynHttpTransport, get_with_headers, post_json_stream_with_headers, post_json_with_headers,
};
use crate::provider::{FragmentHandler, LlmProvider, normalize};
use crate::types::{EmbeddingOptions, EmbeddingResponse, LlmOptions, LlmResponse, Message};

use super::ERROR_MESSAGE_PATHS;
use super::request::{build_chat_body, build_embeddings_body};
use super::response::{map_chat_response, map_embeddings_response};
use super::stream::run_stream;
use super::types::{ChatCompletionResponse, EmbeddingsResponse, ModelList};

const DEFAULT_BASE_URL: &str = "https://api.openai.com";
const PROVIDER: &str = "openai";

/// 托管 Chat Completions 后端适配器
pub struct OpenAiProvider {
    transport: DynHttpTransport,
    base_url: String,
    api_key: String,
    default_model: String,
    embedding_model: Option<String>,
}

impl std::fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("base_url", &self.base_url)
            .field("default_model", &self.default_model)
            .field("embedding_model", &self.embedding_model)
            .finish()
    }
}

impl OpenAiProvider {
    /// 创建带默认 base_url 的适配器
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
            embedding_model: None,
        }
    }

    /// 自定义 base_url 兼容自托管网关
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// 设置默认 embedding 模型
    pub fn with_embedding_model(mut self, model: impl Into<String>) -> Self {
        self.embedding_model = Some(model.into());
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

    fn resolve_embedding_model(&self, options: &EmbeddingOptions) -> Result<String, LlmError> {
        options
            .model
            .clone()
            .or_else(|| self.embedding_model.clone())
            .ok_or_else(|| {
                LlmError::api(
                    PROVIDER,
                    400,
                    "an embedding model is required: set EmbeddingOptions.model or configure embedding_model",
                )
            })
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
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

    async fn embed(
        &self,
        texts: &[String],
        options: &EmbeddingOptions,
    ) -> Result<EmbeddingResponse, LlmError> {
        let model = self.resolve_embedding_model(options)?;
        let body = build_embeddings_body(texts, options, &model);
        let response = post_json_with_headers(
            self.transport.as_ref(),
            self.endpoint("embeddings"),
            self.build_headers(),
            &body,
        )
        .await?;
        let text = normalize::expect_success(response, PROVIDER, ERROR_MESSAGE_PATHS)?;
        let parsed: EmbeddingsResponse = serde_json::from_str(&text)
            .map_err(|err| normalize::parse_failure(PROVIDER, "embeddings response", err))?;
        Ok(map_embeddings_response(parsed, PROVIDER, &model))
    }

    fn supports_embeddings(&self) -> bool {
        true
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
