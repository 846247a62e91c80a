use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::LlmError;
use crate::http::{
    DynHttpTransport, get_with_headers, post_json_stream_with_headers, post_json_with_headers,
};
use crate::provider::{FragmentHandler, LlmProvider, normalize};
use crate::types::{EmbeddingOptions, EmbeddingResponse, LlmOptions, LlmResponse, Message};

use super::ERROR_MESSAGE_PATHS;
use super::request::{build_chat_body, build_embed_body};
use super::response::{map_chat_response, map_embed_response};
use super::stream::run_stream;
use super::types::{ChatResponse, EmbedResponse, TagsResponse};

const PROVIDER: &str = "ollama";

/// 本地推理服务适配器 无需凭证 endpoint 必填
pub struct OllamaProvider {
    transport: DynHttpTransport,
    endpoint: String,
    default_model: String,
    embedding_model: Option<String>,
}

impl std::fmt::Debug for OllamaProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OllamaProvider")
            .field("endpoint", &self.endpoint)
            .field("default_model", &self.default_model)
            .field("embedding_model", &self.embedding_model)
            .finish()
    }
}

impl OllamaProvider {
    /// 创建指向给定服务地址的适配器
    pub fn new(
        transport: DynHttpTransport,
        endpoint: impl Into<String>,
        default_model: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            endpoint: endpoint.into(),
            default_model: default_model.into(),
            embedding_model: None,
        }
    }

    /// 设置默认 embedding 模型
    pub fn with_embedding_model(mut self, model: impl Into<String>) -> Self {
        self.embedding_model = Some(model.into());
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.endpoint.trim_end_matches('/'))
    }

    fn build_headers(&self) -> HashMap<String, String> {
        HashMap::from([("Accept".to_string(), "application/json".to_string())])
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
impl LlmProvider for OllamaProvider {
    async fn send_conversation(
        &self,
        messages: &[Message],
        options: &LlmOptions,
    ) -> Result<LlmResponse, LlmError> {
        let model = self.resolve_model(options);
        let body = build_chat_body(messages, options, &model, false);
        let response = post_json_with_headers(
            self.transport.as_ref(),
            self.url("api/chat"),
            self.build_headers(),
            &body,
        )
        .await?;
        let text = normalize::expect_success(response, PROVIDER, ERROR_MESSAGE_PATHS)?;
        let parsed: ChatResponse = serde_json::from_str(&text)
            .map_err(|err| normalize::parse_failure(PROVIDER, "chat response", err))?;
        map_chat_response(parsed, PROVIDER, &model)
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
            self.url("api/chat"),
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
        let body = build_embed_body(texts, options, &model);
        let response = post_json_with_headers(
            self.transport.as_ref(),
            self.url("api/embed"),
            self.build_headers(),
            &body,
        )
        .await?;
        let text = normalize::expect_success(response, PROVIDER, ERROR_MESSAGE_PATHS)?;
        let parsed: EmbedResponse = serde_json::from_str(&text)
            .map_err(|err| normalize::parse_failure(PROVIDER, "embed response", err))?;
        Ok(map_embed_response(parsed, PROVIDER, &model))
    }

    fn supports_embeddings(&self) -> bool {
        true
    }

    async fn available_models(&self) -> Result<Vec<String>, LlmError> {
        let response = get_with_headers(
            self.transport.as_ref(),
            self.url("api/tags"),
            self.build_headers(),
        )
        .await?;
        let text = normalize::expect_success(response, PROVIDER, ERROR_MESSAGE_PATHS)?;
        let parsed: TagsResponse = serde_json::from_str(&text)
            .map_err(|err| normalize::parse_failure(PROVIDER, "tag list", err))?;
        Ok(parsed.models.into_iter().map(|entry| entry.name).collect())
    }

    fn name(&self) -> &'static str {
        PROVIDER
    }
}
