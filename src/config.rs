use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::LlmError;
use crate::http::DynHttpTransport;
use crate::provider::DynProvider;
use crate::provider::anthropic::AnthropicProvider;
use crate::provider::ollama::OllamaProvider;
use crate::provider::openai::OpenAiProvider;
use crate::provider::openrouter::OpenRouterProvider;
use crate::types::LlmOptions;

/// 客户端配置 描述一个可调用后端
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    pub provider: ProviderKind,
    /// 凭证 托管与代理后端必填
    pub api_key: Option<String>,
    /// 服务地址 本地后端必填 其余后端可选覆盖
    pub endpoint: Option<String>,
    /// 默认聊天模型 所有后端必填
    pub default_model: Option<String>,
    /// 默认 embedding 模型
    pub embedding_model: Option<String>,
    /// 合并在每次调用选项之下的默认选项
    #[serde(default)]
    pub default_options: LlmOptions,
}

/// 后端类型 未知取值落在 Unknown 并在构建时立即失败
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    OpenAi,
    Anthropic,
    Ollama,
    OpenRouter,
    Unknown,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::Ollama => "ollama",
            ProviderKind::OpenRouter => "openrouter",
            ProviderKind::Unknown => "unknown",
        }
    }

    fn from_name(name: &str) -> Self {
        match name {
            "openai" => ProviderKind::OpenAi,
            "anthropic" => ProviderKind::Anthropic,
            "ollama" => ProviderKind::Ollama,
            "openrouter" => ProviderKind::OpenRouter,
            _ => ProviderKind::Unknown,
        }
    }
}

impl Serialize for ProviderKind {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ProviderKind {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(ProviderKind::from_name(&name))
    }
}

/// 根据配置构建对应的 Provider 校验失败立即返回 Configuration 错误
/// 不会发起任何网络请求
pub fn build_provider(
    config: &ClientConfig,
    transport: DynHttpTransport,
) -> Result<DynProvider, LlmError> {
    let provider: DynProvider = match config.provider {
        ProviderKind::OpenAi => {
            let api_key = require("api_key", config.api_key.as_deref(), "openai")?;
            let model = require("default_model", config.default_model.as_deref(), "openai")?;
            let mut provider = OpenAiProvider::new(transport, api_key, model);
            if let Some(endpoint) = &config.endpoint {
                provider = provider.with_base_url(endpoint.clone());
            }
            if let Some(embedding_model) = &config.embedding_model {
                provider = provider.with_embedding_model(embedding_model.clone());
            }
            Arc::new(provider)
        }
        ProviderKind::Anthropic => {
            let api_key = require("api_key", config.api_key.as_deref(), "anthropic")?;
            let model = require(
                "default_model",
                config.default_model.as_deref(),
                "anthropic",
            )?;
            let mut provider = AnthropicProvider::new(transport, api_key, model);
            if let Some(endpoint) = &config.endpoint {
                provider = provider.with_base_url(endpoint.clone());
            }
            Arc::new(provider)
        }
        ProviderKind::Ollama => {
            let endpoint = require("endpoint", config.endpoint.as_deref(), "ollama")?;
            let model = require("default_model", config.default_model.as_deref(), "ollama")?;
            let mut provider = OllamaProvider::new(transport, endpoint, model);
            if let Some(embedding_model) = &config.embedding_model {
                provider = provider.with_embedding_model(embedding_model.clone());
            }
            Arc::new(provider)
        }
        ProviderKind::OpenRouter => {
            let api_key = require("api_key", config.api_key.as_deref(), "openrouter")?;
            let model = require(
                "default_model",
                config.default_model.as_deref(),
                "openrouter",
            )?;
            let mut provider = OpenRouterProvider::new(transport, api_key, model);
            if let Some(endpoint) = &config.endpoint {
                provider = provider.with_base_url(endpoint.clone());
            }
            Arc::new(provider)
        }
        ProviderKind::Unknown => {
            return Err(LlmError::configuration(
                "provider",
                "unrecognized backend kind",
            ));
        }
    };

    Ok(provider)
}

fn require(
    field: &'static str,
    value: Option<&str>,
    backend: &'static str,
) -> Result<String, LlmError> {
    value
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| LlmError::configuration(field, format!("required by the {backend} backend")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::reqwest::default_dyn_transport;
    use crate::provider::LlmProvider;

    fn base_config(provider: ProviderKind) -> ClientConfig {
        ClientConfig {
            provider,
            api_key: Some("test-key".to_string()),
            endpoint: Some("http://localhost:11434".to_string()),
            default_model: Some("test-model".to_string()),
            embedding_model: None,
            default_options: LlmOptions::default(),
        }
    }

    /// 所有已知后端类型都能被构建
    #[test]
    fn build_provider_supports_all_kinds() {
        let transport = default_dyn_transport().expect("transport");

        for kind in [
            ProviderKind::OpenAi,
            ProviderKind::Anthropic,
            ProviderKind::Ollama,
            ProviderKind::OpenRouter,
        ] {
            let provider = build_provider(&base_config(kind), transport.clone())
                .unwrap_or_else(|err| panic!("{kind:?} should build: {err}"));
            assert_eq!(provider.name(), kind.as_str());
        }
    }

    #[test]
    fn ollama_requires_endpoint_before_any_network_attempt() {
        let transport = default_dyn_transport().expect("transport");
        let mut config = base_config(ProviderKind::Ollama);
        config.endpoint = None;

        let err = build_provider(&config, transport).expect_err("should fail");
        match err {
            LlmError::Configuration { field, reason } => {
                assert_eq!(field, "endpoint");
                assert!(reason.contains("ollama"), "reason: {reason}");
            }
            other => panic!("unexpected error type: {other:?}"),
        }
    }

    #[test]
    fn credentialed_backends_require_api_key() {
        let transport = default_dyn_transport().expect("transport");
        for kind in [
            ProviderKind::OpenAi,
            ProviderKind::Anthropic,
            ProviderKind::OpenRouter,
        ] {
            let mut config = base_config(kind);
            config.api_key = None;
            let err = build_provider(&config, transport.clone()).expect_err("should fail");
            assert!(
                matches!(err, LlmError::Configuration { field: "api_key", .. }),
                "unexpected error for {kind:?}: {err:?}"
            );
        }
    }

    #[test]
    fn default_model_is_always_required() {
        let transport = default_dyn_transport().expect("transport");
        let mut config = base_config(ProviderKind::OpenAi);
        config.default_model = Some(String::new());
        let err = build_provider(&config, transport).expect_err("should fail");
        assert!(matches!(
            err,
            LlmError::Configuration {
                field: "default_model",
                ..
            }
        ));
    }

    #[test]
    fn unknown_kind_fails_construction() {
        let transport = default_dyn_transport().expect("transport");
        let config: ClientConfig = serde_json::from_str(
            r#"{
                "provider": "mystery",
                "api_key": "k",
                "endpoint": null,
                "default_model": "m",
                "embedding_model": null
            }"#,
        )
        .expect("unknown kinds deserialize to the sentinel variant");
        assert_eq!(config.provider, ProviderKind::Unknown);

        let err = build_provider(&config, transport).expect_err("should fail");
        assert!(matches!(
            err,
            LlmError::Configuration {
                field: "provider",
                ..
            }
        ));
    }
}
