//! Chat-model access.
//!
//! The summariser only needs "send these messages, get text back", so that
//! is all [`ChatModel`] exposes. Every call goes through an `edgequake_llm`
//! provider wrapped in [`ProviderModel`]:
//!
//! * the default is [`OpenAIProvider::compatible`] against DashScope's
//!   compatible mode (`qwen-plus`) unless `base_url` says otherwise;
//! * a named provider (OpenAI, Anthropic, Gemini, Ollama, …) replaces it
//!   when one is configured.
//!
//! Neither retries: a failed call is folded into the summary text by
//! [`crate::pipeline::summarize`].

use crate::config::ReaderConfig;
use crate::error::PaperReaderError;
use async_trait::async_trait;
use edgequake_llm::{
    ChatMessage, CompletionOptions, LLMProvider, LlmError, OpenAIProvider, ProviderFactory,
};
use std::sync::Arc;
use tracing::{debug, info};

/// Reported by the OpenAI provider when `choices` is empty.
const NO_CHOICES: &str = "No choices in response";

/// Message author.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    System,
    User,
}

/// One chat message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

impl ChatTurn {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Sampling parameters of a completion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChatOptions {
    pub temperature: f32,
    pub max_tokens: usize,
}

impl ChatOptions {
    pub fn from_config(config: &ReaderConfig) -> Self {
        Self {
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }
}

/// A chat-completion backend.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Model identifier, for logs.
    fn model_name(&self) -> &str;

    /// Return the content of the first completion choice.
    async fn chat(
        &self,
        messages: &[ChatTurn],
        options: &ChatOptions,
    ) -> Result<String, PaperReaderError>;
}

// ── edgequake-llm providers ──────────────────────────────────────────────

/// [`ChatModel`] adapter over an `edgequake_llm` provider.
pub struct ProviderModel {
    provider: Arc<dyn LLMProvider>,
    label: String,
}

impl ProviderModel {
    pub fn new(provider: Arc<dyn LLMProvider>, label: impl Into<String>) -> Self {
        Self {
            provider,
            label: label.into(),
        }
    }

    /// Any server speaking the OpenAI `chat/completions` format.
    pub fn openai_compatible(
        base_url: &str,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        let model = model.into();
        let provider = OpenAIProvider::compatible(api_key, base_url.trim_end_matches('/'))
            .with_model(model.clone());
        Self::new(Arc::new(provider), model)
    }
}

#[async_trait]
impl ChatModel for ProviderModel {
    fn model_name(&self) -> &str {
        &self.label
    }

    async fn chat(
        &self,
        messages: &[ChatTurn],
        options: &ChatOptions,
    ) -> Result<String, PaperReaderError> {
        let messages: Vec<ChatMessage> = messages
            .iter()
            .map(|m| match m.role {
                Role::System => ChatMessage::system(&m.content),
                Role::User => ChatMessage::user(&m.content),
            })
            .collect();

        let options = CompletionOptions {
            temperature: Some(options.temperature),
            max_tokens: Some(options.max_tokens),
            ..Default::default()
        };

        debug!("chat via {} (model {})", self.provider.name(), self.label);
        let response = self
            .provider
            .chat(&messages, Some(&options))
            .await
            .map_err(|e| match e {
                LlmError::ApiError(ref msg) if msg == NO_CHOICES => PaperReaderError::EmptyResponse,
                other => PaperReaderError::ModelApi {
                    message: other.to_string(),
                },
            })?;

        if response.content.is_empty() {
            return Err(PaperReaderError::EmptyResponse);
        }
        Ok(response.content)
    }
}

fn create_named_provider(
    provider_name: &str,
    model: &str,
) -> Result<Arc<dyn ChatModel>, PaperReaderError> {
    let provider = ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        PaperReaderError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })?;
    Ok(Arc::new(ProviderModel::new(
        provider,
        format!("{provider_name}/{model}"),
    )))
}

/// Resolve the chat model, from most-specific to least-specific.
///
/// 1. **Pre-built provider** (`config.provider`), used as-is.
/// 2. **Named provider** (`config.provider_name`) via
///    [`ProviderFactory::create_llm_provider`], which reads that provider's
///    own API-key variable.
/// 3. **Environment pair** `EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`.
/// 4. **OpenAI-compatible endpoint** at [`ReaderConfig::resolved_base_url`]
///    with [`ReaderConfig::resolved_api_key`]. A missing key is not checked
///    here; the first call fails instead.
pub fn resolve_chat_model(config: &ReaderConfig) -> Result<Arc<dyn ChatModel>, PaperReaderError> {
    if let Some(ref provider) = config.provider {
        let label = config.model.clone().unwrap_or_else(|| "custom".to_string());
        return Ok(Arc::new(ProviderModel::new(Arc::clone(provider), label)));
    }

    if let Some(ref name) = config.provider_name {
        let model = config.model.as_deref().unwrap_or("gpt-4.1-nano");
        return create_named_provider(name, model);
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return create_named_provider(&prov, &model);
        }
    }

    let base_url = config.resolved_base_url();
    info!("Using OpenAI-compatible endpoint {} ({})", base_url, config.model_or_default());
    Ok(Arc::new(ProviderModel::openai_compatible(
        &base_url,
        config.resolved_api_key(),
        config.model_or_default(),
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use edgequake_llm::MockProvider;

    #[test]
    fn options_follow_config() {
        let config = ReaderConfig::default();
        let opts = ChatOptions::from_config(&config);
        assert!((opts.temperature - 0.7).abs() < f32::EPSILON);
        assert_eq!(opts.max_tokens, 4000);
    }

    #[test]
    fn compatible_model_is_labelled_by_model_id() {
        let m = ProviderModel::openai_compatible("http://localhost:8080/v1/", "k", "qwen-plus");
        assert_eq!(m.model_name(), "qwen-plus");
    }

    #[test]
    fn default_resolution_uses_compatible_endpoint() {
        let config = ReaderConfig::builder()
            .base_url("http://localhost:1/v1")
            .api_key("test")
            .model("qwen-turbo")
            .build()
            .unwrap();
        // Only meaningful when the edgequake env pair is absent.
        if std::env::var("EDGEQUAKE_LLM_PROVIDER").is_err() {
            let model = resolve_chat_model(&config).unwrap();
            assert_eq!(model.model_name(), "qwen-turbo");
        }
    }

    #[tokio::test]
    async fn provider_reply_is_returned() {
        let mock = MockProvider::new();
        mock.add_response("总结").await;
        let model = ProviderModel::new(Arc::new(mock), "mock");

        let out = model
            .chat(&[ChatTurn::user("hi")], &ChatOptions::from_config(&ReaderConfig::default()))
            .await
            .unwrap();
        assert_eq!(out, "总结");
    }

    #[tokio::test]
    async fn empty_provider_reply_is_empty_response() {
        let mock = MockProvider::new();
        mock.add_response("").await;
        let model = ProviderModel::new(Arc::new(mock), "mock");

        let err = model
            .chat(&[ChatTurn::user("hi")], &ChatOptions::from_config(&ReaderConfig::default()))
            .await
            .unwrap_err();
        assert!(matches!(err, PaperReaderError::EmptyResponse));
    }
}
