//! LLM Provider Strategy
//!
//! Common interface for inference backends. The agent and the advisor
//! pipeline only talk to `LlmProvider`, so tests swap in scripted providers
//! and deployments choose Ollama or any other backend.
//!
//! ```rust,ignore
//! let completion = provider.complete(&messages, &GenerationOptions::default()).await?;
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{AgentError, Result};
use crate::message::Message;

/// Sampling configuration for one completion
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GenerationOptions {
    /// Model identifier (e.g., "llama3.2")
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_top_p")]
    pub top_p: f32,
}

const fn default_temperature() -> f32 {
    0.3
}
const fn default_max_tokens() -> u32 {
    2048
}
const fn default_top_p() -> f32 {
    0.9
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            model: "llama3.2".into(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            top_p: default_top_p(),
        }
    }
}

/// Response from an LLM completion
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Completion {
    pub content: String,

    pub model: String,

    pub usage: Option<TokenUsage>,

    pub finish_reason: Option<FinishReason>,
}

impl Completion {
    /// Plain completion with no usage data (scripted providers, tests)
    pub fn text(content: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            model: model.into(),
            usage: None,
            finish_reason: Some(FinishReason::Stop),
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    Length,
    Error,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProviderInfo {
    pub name: String,
    pub models: Vec<ModelInfo>,
    pub supports_tools: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ModelInfo {
    pub id: String,
    pub name: String,
    pub context_length: Option<u32>,
}

/// Strategy trait for LLM providers
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider name and capabilities
    async fn info(&self) -> Result<ProviderInfo>;

    /// Whether the backend is reachable
    async fn health_check(&self) -> Result<bool>;

    /// Generate a completion from messages
    async fn complete(&self, messages: &[Message], options: &GenerationOptions)
    -> Result<Completion>;

    async fn list_models(&self) -> Result<Vec<ModelInfo>>;

    /// One embedding vector per input text, in input order.
    ///
    /// Backends without an embedding endpoint keep the default, which
    /// fails with `AgentError::Unsupported`.
    async fn embed(&self, texts: &[String], model: &str) -> Result<Vec<Vec<f32>>> {
        let _ = texts;
        Err(AgentError::Unsupported(format!("embeddings ({model})")))
    }

    /// Estimate token count for text (~4 characters per token)
    fn estimate_tokens(&self, text: &str) -> u32 {
        u32::try_from(text.len() / 4).unwrap_or(u32::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_options_defaults() {
        let opts = GenerationOptions::default();
        assert!((opts.temperature - 0.3).abs() < f32::EPSILON);
        assert_eq!(opts.max_tokens, 2048);
        assert_eq!(opts.model, "llama3.2");
    }

    struct Bare;

    #[async_trait]
    impl LlmProvider for Bare {
        async fn info(&self) -> Result<ProviderInfo> {
            Ok(ProviderInfo {
                name: "bare".into(),
                models: vec![],
                supports_tools: false,
            })
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }

        async fn complete(&self, _: &[Message], options: &GenerationOptions) -> Result<Completion> {
            Ok(Completion::text("ok", &options.model))
        }

        async fn list_models(&self) -> Result<Vec<ModelInfo>> {
            Ok(vec![])
        }
    }

    #[tokio::test]
    async fn test_embed_defaults_to_unsupported() {
        let err = Bare.embed(&["text".into()], "nomic-embed-text").await.unwrap_err();
        assert!(matches!(err, AgentError::Unsupported(_)));
    }

    #[test]
    fn test_options_deserialize_with_defaults() {
        let opts: GenerationOptions = serde_json::from_str(r#"{"model": "qwen2.5"}"#).unwrap();
        assert_eq!(opts.model, "qwen2.5");
        assert_eq!(opts.max_tokens, 2048);
    }
}
