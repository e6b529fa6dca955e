//! OpenAI-compatible chat provider.
//!
//! Holds the chat-completion parameters (model, temperature, token cap) that
//! the media framework forwards to the vendor. Generation here is
//! deterministic so sessions and plugin chains can run without network access.

use async_trait::async_trait;
use futures::stream::{self, StreamExt};

use super::{LlmProvider, ResponseStream};
use crate::config::ProviderConfig;
use crate::core::{ModelInfo, api_key_or_env, extra_f32};
use crate::errors::ProviderError;

pub const DEFAULT_LLM_MODEL: &str = "gpt-4o-mini";
const DEFAULT_TEMPERATURE: f32 = 0.7;
const DEFAULT_MAX_TOKENS: u32 = 1000;
const CONTEXT_WINDOW: u32 = 4096;

/// OpenAI chat-completion provider
#[derive(Debug, Clone)]
pub struct OpenAiLlm {
    model: String,
    api_key: Option<String>,
    temperature: f32,
    max_tokens: u32,
}

impl OpenAiLlm {
    pub fn new(config: ProviderConfig) -> Result<Self, ProviderError> {
        let model = if config.model.trim().is_empty() {
            DEFAULT_LLM_MODEL.to_string()
        } else {
            config.model.clone()
        };

        let temperature = match config.temperature {
            Some(t) => t,
            None => extra_f32(&config, "temperature")?.unwrap_or(DEFAULT_TEMPERATURE),
        };
        if !(0.0..=2.0).contains(&temperature) {
            return Err(ProviderError::InvalidConfiguration(format!(
                "temperature must be between 0.0 and 2.0, got {temperature}"
            )));
        }

        let max_tokens = config.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS);
        if max_tokens == 0 {
            return Err(ProviderError::InvalidConfiguration(
                "max_tokens must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            api_key: api_key_or_env(&config, &["OPENAI_API_KEY"]),
            model,
            temperature,
            max_tokens,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn temperature(&self) -> f32 {
        self.temperature
    }

    pub fn max_tokens(&self) -> u32 {
        self.max_tokens
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    // Echo the prompt, truncated to the configured token cap
    fn compose(&self, message: &str) -> String {
        message
            .split_whitespace()
            .take(self.max_tokens as usize)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[async_trait]
impl LlmProvider for OpenAiLlm {
    async fn generate_response(
        &self,
        message: &str,
        _system_prompt: &str,
    ) -> Result<String, ProviderError> {
        if message.trim().is_empty() {
            return Err(ProviderError::Request("message is empty".to_string()));
        }
        Ok(self.compose(message))
    }

    async fn generate_streaming_response(
        &self,
        message: &str,
        system_prompt: &str,
    ) -> Result<ResponseStream, ProviderError> {
        let full = self.generate_response(message, system_prompt).await?;
        let chunks: Vec<Result<String, ProviderError>> = full
            .split_inclusive(' ')
            .map(|chunk| Ok(chunk.to_string()))
            .collect();
        Ok(stream::iter(chunks).boxed())
    }

    fn model_info(&self) -> ModelInfo {
        ModelInfo {
            provider: "openai".to_string(),
            model: self.model.clone(),
            max_tokens: Some(CONTEXT_WINDOW),
            version: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_applied() {
        let llm = OpenAiLlm::new(ProviderConfig::new("openai", "")).unwrap();
        assert_eq!(llm.model(), DEFAULT_LLM_MODEL);
        assert_eq!(llm.temperature(), 0.7);
        assert_eq!(llm.max_tokens(), 1000);
    }

    #[test]
    fn test_temperature_out_of_range_rejected() {
        let mut config = ProviderConfig::new("openai", "gpt-4o-mini");
        config.temperature = Some(3.5);
        assert!(matches!(
            OpenAiLlm::new(config),
            Err(ProviderError::InvalidConfiguration(_))
        ));
    }

    #[tokio::test]
    async fn test_streaming_reassembles_response() {
        let llm = OpenAiLlm::new(ProviderConfig::new("openai", "gpt-4o-mini")).unwrap();
        let full = llm.generate_response("tell me a joke", "").await.unwrap();
        let chunks: Vec<String> = llm
            .generate_streaming_response("tell me a joke", "")
            .await
            .unwrap()
            .map(|c| c.unwrap())
            .collect()
            .await;
        assert_eq!(chunks.concat(), full);
        assert_eq!(chunks.len(), 4);
    }

    #[tokio::test]
    async fn test_empty_message_is_an_error() {
        let llm = OpenAiLlm::new(ProviderConfig::new("openai", "gpt-4o-mini")).unwrap();
        assert!(llm.generate_response("   ", "").await.is_err());
    }
}
