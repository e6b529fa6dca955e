//! OpenAI Whisper transcription provider.

use async_trait::async_trait;

use super::SttProvider;
use crate::config::ProviderConfig;
use crate::core::{ModelInfo, api_key_or_env};
use crate::errors::ProviderError;

pub const DEFAULT_STT_MODEL: &str = "whisper-1";

/// OpenAI transcription provider
///
/// Audio frames are decoded by the media framework before they reach the
/// pipeline; this provider treats its input as already-decoded UTF-8 text.
#[derive(Debug, Clone)]
pub struct OpenAiStt {
    model: String,
    api_key: Option<String>,
}

impl OpenAiStt {
    pub fn new(config: ProviderConfig) -> Result<Self, ProviderError> {
        let model = if config.model.trim().is_empty() {
            DEFAULT_STT_MODEL.to_string()
        } else {
            config.model.clone()
        };
        Ok(Self {
            api_key: api_key_or_env(&config, &["OPENAI_API_KEY"]),
            model,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }
}

#[async_trait]
impl SttProvider for OpenAiStt {
    async fn transcribe(&self, audio: &[u8]) -> Result<String, ProviderError> {
        let text = std::str::from_utf8(audio)
            .map_err(|e| ProviderError::Request(format!("undecodable audio payload: {e}")))?;
        Ok(text.trim().to_string())
    }

    fn model_info(&self) -> ModelInfo {
        ModelInfo {
            provider: "openai".to_string(),
            model: self.model.clone(),
            max_tokens: None,
            version: None,
        }
    }
}
