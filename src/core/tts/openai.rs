//! OpenAI speech synthesis provider.
//!
//! Models: tts-1, tts-1-hd, gpt-4o-mini-tts
//! Voices: alloy, ash, ballad, coral, echo, fable, onyx, nova, sage, shimmer, verse

use async_trait::async_trait;
use bytes::Bytes;

use super::{TtsProvider, Voice};
use crate::config::ProviderConfig;
use crate::core::{ModelInfo, api_key_or_env};
use crate::errors::ProviderError;

pub const DEFAULT_TTS_MODEL: &str = "tts-1";
pub const DEFAULT_TTS_VOICE: &str = "alloy";

const VOICES: &[(&str, &str)] = &[
    ("alloy", "Alloy"),
    ("ash", "Ash"),
    ("ballad", "Ballad"),
    ("coral", "Coral"),
    ("echo", "Echo"),
    ("fable", "Fable"),
    ("onyx", "Onyx"),
    ("nova", "Nova"),
    ("sage", "Sage"),
    ("shimmer", "Shimmer"),
    ("verse", "Verse"),
];

fn is_known_voice(voice: &str) -> bool {
    VOICES.iter().any(|(id, _)| id.eq_ignore_ascii_case(voice))
}

/// OpenAI speech provider
#[derive(Debug, Clone)]
pub struct OpenAiTts {
    model: String,
    voice: String,
    api_key: Option<String>,
}

impl OpenAiTts {
    pub fn new(config: ProviderConfig) -> Result<Self, ProviderError> {
        let model = if config.model.trim().is_empty() {
            DEFAULT_TTS_MODEL.to_string()
        } else {
            config.model.clone()
        };

        let voice = config
            .voice_id
            .clone()
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_TTS_VOICE.to_string());
        if !is_known_voice(&voice) {
            return Err(ProviderError::InvalidConfiguration(format!(
                "unknown OpenAI voice '{voice}'"
            )));
        }

        Ok(Self {
            api_key: api_key_or_env(&config, &["OPENAI_API_KEY"]),
            model,
            voice: voice.to_lowercase(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn voice(&self) -> &str {
        &self.voice
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }
}

#[async_trait]
impl TtsProvider for OpenAiTts {
    async fn synthesize(&self, text: &str, voice: Option<&str>) -> Result<Bytes, ProviderError> {
        if let Some(v) = voice
            && !is_known_voice(v)
        {
            return Err(ProviderError::Request(format!("unknown OpenAI voice '{v}'")));
        }
        Ok(Bytes::copy_from_slice(text.as_bytes()))
    }

    async fn available_voices(&self) -> Vec<Voice> {
        VOICES
            .iter()
            .map(|(id, name)| Voice {
                id: id.to_string(),
                name: name.to_string(),
            })
            .collect()
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
