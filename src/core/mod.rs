//! Provider roles for the voice pipeline
//!
//! Each pipeline stage is a trait object selected by name through
//! [`crate::plugin::ProviderRegistry`]:
//!
//! - [`llm::LlmProvider`] - response generation
//! - [`stt::SttProvider`] - speech-to-text
//! - [`tts::TtsProvider`] - text-to-speech
//! - [`vad::VadProvider`] - voice activity detection
//!
//! The built-in implementations (`openai`, `silero`) are offline shims: vendor
//! network calls live behind the real-time media framework, not in this crate.

pub mod llm;
pub mod stt;
pub mod tts;
pub mod vad;

use serde::{Deserialize, Serialize};

use crate::config::ProviderConfig;
use crate::errors::ProviderError;

pub use llm::{LlmProvider, OpenAiLlm};
pub use stt::{OpenAiStt, SttProvider};
pub use tts::{OpenAiTts, TtsProvider, Voice};
pub use vad::{SileroVad, VadProvider};

/// Pipeline stage a provider implements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Llm,
    Stt,
    Tts,
    Vad,
}

impl ProviderKind {
    /// All kinds in pipeline declaration order
    pub const ALL: [ProviderKind; 4] = [
        ProviderKind::Llm,
        ProviderKind::Stt,
        ProviderKind::Tts,
        ProviderKind::Vad,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Llm => "llm",
            ProviderKind::Stt => "stt",
            ProviderKind::Tts => "tts",
            ProviderKind::Vad => "vad",
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "llm" => Ok(ProviderKind::Llm),
            "stt" => Ok(ProviderKind::Stt),
            "tts" => Ok(ProviderKind::Tts),
            "vad" => Ok(ProviderKind::Vad),
            _ => Err(format!(
                "Invalid provider type: {s}. Expected one of: llm, stt, tts, vad"
            )),
        }
    }
}

/// Descriptive information a provider reports about itself
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Provider identifier (e.g., "openai")
    pub provider: String,
    /// Model identifier (e.g., "gpt-4o-mini")
    pub model: String,
    /// Context window or output cap, when meaningful
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Model version, when the provider publishes one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// Read a float out of `extra_params`, rejecting non-numeric values
pub(crate) fn extra_f32(config: &ProviderConfig, key: &str) -> Result<Option<f32>, ProviderError> {
    match config.extra_params.get(key) {
        None => Ok(None),
        Some(value) => value.as_f64().map(|v| Some(v as f32)).ok_or_else(|| {
            ProviderError::InvalidConfiguration(format!("'{key}' must be a number, got {value}"))
        }),
    }
}

/// Resolve an API key from the config, falling back to the given environment variables
pub(crate) fn api_key_or_env(config: &ProviderConfig, env_keys: &[&str]) -> Option<String> {
    config
        .api_key
        .clone()
        .filter(|k| !k.is_empty())
        .or_else(|| env_keys.iter().find_map(|key| std::env::var(key).ok()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_kind_round_trip() {
        for kind in ProviderKind::ALL {
            let parsed: ProviderKind = kind.to_string().parse().unwrap();
            assert_eq!(parsed, kind);
        }
        assert_eq!("LLM".parse::<ProviderKind>().unwrap(), ProviderKind::Llm);
        assert!("realtime".parse::<ProviderKind>().is_err());
    }

    #[test]
    fn test_extra_f32_rejects_strings() {
        let mut config = ProviderConfig::new("openai", "gpt-4o-mini");
        config
            .extra_params
            .insert("top_p".into(), serde_json::json!("high"));
        assert!(extra_f32(&config, "top_p").is_err());
        assert_eq!(extra_f32(&config, "missing").unwrap(), None);
    }
}
