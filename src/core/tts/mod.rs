//! Text-to-speech providers

mod openai;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use super::ModelInfo;
use crate::errors::ProviderError;

pub use openai::{DEFAULT_TTS_MODEL, DEFAULT_TTS_VOICE, OpenAiTts};

/// A voice offered by a TTS provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voice {
    pub id: String,
    pub name: String,
}

/// Base trait for text-to-speech providers
#[async_trait]
pub trait TtsProvider: Send + Sync {
    /// Synthesize text, optionally overriding the configured voice
    async fn synthesize(&self, text: &str, voice: Option<&str>) -> Result<Bytes, ProviderError>;

    /// Voices this provider can synthesize with
    async fn available_voices(&self) -> Vec<Voice>;

    /// Describe the provider and model in use
    fn model_info(&self) -> ModelInfo;
}
