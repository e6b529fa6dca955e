//! Speech-to-text providers

mod openai;

use async_trait::async_trait;

use super::ModelInfo;
use crate::errors::ProviderError;

pub use openai::{DEFAULT_STT_MODEL, OpenAiStt};

/// Base trait for speech-to-text providers
#[async_trait]
pub trait SttProvider: Send + Sync {
    /// Transcribe a complete audio buffer
    async fn transcribe(&self, audio: &[u8]) -> Result<String, ProviderError>;

    /// Describe the provider and model in use
    fn model_info(&self) -> ModelInfo;
}
