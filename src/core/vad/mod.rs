//! Voice activity detection providers
//!
//! Signal processing is performed by the media framework's VAD; providers here
//! only answer whether a buffer the framework handed over carries speech.

mod silero;

use async_trait::async_trait;

use super::ModelInfo;
use crate::errors::ProviderError;

pub use silero::{SILERO_MODEL, SileroVad};

/// Base trait for voice activity detectors
#[async_trait]
pub trait VadProvider: Send + Sync {
    /// Whether the buffer contains speech
    async fn is_speech_detected(&self, audio: &[u8]) -> Result<bool, ProviderError>;

    /// Describe the detector in use
    fn model_info(&self) -> ModelInfo;
}
