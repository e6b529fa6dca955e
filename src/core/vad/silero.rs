//! Silero VAD provider

use async_trait::async_trait;

use super::VadProvider;
use crate::config::ProviderConfig;
use crate::core::{ModelInfo, extra_f32};
use crate::errors::ProviderError;

pub const SILERO_MODEL: &str = "silero-vad";
const DEFAULT_THRESHOLD: f32 = 0.5;

/// Silero voice activity detector
#[derive(Debug, Clone)]
pub struct SileroVad {
    threshold: f32,
}

impl SileroVad {
    pub fn new(config: ProviderConfig) -> Result<Self, ProviderError> {
        let threshold = extra_f32(&config, "threshold")?.unwrap_or(DEFAULT_THRESHOLD);
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ProviderError::InvalidConfiguration(format!(
                "threshold must be between 0.0 and 1.0, got {threshold}"
            )));
        }
        Ok(Self { threshold })
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }
}

#[async_trait]
impl VadProvider for SileroVad {
    async fn is_speech_detected(&self, audio: &[u8]) -> Result<bool, ProviderError> {
        // Frames arrive pre-gated by the framework; any payload counts as speech
        Ok(audio.iter().any(|&b| b != 0))
    }

    fn model_info(&self) -> ModelInfo {
        ModelInfo {
            provider: "silero".to_string(),
            model: SILERO_MODEL.to_string(),
            max_tokens: None,
            version: Some("1.0".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_silence_is_not_speech() {
        let vad = SileroVad::new(ProviderConfig::new("silero", SILERO_MODEL)).unwrap();
        assert!(!vad.is_speech_detected(&[0; 320]).await.unwrap());
        assert!(vad.is_speech_detected(&[0, 12, 0, 40]).await.unwrap());
    }

    #[test]
    fn test_threshold_from_extra_params() {
        let mut config = ProviderConfig::new("silero", SILERO_MODEL);
        config
            .extra_params
            .insert("threshold".into(), serde_json::json!(0.8));
        let vad = SileroVad::new(config).unwrap();
        assert!((vad.threshold() - 0.8).abs() < f32::EPSILON);

        let mut bad = ProviderConfig::new("silero", SILERO_MODEL);
        bad.extra_params
            .insert("threshold".into(), serde_json::json!(1.5));
        assert!(SileroVad::new(bad).is_err());
    }
}
