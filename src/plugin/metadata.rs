//! Provider and plugin metadata
//!
//! Metadata travels with each registry binding so the CLI and the
//! `/providers` endpoint can describe what is installed without constructing
//! anything.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::core::ProviderKind;

/// Provider metadata for discovery and documentation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderMetadata {
    /// Provider identifier (e.g., "openai")
    pub name: String,

    /// Display name (e.g., "OpenAI Chat Completions")
    pub display_name: String,

    /// Brief description
    pub description: String,

    /// Pipeline stage
    pub kind: ProviderKind,

    /// Required configuration keys
    pub required_config_keys: Vec<String>,

    /// Alternative lookup names
    #[serde(default)]
    pub aliases: Vec<String>,

    /// Known model identifiers
    #[serde(default)]
    pub supported_models: Vec<String>,

    /// Provider features (e.g., "streaming")
    #[serde(default)]
    pub features: BTreeSet<String>,
}

impl ProviderMetadata {
    /// Create metadata with the minimal required fields
    pub fn new(kind: ProviderKind, name: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            display_name: display_name.into(),
            description: String::new(),
            kind,
            required_config_keys: vec!["api_key".to_string()],
            aliases: Vec::new(),
            supported_models: Vec::new(),
            features: BTreeSet::new(),
        }
    }

    pub fn llm(name: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self::new(ProviderKind::Llm, name, display_name)
    }

    pub fn stt(name: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self::new(ProviderKind::Stt, name, display_name)
    }

    pub fn tts(name: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self::new(ProviderKind::Tts, name, display_name)
    }

    pub fn vad(name: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            required_config_keys: Vec::new(),
            ..Self::new(ProviderKind::Vad, name, display_name)
        }
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Add an alias
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    /// Add multiple features
    pub fn with_features(mut self, features: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.features.extend(features.into_iter().map(Into::into));
        self
    }

    /// Set supported models
    pub fn with_models(mut self, models: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.supported_models = models.into_iter().map(Into::into).collect();
        self
    }

    /// Set required config keys
    pub fn with_required_config(
        mut self,
        keys: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.required_config_keys = keys.into_iter().map(Into::into).collect();
        self
    }
}

/// Message-plugin metadata
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PluginMetadata {
    /// Plugin identifier used in configuration (e.g., "sentiment_analysis")
    pub name: String,

    /// Human-readable name
    pub display_name: String,

    /// Brief description
    pub description: String,

    /// Keys accepted in the plugin's `config` map
    #[serde(default)]
    pub config_keys: Vec<String>,
}

impl PluginMetadata {
    pub fn new(name: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            display_name: display_name.into(),
            ..Default::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_config_keys(mut self, keys: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.config_keys = keys.into_iter().map(Into::into).collect();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_metadata_builder() {
        let meta = ProviderMetadata::tts("openai", "OpenAI TTS")
            .with_description("Speech synthesis")
            .with_alias("open-ai")
            .with_features(["voices", "streaming"])
            .with_models(["tts-1", "tts-1-hd"]);

        assert_eq!(meta.kind, ProviderKind::Tts);
        assert_eq!(meta.aliases, vec!["open-ai"]);
        assert_eq!(meta.supported_models.len(), 2);
        assert_eq!(
            meta.features.iter().cloned().collect::<Vec<_>>(),
            vec!["streaming", "voices"]
        );
        assert_eq!(meta.required_config_keys, vec!["api_key"]);
    }

    #[test]
    fn test_vad_metadata_requires_no_key() {
        let meta = ProviderMetadata::vad("silero", "Silero VAD");
        assert!(meta.required_config_keys.is_empty());
    }
}
