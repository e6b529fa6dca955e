//! Agent configuration resolution
//!
//! [`ConfigurationBuilder`] layers sources in a fixed order: defaults, then a
//! structured source (JSON document or [`DynamicAgentConfig`]), then
//! environment variables, then explicit `with_*` overrides. Later layers win.
//! [`ConfigurationBuilder::build`] validates before handing out a snapshot.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use super::store::DynamicAgentConfig;
use crate::core::llm::DEFAULT_LLM_MODEL;
use crate::core::stt::DEFAULT_STT_MODEL;
use crate::core::tts::{DEFAULT_TTS_MODEL, DEFAULT_TTS_VOICE};
use crate::errors::ConfigurationError;

pub const DEFAULT_INSTRUCTIONS: &str = "You are a friendly, concise assistant. Keep answers short.";

/// TTS models accepted by validation
pub const VALID_TTS_MODELS: &[&str] = &["tts-1", "tts-1-hd"];

/// Flat, validated agent configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentConfiguration {
    pub instructions: String,
    pub stt_model: String,
    pub llm_model: String,
    pub tts_model: String,
    pub tts_voice: String,
}

impl Default for AgentConfiguration {
    fn default() -> Self {
        Self {
            instructions: DEFAULT_INSTRUCTIONS.to_string(),
            stt_model: DEFAULT_STT_MODEL.to_string(),
            llm_model: DEFAULT_LLM_MODEL.to_string(),
            tts_model: DEFAULT_TTS_MODEL.to_string(),
            tts_voice: DEFAULT_TTS_VOICE.to_string(),
        }
    }
}

impl AgentConfiguration {
    /// Check every field, reporting the first violation
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.instructions.trim().is_empty() {
            return Err(ConfigurationError::EmptyInstructions);
        }
        if self.stt_model.is_empty() {
            return Err(ConfigurationError::MissingModel { component: "STT" });
        }
        if self.llm_model.is_empty() {
            return Err(ConfigurationError::MissingModel { component: "LLM" });
        }
        if self.tts_model.is_empty() {
            return Err(ConfigurationError::MissingModel { component: "TTS" });
        }
        if !VALID_TTS_MODELS.contains(&self.tts_model.as_str()) {
            return Err(ConfigurationError::InvalidTtsModel {
                model: self.tts_model.clone(),
                valid: VALID_TTS_MODELS,
            });
        }
        Ok(())
    }
}

/// Builder for [`AgentConfiguration`]
///
/// # Example
/// ```rust
/// use waav_agent::config::ConfigurationBuilder;
///
/// let config = ConfigurationBuilder::new()
///     .with_instructions("Answer in one sentence.")
///     .with_tts_model("tts-1-hd", Some("nova"))
///     .build()
///     .unwrap();
/// assert_eq!(config.tts_voice, "nova");
/// ```
#[derive(Debug, Clone, Default)]
pub struct ConfigurationBuilder {
    config: AgentConfiguration,
}

impl ConfigurationBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy instructions and per-component models from a JSON document
    ///
    /// Recognized keys: `system_instructions` (or `instructions`), `stt.model`,
    /// `llm.model`, `tts.model`, `tts.voice` (or `tts.voice_id`). Missing keys
    /// and values of the wrong type are ignored.
    pub fn load_from_structured(mut self, source: &Value) -> Self {
        let Some(root) = source.as_object() else {
            return self;
        };

        if let Some(instructions) = string_at(root, &["system_instructions", "instructions"]) {
            self.config.instructions = instructions;
        }
        if let Some(model) = section(root, "stt").and_then(|s| string_at(s, &["model"])) {
            self.config.stt_model = model;
        }
        if let Some(model) = section(root, "llm").and_then(|s| string_at(s, &["model"])) {
            self.config.llm_model = model;
        }
        if let Some(tts) = section(root, "tts") {
            if let Some(model) = string_at(tts, &["model"]) {
                self.config.tts_model = model;
            }
            if let Some(voice) = string_at(tts, &["voice", "voice_id"]) {
                self.config.tts_voice = voice;
            }
        }

        self
    }

    /// Copy instructions and per-component models from the persisted config
    pub fn load_from_agent_config(mut self, agent_config: &DynamicAgentConfig) -> Self {
        self.config.instructions = agent_config.instructions.clone();
        self.config.stt_model = agent_config.stt.model.clone();
        self.config.llm_model = agent_config.llm.model.clone();
        self.config.tts_model = agent_config.tts.model.clone();
        if let Some(voice) = &agent_config.tts.voice_id {
            self.config.tts_voice = voice.clone();
        }
        self
    }

    /// Apply `AGENT_INSTRUCTIONS`, `STT_MODEL`, `LLM_MODEL`, `TTS_MODEL` and
    /// `TTS_VOICE_ID` when set
    pub fn load_from_environment(mut self) -> Self {
        let env = |key: &str| std::env::var(key).ok();

        if let Some(v) = env("AGENT_INSTRUCTIONS") {
            self.config.instructions = v;
        }
        if let Some(v) = env("STT_MODEL") {
            self.config.stt_model = v;
        }
        if let Some(v) = env("LLM_MODEL") {
            self.config.llm_model = v;
        }
        if let Some(v) = env("TTS_MODEL") {
            self.config.tts_model = v;
        }
        if let Some(v) = env("TTS_VOICE_ID") {
            self.config.tts_voice = v;
        }
        self
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.config.instructions = instructions.into();
        self
    }

    pub fn with_stt_model(mut self, model: impl Into<String>) -> Self {
        self.config.stt_model = model.into();
        self
    }

    pub fn with_llm_model(mut self, model: impl Into<String>) -> Self {
        self.config.llm_model = model.into();
        self
    }

    /// Set the TTS model, and the voice only when one is given
    pub fn with_tts_model(mut self, model: impl Into<String>, voice: Option<&str>) -> Self {
        self.config.tts_model = model.into();
        if let Some(voice) = voice.filter(|v| !v.is_empty()) {
            self.config.tts_voice = voice.to_string();
        }
        self
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        self.config.validate()
    }

    /// Validate and return a snapshot; the builder stays usable
    pub fn build(&self) -> Result<AgentConfiguration, ConfigurationError> {
        self.validate()?;
        Ok(self.config.clone())
    }

    /// The five fields as a JSON object, without validation
    pub fn to_map(&self) -> Value {
        json!({
            "instructions": self.config.instructions,
            "stt_model": self.config.stt_model,
            "llm_model": self.config.llm_model,
            "tts_model": self.config.tts_model,
            "tts_voice": self.config.tts_voice,
        })
    }
}

fn section<'a>(root: &'a Map<String, Value>, key: &str) -> Option<&'a Map<String, Value>> {
    root.get(key).and_then(Value::as_object)
}

fn string_at(map: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|key| map.get(*key).and_then(Value::as_str))
        .map(str::to_string)
}
