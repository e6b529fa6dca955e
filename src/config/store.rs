//! Persisted, name-driven agent configuration
//!
//! [`DynamicAgentConfig`] picks each pipeline provider and the plugin list by
//! name. [`ConfigStore`] owns the in-memory copy, persists every mutation to
//! JSON, and turns the configuration into provider and plugin instances
//! through the registries.

use parking_lot::RwLock;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use super::builder::DEFAULT_INSTRUCTIONS;
use crate::agent::{AgentPlugin, PluginOptions};
use crate::core::llm::DEFAULT_LLM_MODEL;
use crate::core::stt::DEFAULT_STT_MODEL;
use crate::core::tts::{DEFAULT_TTS_MODEL, DEFAULT_TTS_VOICE};
use crate::core::vad::SILERO_MODEL;
use crate::core::{LlmProvider, ProviderKind, SttProvider, TtsProvider, VadProvider};
use crate::errors::{ConfigStoreError, ProviderError};
use crate::plugin::{PluginRegistry, ProviderRegistry};
use crate::utils::write_json_atomic;

/// Settings for one pipeline provider
///
/// The kind is implied by the slot the config occupies in
/// [`DynamicAgentConfig`]. Updates replace the whole value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub provider_name: String,
    pub model: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub api_url: Option<String>,
    #[serde(default)]
    pub voice_id: Option<String>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub extra_params: Map<String, Value>,
}

impl ProviderConfig {
    pub fn new(provider_name: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider_name: provider_name.into(),
            model: model.into(),
            api_key: None,
            api_url: None,
            voice_id: None,
            temperature: None,
            max_tokens: None,
            extra_params: Map::new(),
        }
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key;
        self
    }

    pub fn with_voice(mut self, voice_id: Option<String>) -> Self {
        self.voice_id = voice_id;
        self
    }

    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// A plugin selected by name, with its options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginConfig {
    pub plugin_name: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub config: PluginOptions,
}

impl PluginConfig {
    pub fn new(plugin_name: impl Into<String>) -> Self {
        Self {
            plugin_name: plugin_name.into(),
            enabled: true,
            config: PluginOptions::new(),
        }
    }

    pub fn with_config(mut self, config: PluginOptions) -> Self {
        self.config = config;
        self
    }
}

/// Complete name-driven agent configuration, persisted as JSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DynamicAgentConfig {
    pub llm: ProviderConfig,
    pub stt: ProviderConfig,
    pub tts: ProviderConfig,
    pub vad: ProviderConfig,

    pub enabled_plugins: Vec<PluginConfig>,

    pub instructions: String,
    #[serde(default)]
    pub enable_barge_in: bool,
    #[serde(default = "default_min_endpointing_delay")]
    pub min_endpointing_delay: f64,
    /// Seconds an LLM call may take before it is abandoned
    #[serde(default = "default_max_response_time")]
    pub max_response_time: f64,

    #[serde(default = "default_true")]
    pub enable_metrics: bool,
    #[serde(default = "default_metrics_retention_hours")]
    pub metrics_retention_hours: u32,
}

fn default_true() -> bool {
    true
}

fn default_min_endpointing_delay() -> f64 {
    0.5
}

fn default_max_response_time() -> f64 {
    30.0
}

fn default_metrics_retention_hours() -> u32 {
    24
}

// Files written by older tooling carry `null` for empty maps
fn null_as_empty<'de, D>(deserializer: D) -> Result<Map<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Map<String, Value>>::deserialize(deserializer)?.unwrap_or_default())
}

impl Default for DynamicAgentConfig {
    fn default() -> Self {
        Self {
            llm: ProviderConfig::new("openai", DEFAULT_LLM_MODEL)
                .with_temperature(Some(0.7))
                .with_max_tokens(Some(1000)),
            stt: ProviderConfig::new("openai", DEFAULT_STT_MODEL),
            tts: ProviderConfig::new("openai", DEFAULT_TTS_MODEL)
                .with_voice(Some(DEFAULT_TTS_VOICE.to_string())),
            vad: ProviderConfig::new("silero", SILERO_MODEL),
            enabled_plugins: vec![PluginConfig::new("example")],
            instructions: DEFAULT_INSTRUCTIONS.to_string(),
            enable_barge_in: false,
            min_endpointing_delay: default_min_endpointing_delay(),
            max_response_time: default_max_response_time(),
            enable_metrics: true,
            metrics_retention_hours: default_metrics_retention_hours(),
        }
    }
}

impl DynamicAgentConfig {
    /// Build from environment variables, falling back to defaults
    ///
    /// Unparseable numbers keep their default and log a warning.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let var = |key: &str| std::env::var(key).ok();
        let first = |keys: &[&str]| keys.iter().find_map(|k| var(k).filter(|v| !v.is_empty()));

        let llm = ProviderConfig::new(
            var("LLM_PROVIDER").unwrap_or(defaults.llm.provider_name),
            var("LLM_MODEL").unwrap_or(defaults.llm.model),
        )
        .with_api_key(first(&["OPENAI_API_KEY", "ANTHROPIC_API_KEY"]))
        .with_temperature(Some(env_number("LLM_TEMPERATURE", 0.7)))
        .with_max_tokens(Some(env_number("LLM_MAX_TOKENS", 1000)));

        let stt = ProviderConfig::new(
            var("STT_PROVIDER").unwrap_or(defaults.stt.provider_name),
            var("STT_MODEL").unwrap_or(defaults.stt.model),
        )
        .with_api_key(first(&["OPENAI_API_KEY", "GOOGLE_API_KEY"]));

        let tts = ProviderConfig::new(
            var("TTS_PROVIDER").unwrap_or(defaults.tts.provider_name),
            var("TTS_MODEL").unwrap_or(defaults.tts.model),
        )
        .with_voice(Some(
            var("TTS_VOICE_ID").unwrap_or_else(|| DEFAULT_TTS_VOICE.to_string()),
        ))
        .with_api_key(first(&["OPENAI_API_KEY", "ELEVENLABS_API_KEY"]));

        let vad = ProviderConfig::new(
            var("VAD_PROVIDER").unwrap_or(defaults.vad.provider_name),
            SILERO_MODEL,
        );

        let enabled_plugins = var("ENABLED_PLUGINS")
            .unwrap_or_else(|| "example".to_string())
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(PluginConfig::new)
            .collect();

        Self {
            llm,
            stt,
            tts,
            vad,
            enabled_plugins,
            instructions: var("AGENT_INSTRUCTIONS").unwrap_or(defaults.instructions),
            enable_barge_in: env_flag("ENABLE_BARGE_IN", false),
            min_endpointing_delay: env_number("MIN_ENDPOINTING_DELAY", 0.5),
            max_response_time: env_number("MAX_RESPONSE_TIME", 30.0),
            enable_metrics: env_flag("ENABLE_METRICS", true),
            metrics_retention_hours: env_number("METRICS_RETENTION_HOURS", 24),
        }
    }

    /// A documented starting point for hand-edited configuration files
    pub fn template() -> Self {
        let key = Some("your-openai-api-key".to_string());
        Self {
            llm: ProviderConfig::new("openai", DEFAULT_LLM_MODEL)
                .with_api_key(key.clone())
                .with_temperature(Some(0.7))
                .with_max_tokens(Some(1000)),
            stt: ProviderConfig::new("openai", DEFAULT_STT_MODEL).with_api_key(key.clone()),
            tts: ProviderConfig::new("openai", DEFAULT_TTS_MODEL)
                .with_voice(Some(DEFAULT_TTS_VOICE.to_string()))
                .with_api_key(key),
            instructions: "You are a friendly, concise assistant. Keep answers short and helpful."
                .to_string(),
            ..Self::default()
        }
    }

    pub fn provider(&self, kind: ProviderKind) -> &ProviderConfig {
        match kind {
            ProviderKind::Llm => &self.llm,
            ProviderKind::Stt => &self.stt,
            ProviderKind::Tts => &self.tts,
            ProviderKind::Vad => &self.vad,
        }
    }

    pub fn provider_mut(&mut self, kind: ProviderKind) -> &mut ProviderConfig {
        match kind {
            ProviderKind::Llm => &mut self.llm,
            ProviderKind::Stt => &mut self.stt,
            ProviderKind::Tts => &mut self.tts,
            ProviderKind::Vad => &mut self.vad,
        }
    }

    /// `max_response_time` as a duration; non-positive values disable the limit
    pub fn response_timeout(&self) -> Option<std::time::Duration> {
        (self.max_response_time.is_finite() && self.max_response_time > 0.0)
            .then(|| std::time::Duration::from_secs_f64(self.max_response_time))
    }
}

fn env_number<T>(key: &str, default: T) -> T
where
    T: FromStr + std::fmt::Display,
{
    match std::env::var(key) {
        Err(_) => default,
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key = %key, value = %raw, default = %default, "Invalid number, using default");
            default
        }),
    }
}

fn env_flag(key: &str, default: bool) -> bool {
    std::env::var(key)
        .map(|v| v.trim().eq_ignore_ascii_case("true"))
        .unwrap_or(default)
}

/// Owner of the persisted [`DynamicAgentConfig`]
///
/// Mutations are applied to a copy, written atomically, and only then made
/// visible. A failed write leaves both the file and the in-memory config
/// unchanged.
pub struct ConfigStore {
    path: PathBuf,
    config: RwLock<DynamicAgentConfig>,
    providers: Arc<ProviderRegistry>,
    plugins: Arc<PluginRegistry>,
}

impl ConfigStore {
    /// Load from `path` when it exists, otherwise from the environment
    pub fn load(
        path: impl Into<PathBuf>,
        providers: Arc<ProviderRegistry>,
        plugins: Arc<PluginRegistry>,
    ) -> Result<Self, ConfigStoreError> {
        let path = path.into();

        let config = if path.exists() {
            let contents = std::fs::read_to_string(&path).map_err(|source| ConfigStoreError::Read {
                path: path.clone(),
                source,
            })?;
            let config = serde_json::from_str(&contents).map_err(|source| ConfigStoreError::Parse {
                path: path.clone(),
                source,
            })?;
            tracing::info!(path = %path.display(), "Loaded agent configuration");
            config
        } else {
            tracing::info!(
                path = %path.display(),
                "No agent configuration file, using environment"
            );
            DynamicAgentConfig::from_env()
        };

        Ok(Self::with_config(path, config, providers, plugins))
    }

    /// Wrap an existing configuration without touching the filesystem
    pub fn with_config(
        path: impl Into<PathBuf>,
        config: DynamicAgentConfig,
        providers: Arc<ProviderRegistry>,
        plugins: Arc<PluginRegistry>,
    ) -> Self {
        Self {
            path: path.into(),
            config: RwLock::new(config),
            providers,
            plugins,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Snapshot of the current configuration
    pub fn config(&self) -> DynamicAgentConfig {
        self.config.read().clone()
    }

    pub fn providers(&self) -> &Arc<ProviderRegistry> {
        &self.providers
    }

    pub fn plugins(&self) -> &Arc<PluginRegistry> {
        &self.plugins
    }

    fn mutate<R>(
        &self,
        change: impl FnOnce(&mut DynamicAgentConfig) -> R,
    ) -> Result<R, ConfigStoreError> {
        let mut guard = self.config.write();
        let mut next = guard.clone();
        let result = change(&mut next);
        self.persist(&next)?;
        *guard = next;
        Ok(result)
    }

    fn persist(&self, config: &DynamicAgentConfig) -> Result<(), ConfigStoreError> {
        write_json_atomic(&self.path, config).map_err(|source| ConfigStoreError::Write {
            path: self.path.clone(),
            source,
        })
    }

    /// Replace the provider config for one pipeline slot
    pub fn update_provider(
        &self,
        kind: ProviderKind,
        provider: ProviderConfig,
    ) -> Result<(), ConfigStoreError> {
        let name = provider.provider_name.clone();
        self.mutate(|config| *config.provider_mut(kind) = provider)?;
        tracing::info!(kind = %kind, provider = %name, "Provider configuration updated");
        Ok(())
    }

    /// Add a plugin, or update the existing entry with the same name
    pub fn add_plugin(&self, plugin: PluginConfig) -> Result<(), ConfigStoreError> {
        let name = plugin.plugin_name.clone();
        self.mutate(|config| {
            match config
                .enabled_plugins
                .iter_mut()
                .find(|p| p.plugin_name == plugin.plugin_name)
            {
                Some(existing) => {
                    existing.enabled = plugin.enabled;
                    existing.config = plugin.config;
                }
                None => config.enabled_plugins.push(plugin),
            }
        })?;
        tracing::info!(plugin = %name, "Plugin configuration saved");
        Ok(())
    }

    /// Remove a plugin by name; returns whether it was present
    pub fn remove_plugin(&self, plugin_name: &str) -> Result<bool, ConfigStoreError> {
        self.mutate(|config| {
            let before = config.enabled_plugins.len();
            config.enabled_plugins.retain(|p| p.plugin_name != plugin_name);
            config.enabled_plugins.len() != before
        })
    }

    pub fn set_instructions(&self, instructions: impl Into<String>) -> Result<(), ConfigStoreError> {
        let instructions = instructions.into();
        self.mutate(|config| config.instructions = instructions)
    }

    /// Write the current configuration to disk
    pub fn save(&self) -> Result<(), ConfigStoreError> {
        let guard = self.config.read();
        self.persist(&guard)
    }

    pub fn create_llm_provider(&self) -> Result<Box<dyn LlmProvider>, ProviderError> {
        let config = self.config.read().llm.clone();
        let name = config.provider_name.clone();
        self.providers.create_llm(&name, config)
    }

    pub fn create_stt_provider(&self) -> Result<Box<dyn SttProvider>, ProviderError> {
        let config = self.config.read().stt.clone();
        let name = config.provider_name.clone();
        self.providers.create_stt(&name, config)
    }

    pub fn create_tts_provider(&self) -> Result<Box<dyn TtsProvider>, ProviderError> {
        let config = self.config.read().tts.clone();
        let name = config.provider_name.clone();
        self.providers.create_tts(&name, config)
    }

    pub fn create_vad_provider(&self) -> Result<Box<dyn VadProvider>, ProviderError> {
        let config = self.config.read().vad.clone();
        let name = config.provider_name.clone();
        self.providers.create_vad(&name, config)
    }

    /// Instantiate every enabled plugin, in configuration order
    ///
    /// Plugins that are unknown or fail to construct are skipped with a warning.
    pub fn active_plugins(&self) -> Vec<(String, Arc<dyn AgentPlugin>)> {
        let configured = self.config.read().enabled_plugins.clone();

        configured
            .into_iter()
            .filter(|p| p.enabled)
            .filter_map(|p| match self.plugins.create(&p.plugin_name, &p.config) {
                Ok(plugin) => Some((p.plugin_name, Arc::from(plugin))),
                Err(e) => {
                    tracing::warn!(plugin = %p.plugin_name, error = %e, "Plugin unavailable, skipping");
                    None
                }
            })
            .collect()
    }

    pub fn list_available_providers(&self) -> BTreeMap<ProviderKind, Vec<String>> {
        self.providers.list_available()
    }

    pub fn list_available_plugins(&self) -> Vec<String> {
        self.plugins.list_available()
    }

    /// Write [`DynamicAgentConfig::template`] to `output`
    pub fn create_config_template(output: &Path) -> Result<(), ConfigStoreError> {
        write_json_atomic(output, &DynamicAgentConfig::template()).map_err(|source| {
            ConfigStoreError::Write {
                path: output.to_path_buf(),
                source,
            }
        })
    }
}
