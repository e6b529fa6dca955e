use std::sync::Arc;

use super::ModularAgent;
use crate::config::{AgentConfiguration, ConfigStore, ConfigurationBuilder, DynamicAgentConfig};
use crate::errors::{AgentCreationError, ConfigurationError};
use crate::metrics::MetricsCollector;

/// Builds [`ModularAgent`]s from a resolved [`AgentConfiguration`]
///
/// The LLM provider and plugin chain come from the persisted configuration;
/// the resolved configuration decides the instructions and the LLM model.
pub struct AgentFactory {
    store: Arc<ConfigStore>,
    metrics: Arc<MetricsCollector>,
}

impl AgentFactory {
    pub fn new(store: Arc<ConfigStore>, metrics: Arc<MetricsCollector>) -> Self {
        Self { store, metrics }
    }

    /// Build an agent for one session
    pub fn create_agent(
        &self,
        config: &AgentConfiguration,
    ) -> Result<Arc<ModularAgent>, AgentCreationError> {
        if config.instructions.trim().is_empty() {
            return Err(AgentCreationError::EmptyInstructions);
        }

        let stored = self.store.config();
        let mut llm_config = stored.llm.clone();
        llm_config.model = config.llm_model.clone();
        let provider_name = llm_config.provider_name.clone();
        let llm = self.store.providers().create_llm(&provider_name, llm_config)?;

        let agent = ModularAgent::new(
            config.instructions.clone(),
            llm,
            self.metrics.clone(),
            self.store.providers().clone(),
            self.store.plugins().clone(),
        )
        .with_plugins(self.store.active_plugins())
        .with_response_timeout(stored.response_timeout());

        let preview: String = config.instructions.chars().take(100).collect();
        tracing::info!(
            llm_model = %config.llm_model,
            plugins = ?agent.plugin_names(),
            instructions = %preview,
            "Agent created"
        );
        Ok(Arc::new(agent))
    }

    /// Resolve a configuration: persisted values, then environment, then validate
    pub fn configuration_from_builder(
        agent_config: Option<&DynamicAgentConfig>,
    ) -> Result<AgentConfiguration, ConfigurationError> {
        let mut builder = ConfigurationBuilder::new();
        if let Some(agent_config) = agent_config {
            builder = builder.load_from_agent_config(agent_config);
        }
        builder.load_from_environment().build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PluginConfig;
    use crate::plugin::{PluginRegistry, ProviderRegistry};
    use serial_test::serial;
    use std::env;
    use tempfile::TempDir;

    // Everything the builder reads from the environment
    fn cleanup_env_vars() {
        unsafe {
            for key in ["AGENT_INSTRUCTIONS", "STT_MODEL", "LLM_MODEL", "TTS_MODEL", "TTS_VOICE_ID"] {
                env::remove_var(key);
            }
        }
    }

    fn factory(dir: &TempDir, config: DynamicAgentConfig) -> AgentFactory {
        let store = ConfigStore::with_config(
            dir.path().join("agent_config.json"),
            config,
            Arc::new(ProviderRegistry::with_builtins()),
            Arc::new(PluginRegistry::with_builtins()),
        );
        AgentFactory::new(Arc::new(store), Arc::new(MetricsCollector::new(10)))
    }

    #[test]
    fn test_create_agent_uses_resolved_model_and_plugins() {
        let dir = TempDir::new().unwrap();
        let mut stored = DynamicAgentConfig::default();
        stored.enabled_plugins = vec![
            PluginConfig::new("sentiment_analysis"),
            PluginConfig::new("missing_plugin"),
            PluginConfig::new("example"),
        ];
        stored.max_response_time = 12.0;
        let factory = factory(&dir, stored);

        let config = AgentConfiguration {
            llm_model: "gpt-4o".to_string(),
            ..AgentConfiguration::default()
        };
        let agent = factory.create_agent(&config).unwrap();

        assert_eq!(agent.llm_info().model, "gpt-4o");
        assert_eq!(agent.plugin_names(), vec!["sentiment_analysis", "example"]);
        assert_eq!(agent.response_timeout(), Some(std::time::Duration::from_secs(12)));
        assert_eq!(agent.instructions(), config.instructions);
    }

    #[test]
    fn test_blank_instructions_rejected() {
        let dir = TempDir::new().unwrap();
        let factory = factory(&dir, DynamicAgentConfig::default());
        let config = AgentConfiguration {
            instructions: "  ".to_string(),
            ..AgentConfiguration::default()
        };
        assert!(matches!(
            factory.create_agent(&config),
            Err(AgentCreationError::EmptyInstructions)
        ));
    }

    #[test]
    fn test_unknown_llm_provider_is_an_error() {
        let dir = TempDir::new().unwrap();
        let mut stored = DynamicAgentConfig::default();
        stored.llm.provider_name = "anthropic".to_string();
        let factory = factory(&dir, stored);
        assert!(matches!(
            factory.create_agent(&AgentConfiguration::default()),
            Err(AgentCreationError::Provider(_))
        ));
    }

    #[test]
    #[serial]
    fn test_configuration_from_builder_env_overrides_stored() {
        let mut stored = DynamicAgentConfig::default();
        stored.instructions = "Stored instructions".to_string();
        stored.llm.model = "gpt-4o".to_string();

        cleanup_env_vars();
        unsafe {
            env::set_var("LLM_MODEL", "gpt-4-turbo");
        }
        let config = AgentFactory::configuration_from_builder(Some(&stored)).unwrap();
        cleanup_env_vars();

        assert_eq!(config.instructions, "Stored instructions");
        assert_eq!(config.llm_model, "gpt-4-turbo");

        let defaults = AgentFactory::configuration_from_builder(None).unwrap();
        assert_eq!(defaults, AgentConfiguration::default());
    }

    #[test]
    #[serial]
    fn test_configuration_from_builder_rejects_invalid_env() {
        // A stray blank AGENT_INSTRUCTIONS would fail validation first
        cleanup_env_vars();
        unsafe {
            env::set_var("TTS_MODEL", "eleven_turbo_v2");
        }
        let result = AgentFactory::configuration_from_builder(None);
        cleanup_env_vars();

        match result {
            Err(ConfigurationError::InvalidTtsModel { model, .. }) => assert_eq!(model, "eleven_turbo_v2"),
            other => panic!("expected InvalidTtsModel, got {other:?}"),
        }
    }
}
