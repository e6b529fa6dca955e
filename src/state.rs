use std::sync::Arc;

use crate::agent::AgentFactory;
use crate::config::{ConfigStore, ServerConfig};
use crate::container::DependencyContainer;
use crate::entrypoint::{self, deps};
use crate::errors::{ConfigStoreError, EntrypointError};
use crate::metrics::MetricsCollector;
use crate::plugin::{PluginRegistry, ProviderRegistry};
use crate::room::RoomContext;
use crate::session::SessionManager;

/// Everything a room join needs, built once per process
///
/// The components are also registered in the [`DependencyContainer`] under
/// the names in [`deps`], which is how [`entrypoint::entrypoint`] finds them.
pub struct AgentRuntime {
    container: DependencyContainer,
    providers: Arc<ProviderRegistry>,
    plugins: Arc<PluginRegistry>,
    metrics: Arc<MetricsCollector>,
    store: Arc<ConfigStore>,
    sessions: Arc<SessionManager>,
    agents: Arc<AgentFactory>,
}

impl AgentRuntime {
    pub fn new(config: &ServerConfig) -> Result<Self, ConfigStoreError> {
        let providers = Arc::new(ProviderRegistry::with_builtins());
        let plugins = Arc::new(PluginRegistry::with_builtins());

        let mut collector = MetricsCollector::new(config.metrics_max_history);
        if let Some(path) = &config.metrics_file {
            collector = collector.with_snapshot_file(path);
        }
        let metrics = Arc::new(collector);

        let store = Arc::new(ConfigStore::load(
            &config.agent_config_path,
            providers.clone(),
            plugins.clone(),
        )?);
        let sessions = Arc::new(SessionManager::new(store.clone(), metrics.clone()));
        let agents = Arc::new(AgentFactory::new(store.clone(), metrics.clone()));

        let container = DependencyContainer::new();
        container.register_singleton(deps::SESSION_MANAGER, sessions.clone());
        container.register_singleton(deps::AGENT_FACTORY, agents.clone());
        container.register_singleton(deps::CONFIG_STORE, store.clone());
        container.register_singleton(deps::METRICS, metrics.clone());
        // Re-read on every lookup so CLI edits apply to the next room join
        let current = store.clone();
        container.register_factory(deps::AGENT_CONFIG, move || Arc::new(current.config()));

        tracing::info!(
            agent_config = %config.agent_config_path.display(),
            metrics_file = ?config.metrics_file,
            "Agent runtime initialized"
        );

        Ok(Self {
            container,
            providers,
            plugins,
            metrics,
            store,
            sessions,
            agents,
        })
    }

    pub fn container(&self) -> &DependencyContainer {
        &self.container
    }

    pub fn providers(&self) -> &Arc<ProviderRegistry> {
        &self.providers
    }

    pub fn plugins(&self) -> &Arc<PluginRegistry> {
        &self.plugins
    }

    pub fn metrics(&self) -> &Arc<MetricsCollector> {
        &self.metrics
    }

    pub fn store(&self) -> &Arc<ConfigStore> {
        &self.store
    }

    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    pub fn agents(&self) -> &Arc<AgentFactory> {
        &self.agents
    }

    /// Run one room join; see [`entrypoint::entrypoint`]
    pub async fn entrypoint(&self, room: Arc<dyn RoomContext>) -> Result<String, EntrypointError> {
        entrypoint::entrypoint(&self.container, room).await
    }
}

/// Shared state for the HTTP handlers
pub struct AppState {
    pub config: ServerConfig,
    pub runtime: Arc<AgentRuntime>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Result<Arc<Self>, ConfigStoreError> {
        let runtime = Arc::new(AgentRuntime::new(&config)?);
        Ok(Self::with_runtime(config, runtime))
    }

    pub fn with_runtime(config: ServerConfig, runtime: Arc<AgentRuntime>) -> Arc<Self> {
        Arc::new(Self { config, runtime })
    }
}
