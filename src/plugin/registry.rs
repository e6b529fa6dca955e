//! Provider and plugin registries
//!
//! Both registries map a lowercase name to a constructor. Built-in entries
//! are submitted at compile time with `inventory` and collected by
//! [`ProviderRegistry::with_builtins`] / [`PluginRegistry::with_builtins`];
//! anything else can be registered at runtime, replacing a binding of the same
//! name.
//!
//! Every `create_*` call constructs a fresh instance. Callers that want to
//! share an instance hold on to it themselves.
//!
//! # Usage
//!
//! ```ignore
//! use waav_agent::plugin::ProviderRegistry;
//!
//! let registry = ProviderRegistry::with_builtins();
//! let llm = registry.create_llm("openai", ProviderConfig::new("openai", "gpt-4o-mini"))?;
//! ```

use dashmap::DashMap;
use serde::Serialize;
use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use super::isolation::call_isolated;
use super::metadata::{PluginMetadata, ProviderMetadata};
use crate::agent::{AgentPlugin, PluginOptions};
use crate::config::ProviderConfig;
use crate::core::{LlmProvider, ProviderKind, SttProvider, TtsProvider, VadProvider};
use crate::errors::{PluginError, ProviderError, UnsupportedPluginError, UnsupportedProviderError};

/// Factory function type for LLM providers
pub type LlmFactoryFn =
    Arc<dyn Fn(ProviderConfig) -> Result<Box<dyn LlmProvider>, ProviderError> + Send + Sync>;

/// Factory function type for STT providers
pub type SttFactoryFn =
    Arc<dyn Fn(ProviderConfig) -> Result<Box<dyn SttProvider>, ProviderError> + Send + Sync>;

/// Factory function type for TTS providers
pub type TtsFactoryFn =
    Arc<dyn Fn(ProviderConfig) -> Result<Box<dyn TtsProvider>, ProviderError> + Send + Sync>;

/// Factory function type for VAD providers
pub type VadFactoryFn =
    Arc<dyn Fn(ProviderConfig) -> Result<Box<dyn VadProvider>, ProviderError> + Send + Sync>;

/// Factory function type for message plugins
pub type PluginFactoryFn =
    Arc<dyn Fn(&PluginOptions) -> Result<Box<dyn AgentPlugin>, PluginError> + Send + Sync>;

/// Factory function pointer for a compile-time provider registration
#[derive(Clone, Copy)]
pub enum ProviderFactoryPtr {
    Llm(fn(ProviderConfig) -> Result<Box<dyn LlmProvider>, ProviderError>),
    Stt(fn(ProviderConfig) -> Result<Box<dyn SttProvider>, ProviderError>),
    Tts(fn(ProviderConfig) -> Result<Box<dyn TtsProvider>, ProviderError>),
    Vad(fn(ProviderConfig) -> Result<Box<dyn VadProvider>, ProviderError>),
}

/// Provider constructor for inventory-based registration
///
/// Uses function pointers so it can be built in a `const` context, which
/// `inventory::submit!` requires.
pub struct ProviderConstructor {
    /// Provider ID for lookup
    pub provider_id: &'static str,

    /// Deferred metadata creation
    pub metadata_fn: fn() -> ProviderMetadata,

    /// Factory for the provider's kind
    pub factory: ProviderFactoryPtr,

    /// Aliases for this provider
    pub aliases: &'static [&'static str],
}

impl ProviderConstructor {
    pub const fn llm(
        provider_id: &'static str,
        metadata_fn: fn() -> ProviderMetadata,
        factory: fn(ProviderConfig) -> Result<Box<dyn LlmProvider>, ProviderError>,
    ) -> Self {
        Self {
            provider_id,
            metadata_fn,
            factory: ProviderFactoryPtr::Llm(factory),
            aliases: &[],
        }
    }

    pub const fn stt(
        provider_id: &'static str,
        metadata_fn: fn() -> ProviderMetadata,
        factory: fn(ProviderConfig) -> Result<Box<dyn SttProvider>, ProviderError>,
    ) -> Self {
        Self {
            provider_id,
            metadata_fn,
            factory: ProviderFactoryPtr::Stt(factory),
            aliases: &[],
        }
    }

    pub const fn tts(
        provider_id: &'static str,
        metadata_fn: fn() -> ProviderMetadata,
        factory: fn(ProviderConfig) -> Result<Box<dyn TtsProvider>, ProviderError>,
    ) -> Self {
        Self {
            provider_id,
            metadata_fn,
            factory: ProviderFactoryPtr::Tts(factory),
            aliases: &[],
        }
    }

    pub const fn vad(
        provider_id: &'static str,
        metadata_fn: fn() -> ProviderMetadata,
        factory: fn(ProviderConfig) -> Result<Box<dyn VadProvider>, ProviderError>,
    ) -> Self {
        Self {
            provider_id,
            metadata_fn,
            factory: ProviderFactoryPtr::Vad(factory),
            aliases: &[],
        }
    }

    /// Add aliases for this provider
    pub const fn with_aliases(mut self, aliases: &'static [&'static str]) -> Self {
        self.aliases = aliases;
        self
    }

    /// Get the metadata (calls the deferred function)
    pub fn metadata(&self) -> ProviderMetadata {
        let mut metadata = (self.metadata_fn)();
        for alias in self.aliases {
            if !metadata.aliases.iter().any(|a| a == alias) {
                metadata.aliases.push(alias.to_string());
            }
        }
        metadata
    }
}

/// Plugin constructor for inventory-based registration
pub struct PluginConstructor {
    pub plugin_id: &'static str,
    pub metadata_fn: fn() -> PluginMetadata,
    pub factory: fn(&PluginOptions) -> Result<Box<dyn AgentPlugin>, PluginError>,
}

impl PluginConstructor {
    pub const fn new(
        plugin_id: &'static str,
        metadata_fn: fn() -> PluginMetadata,
        factory: fn(&PluginOptions) -> Result<Box<dyn AgentPlugin>, PluginError>,
    ) -> Self {
        Self {
            plugin_id,
            metadata_fn,
            factory,
        }
    }
}

// Collect all compiled-in registrations at link time
inventory::collect!(ProviderConstructor);
inventory::collect!(PluginConstructor);

/// A provider instance of any kind
pub enum AnyProvider {
    Llm(Box<dyn LlmProvider>),
    Stt(Box<dyn SttProvider>),
    Tts(Box<dyn TtsProvider>),
    Vad(Box<dyn VadProvider>),
}

impl AnyProvider {
    pub fn kind(&self) -> ProviderKind {
        match self {
            AnyProvider::Llm(_) => ProviderKind::Llm,
            AnyProvider::Stt(_) => ProviderKind::Stt,
            AnyProvider::Tts(_) => ProviderKind::Tts,
            AnyProvider::Vad(_) => ProviderKind::Vad,
        }
    }
}

/// Construction counters for one provider, for health reporting
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProviderHealth {
    /// Number of construction attempts
    pub call_count: u64,
    /// Number of failed constructions
    pub error_count: u64,
    /// Last construction error (if any)
    pub last_error: Option<String>,
}

impl ProviderHealth {
    fn record<T, E: std::fmt::Display>(&mut self, result: &Result<T, E>) {
        self.call_count += 1;
        if let Err(e) = result {
            self.error_count += 1;
            self.last_error = Some(e.to_string());
        }
    }
}

struct Binding<F> {
    factory: F,
    metadata: ProviderMetadata,
    /// Primary id when this binding was registered under an alias
    alias_of: Option<String>,
}

/// Provider registry for the four pipeline stages
pub struct ProviderRegistry {
    llm: DashMap<String, Binding<LlmFactoryFn>>,
    stt: DashMap<String, Binding<SttFactoryFn>>,
    tts: DashMap<String, Binding<TtsFactoryFn>>,
    vad: DashMap<String, Binding<VadFactoryFn>>,
    health: DashMap<(ProviderKind, String), ProviderHealth>,
}

impl ProviderRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            llm: DashMap::new(),
            stt: DashMap::new(),
            tts: DashMap::new(),
            vad: DashMap::new(),
            health: DashMap::new(),
        }
    }

    /// Create a registry populated with every provider submitted via `inventory`
    pub fn with_builtins() -> Self {
        let registry = Self::new();

        for constructor in inventory::iter::<ProviderConstructor> {
            let metadata = constructor.metadata();
            match constructor.factory {
                ProviderFactoryPtr::Llm(f) => {
                    registry.register_llm(constructor.provider_id, Arc::new(f), metadata)
                }
                ProviderFactoryPtr::Stt(f) => {
                    registry.register_stt(constructor.provider_id, Arc::new(f), metadata)
                }
                ProviderFactoryPtr::Tts(f) => {
                    registry.register_tts(constructor.provider_id, Arc::new(f), metadata)
                }
                ProviderFactoryPtr::Vad(f) => {
                    registry.register_vad(constructor.provider_id, Arc::new(f), metadata)
                }
            }
        }

        tracing::info!(
            llm_count = registry.provider_names(ProviderKind::Llm).len(),
            stt_count = registry.provider_names(ProviderKind::Stt).len(),
            tts_count = registry.provider_names(ProviderKind::Tts).len(),
            vad_count = registry.provider_names(ProviderKind::Vad).len(),
            "Provider registry initialized"
        );

        registry
    }

    fn bind<F: Clone>(
        table: &DashMap<String, Binding<F>>,
        kind: ProviderKind,
        provider_id: &str,
        factory: F,
        metadata: ProviderMetadata,
    ) {
        let id = provider_id.to_lowercase();

        for alias in &metadata.aliases {
            table.insert(
                alias.to_lowercase(),
                Binding {
                    factory: factory.clone(),
                    metadata: metadata.clone(),
                    alias_of: Some(id.clone()),
                },
            );
        }

        tracing::debug!(
            kind = %kind,
            provider_id = %provider_id,
            aliases = ?metadata.aliases,
            "Registered provider"
        );

        table.insert(
            id,
            Binding {
                factory,
                metadata,
                alias_of: None,
            },
        );
    }

    /// Register (or replace) an LLM provider factory
    pub fn register_llm(&self, provider_id: &str, factory: LlmFactoryFn, metadata: ProviderMetadata) {
        Self::bind(&self.llm, ProviderKind::Llm, provider_id, factory, metadata);
    }

    /// Register (or replace) an STT provider factory
    pub fn register_stt(&self, provider_id: &str, factory: SttFactoryFn, metadata: ProviderMetadata) {
        Self::bind(&self.stt, ProviderKind::Stt, provider_id, factory, metadata);
    }

    /// Register (or replace) a TTS provider factory
    pub fn register_tts(&self, provider_id: &str, factory: TtsFactoryFn, metadata: ProviderMetadata) {
        Self::bind(&self.tts, ProviderKind::Tts, provider_id, factory, metadata);
    }

    /// Register (or replace) a VAD provider factory
    pub fn register_vad(&self, provider_id: &str, factory: VadFactoryFn, metadata: ProviderMetadata) {
        Self::bind(&self.vad, ProviderKind::Vad, provider_id, factory, metadata);
    }

    fn build<F: Clone, T>(
        &self,
        table: &DashMap<String, Binding<F>>,
        kind: ProviderKind,
        provider: &str,
        call: impl FnOnce(&F) -> Result<T, ProviderError>,
    ) -> Result<T, ProviderError> {
        let id = provider.to_lowercase();

        let (factory, primary) = {
            let binding = table.get(&id).ok_or_else(|| UnsupportedProviderError {
                kind,
                name: provider.to_string(),
                available: Self::names_of(table),
            })?;
            (
                binding.factory.clone(),
                binding.alias_of.clone().unwrap_or_else(|| id.clone()),
            )
        };
        // Lock released before calling the factory

        let result = call_isolated(AssertUnwindSafe(|| call(&factory)), ProviderError::Panicked);

        self.health
            .entry((kind, primary))
            .or_default()
            .record(&result);

        result
    }

    /// Create an LLM provider by name
    pub fn create_llm(
        &self,
        provider: &str,
        config: ProviderConfig,
    ) -> Result<Box<dyn LlmProvider>, ProviderError> {
        self.build(&self.llm, ProviderKind::Llm, provider, |f| f(config))
    }

    /// Create an STT provider by name
    pub fn create_stt(
        &self,
        provider: &str,
        config: ProviderConfig,
    ) -> Result<Box<dyn SttProvider>, ProviderError> {
        self.build(&self.stt, ProviderKind::Stt, provider, |f| f(config))
    }

    /// Create a TTS provider by name
    pub fn create_tts(
        &self,
        provider: &str,
        config: ProviderConfig,
    ) -> Result<Box<dyn TtsProvider>, ProviderError> {
        self.build(&self.tts, ProviderKind::Tts, provider, |f| f(config))
    }

    /// Create a VAD provider by name
    pub fn create_vad(
        &self,
        provider: &str,
        config: ProviderConfig,
    ) -> Result<Box<dyn VadProvider>, ProviderError> {
        self.build(&self.vad, ProviderKind::Vad, provider, |f| f(config))
    }

    /// Create a provider of any kind by name
    pub fn create(
        &self,
        kind: ProviderKind,
        provider: &str,
        config: ProviderConfig,
    ) -> Result<AnyProvider, ProviderError> {
        Ok(match kind {
            ProviderKind::Llm => AnyProvider::Llm(self.create_llm(provider, config)?),
            ProviderKind::Stt => AnyProvider::Stt(self.create_stt(provider, config)?),
            ProviderKind::Tts => AnyProvider::Tts(self.create_tts(provider, config)?),
            ProviderKind::Vad => AnyProvider::Vad(self.create_vad(provider, config)?),
        })
    }

    fn names_of<F>(table: &DashMap<String, Binding<F>>) -> Vec<String> {
        let mut names: Vec<String> = table
            .iter()
            .filter(|entry| entry.alias_of.is_none())
            .map(|entry| entry.key().clone())
            .collect();
        names.sort();
        names
    }

    fn metadata_of<F>(table: &DashMap<String, Binding<F>>, provider: &str) -> Option<ProviderMetadata> {
        table
            .get(&provider.to_lowercase())
            .map(|entry| entry.metadata.clone())
    }

    /// Registered provider names for a kind (excluding aliases), sorted
    pub fn provider_names(&self, kind: ProviderKind) -> Vec<String> {
        match kind {
            ProviderKind::Llm => Self::names_of(&self.llm),
            ProviderKind::Stt => Self::names_of(&self.stt),
            ProviderKind::Tts => Self::names_of(&self.tts),
            ProviderKind::Vad => Self::names_of(&self.vad),
        }
    }

    /// Registered provider names for every kind
    pub fn list_available(&self) -> BTreeMap<ProviderKind, Vec<String>> {
        ProviderKind::ALL
            .into_iter()
            .map(|kind| (kind, self.provider_names(kind)))
            .collect()
    }

    /// Check if a provider (or alias) is registered for a kind
    pub fn has_provider(&self, kind: ProviderKind, provider: &str) -> bool {
        let id = provider.to_lowercase();
        match kind {
            ProviderKind::Llm => self.llm.contains_key(&id),
            ProviderKind::Stt => self.stt.contains_key(&id),
            ProviderKind::Tts => self.tts.contains_key(&id),
            ProviderKind::Vad => self.vad.contains_key(&id),
        }
    }

    /// Get provider metadata by name or alias
    pub fn metadata(&self, kind: ProviderKind, provider: &str) -> Option<ProviderMetadata> {
        match kind {
            ProviderKind::Llm => Self::metadata_of(&self.llm, provider),
            ProviderKind::Stt => Self::metadata_of(&self.stt, provider),
            ProviderKind::Tts => Self::metadata_of(&self.tts, provider),
            ProviderKind::Vad => Self::metadata_of(&self.vad, provider),
        }
    }

    /// Construction counters for a provider
    pub fn health(&self, kind: ProviderKind, provider: &str) -> Option<ProviderHealth> {
        self.health
            .get(&(kind, provider.to_lowercase()))
            .map(|entry| entry.clone())
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Registry of message-processing plugins
pub struct PluginRegistry {
    plugins: DashMap<String, (PluginFactoryFn, PluginMetadata)>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self {
            plugins: DashMap::new(),
        }
    }

    /// Create a registry populated with every plugin submitted via `inventory`
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        for constructor in inventory::iter::<PluginConstructor> {
            registry.register(
                constructor.plugin_id,
                Arc::new(constructor.factory),
                (constructor.metadata_fn)(),
            );
        }
        tracing::info!(
            plugin_count = registry.plugins.len(),
            "Plugin registry initialized"
        );
        registry
    }

    /// Register (or replace) a plugin factory
    pub fn register(&self, plugin_id: &str, factory: PluginFactoryFn, metadata: PluginMetadata) {
        self.plugins
            .insert(plugin_id.to_lowercase(), (factory, metadata));
        tracing::debug!(plugin_id = %plugin_id, "Registered plugin");
    }

    /// Create a plugin by name
    pub fn create(
        &self,
        plugin: &str,
        options: &PluginOptions,
    ) -> Result<Box<dyn AgentPlugin>, PluginError> {
        let factory = self
            .plugins
            .get(&plugin.to_lowercase())
            .map(|entry| entry.0.clone())
            .ok_or_else(|| UnsupportedPluginError {
                name: plugin.to_string(),
                available: self.list_available(),
            })?;

        call_isolated(AssertUnwindSafe(|| factory(options)), PluginError::Panicked)
    }

    /// Check if a plugin is registered
    pub fn has_plugin(&self, plugin: &str) -> bool {
        self.plugins.contains_key(&plugin.to_lowercase())
    }

    /// Registered plugin names, sorted
    pub fn list_available(&self) -> Vec<String> {
        let mut names: Vec<String> = self.plugins.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// Get plugin metadata by name
    pub fn metadata(&self, plugin: &str) -> Option<PluginMetadata> {
        self.plugins
            .get(&plugin.to_lowercase())
            .map(|entry| entry.1.clone())
    }
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::new()
    }
}
