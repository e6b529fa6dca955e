//! Provider and plugin registration
//!
//! Pipeline providers (LLM, STT, TTS, VAD) and message plugins are looked up
//! by name at runtime. Built-in entries are submitted at compile time with
//! `inventory`; embedders can register more on an owned registry.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                    Registration                             │
//! │  inventory::submit! ──▶ with_builtins() ──▶ DashMap registry │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Registering a provider
//!
//! ```ignore
//! use waav_agent::plugin::prelude::*;
//!
//! fn create_my_llm(config: ProviderConfig) -> Result<Box<dyn LlmProvider>, ProviderError> {
//!     Ok(Box::new(MyLlm::new(config)?))
//! }
//!
//! inventory::submit! {
//!     ProviderConstructor::llm("my-llm", my_llm_metadata, create_my_llm)
//! }
//! ```
//!
//! # Using the registry
//!
//! ```ignore
//! let registry = ProviderRegistry::with_builtins();
//! let tts = registry.create_tts("openai", config)?;
//! ```
//!
//! There is no process-wide registry: the runtime owns one instance and
//! shares it through `Arc`.

pub mod builtin;
pub mod isolation;
pub mod metadata;
pub mod registry;

pub use isolation::{call_isolated, call_isolated_async};
pub use metadata::{PluginMetadata, ProviderMetadata};
pub use registry::{
    AnyProvider, PluginConstructor, PluginRegistry, ProviderConstructor, ProviderHealth,
    ProviderRegistry,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use super::metadata::{PluginMetadata, ProviderMetadata};
    pub use super::registry::{
        LlmFactoryFn, PluginConstructor, PluginFactoryFn, PluginRegistry, ProviderConstructor,
        ProviderRegistry, SttFactoryFn, TtsFactoryFn, VadFactoryFn,
    };

    pub use async_trait::async_trait;
    pub use inventory;
    pub use serde_json::Value;
    pub use std::sync::Arc;

    pub use crate::agent::{AgentPlugin, PluginContext, PluginOptions};
    pub use crate::config::ProviderConfig;
    pub use crate::core::{LlmProvider, ModelInfo, SttProvider, TtsProvider, VadProvider};
    pub use crate::errors::{PluginError, ProviderError};
}
