//! Error types for the agent runtime
//!
//! Each stage of the pipeline owns a small error enum. Lifecycle errors
//! (configuration, session creation, session start) propagate up to the
//! entrypoint; plugin and observer failures never leave the chain runner.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::core::ProviderKind;

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Resolved agent configuration failed validation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    /// Instructions are empty or whitespace only
    #[error("Agent instructions must not be empty")]
    EmptyInstructions,

    /// A component model string is empty
    #[error("The {component} model must be set")]
    MissingModel { component: &'static str },

    /// TTS model outside the allow-list
    #[error("Invalid TTS model: {model}. Valid models: {valid:?}")]
    InvalidTtsModel {
        model: String,
        valid: &'static [&'static str],
    },
}

/// Persisted agent configuration could not be read or written
#[derive(Error, Debug)]
pub enum ConfigStoreError {
    #[error("Failed to read configuration file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed configuration file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write configuration file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize configuration: {0}")]
    Serialize(#[from] serde_json::Error),
}

// ─────────────────────────────────────────────────────────────────────────────
// Registries
// ─────────────────────────────────────────────────────────────────────────────

/// No provider registered under the requested name for this kind
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unsupported {kind} provider: '{name}'. Available providers: {available:?}")]
pub struct UnsupportedProviderError {
    pub kind: ProviderKind,
    pub name: String,
    pub available: Vec<String>,
}

/// No plugin registered under the requested name
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unsupported plugin: '{name}'. Available plugins: {available:?}")]
pub struct UnsupportedPluginError {
    pub name: String,
    pub available: Vec<String>,
}

/// Provider construction or provider call failure
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error(transparent)]
    Unsupported(#[from] UnsupportedProviderError),

    #[error("Invalid provider configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Provider request failed: {0}")]
    Request(String),

    #[error("Provider call exceeded {0:?}")]
    Timeout(Duration),

    #[error("Provider panicked: {0}")]
    Panicked(String),
}

/// Plugin construction or message processing failure
#[derive(Error, Debug)]
pub enum PluginError {
    #[error(transparent)]
    Unsupported(#[from] UnsupportedPluginError),

    #[error("Invalid plugin configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Plugin processing failed: {0}")]
    Processing(String),

    #[error("Plugin panicked: {0}")]
    Panicked(String),
}

// ─────────────────────────────────────────────────────────────────────────────
// Container
// ─────────────────────────────────────────────────────────────────────────────

/// Dependency container lookup failure
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DependencyError {
    /// Name absent from every namespace
    #[error("Dependency not found: {0}")]
    NotFound(String),

    /// Name present but bound to a different type
    #[error("Dependency '{name}' is not a {expected}")]
    TypeMismatch { name: String, expected: &'static str },
}

// ─────────────────────────────────────────────────────────────────────────────
// Sessions
// ─────────────────────────────────────────────────────────────────────────────

/// Failure reported by the real-time room collaborator
#[derive(Error, Debug)]
pub enum RoomError {
    #[error("Room connection failed: {0}")]
    Connection(String),

    #[error("Room pipeline failed: {0}")]
    Pipeline(String),
}

/// Session could not be created; nothing was registered
#[derive(Error, Debug)]
pub enum SessionCreationError {
    #[error("Failed to create session {session_id}: {source}")]
    Providers {
        session_id: String,
        #[source]
        source: ProviderError,
    },

    #[error("Failed to create session {session_id}: id already in use")]
    DuplicateId { session_id: String },
}

/// Session could not be started; cleanup is left to the caller
#[derive(Error, Debug)]
pub enum SessionStartError {
    #[error("Failed to start session {session_id}: {source}")]
    Room {
        session_id: String,
        #[source]
        source: RoomError,
    },

    #[error("Failed to start session {session_id}: session is {state}")]
    InvalidState { session_id: String, state: String },
}

/// Agent could not be built from the resolved configuration
#[derive(Error, Debug)]
pub enum AgentCreationError {
    #[error("Failed to create agent: instructions are empty")]
    EmptyInstructions,

    #[error("Failed to create agent: {0}")]
    Provider(#[from] ProviderError),
}

/// Everything that can end an entrypoint run
#[derive(Error, Debug)]
pub enum EntrypointError {
    #[error(transparent)]
    Room(#[from] RoomError),

    #[error(transparent)]
    Dependency(#[from] DependencyError),

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    AgentCreation(#[from] AgentCreationError),

    #[error(transparent)]
    SessionCreation(#[from] SessionCreationError),

    #[error(transparent)]
    SessionStart(#[from] SessionStartError),
}
