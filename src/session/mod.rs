//! Session lifecycle
//!
//! [`SessionManager`] builds the provider set for a room, registers the
//! session, starts metrics tracking and releases everything on cleanup. It is
//! the only writer of the active-session table.
//!
//! ```text
//! Created ──start_session──▶ Started ──room returns──▶ Ended(Normal | Error)
//!    │                                                        │
//!    └───────────────────── cleanup_session ◀─────────────────┘
//! ```
//!
//! Provider sets come from the persisted, name-driven configuration. When
//! that fails (unknown provider name, bad parameters) the manager falls back
//! to the built-in providers configured from the flat [`AgentConfiguration`].

mod guard;

pub use guard::SessionGuard;

use chrono::{DateTime, Local, Utc};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use crate::agent::ModularAgent;
use crate::config::{AgentConfiguration, ConfigStore, ProviderConfig};
use crate::core::vad::SILERO_MODEL;
use crate::core::{LlmProvider, SttProvider, TtsProvider, VadProvider};
use crate::errors::{ProviderError, SessionCreationError, SessionStartError};
use crate::metrics::{MetricsCollector, PerformanceMetrics};
use crate::room::RoomContext;

const FALLBACK_PROVIDER: &str = "openai";
const FALLBACK_VAD: &str = "silero";

/// How a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    Normal,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Created,
    Started,
    Ended(EndReason),
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Created => f.write_str("created"),
            SessionState::Started => f.write_str("started"),
            SessionState::Ended(EndReason::Normal) => f.write_str("ended"),
            SessionState::Ended(EndReason::Error) => f.write_str("ended with error"),
        }
    }
}

/// Where a session's providers came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderSource {
    /// Persisted name-driven configuration
    Dynamic,
    /// Built-in providers configured from the flat agent configuration
    Fallback,
}

/// The four pipeline providers owned by one session
pub struct ProviderSet {
    pub vad: Arc<dyn VadProvider>,
    pub stt: Arc<dyn SttProvider>,
    pub llm: Arc<dyn LlmProvider>,
    pub tts: Arc<dyn TtsProvider>,
    pub source: ProviderSource,
}

/// A registered session for one room join
pub struct AgentSession {
    id: String,
    room_name: String,
    providers: ProviderSet,
    config: AgentConfiguration,
    created_at: DateTime<Utc>,
    state: Mutex<SessionState>,
}

impl AgentSession {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn room_name(&self) -> &str {
        &self.room_name
    }

    pub fn providers(&self) -> &ProviderSet {
        &self.providers
    }

    pub fn config(&self) -> &AgentConfiguration {
        &self.config
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn state(&self) -> SessionState {
        *self.state.lock()
    }

    // Move `from` → `to`; on mismatch return the actual state
    fn transition(&self, from: SessionState, to: SessionState) -> Result<(), SessionState> {
        let mut state = self.state.lock();
        if *state != from {
            return Err(*state);
        }
        *state = to;
        Ok(())
    }

    // Mark ended unless it already is
    fn finish(&self) {
        let mut state = self.state.lock();
        *state = match *state {
            SessionState::Created => SessionState::Ended(EndReason::Normal),
            // Still running at cleanup: interrupted
            SessionState::Started => SessionState::Ended(EndReason::Error),
            ended => ended,
        };
    }
}

impl fmt::Debug for AgentSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentSession")
            .field("id", &self.id)
            .field("room_name", &self.room_name)
            .field("source", &self.providers.source)
            .field("state", &self.state())
            .finish()
    }
}

#[derive(Default)]
struct SessionTable {
    active: HashMap<String, Arc<AgentSession>>,
    /// Every id handed out by this manager, live or cleaned up
    issued: HashSet<String>,
}

/// Owns the active-session table
pub struct SessionManager {
    store: Arc<ConfigStore>,
    metrics: Arc<MetricsCollector>,
    sessions: Mutex<SessionTable>,
}

impl SessionManager {
    pub fn new(store: Arc<ConfigStore>, metrics: Arc<MetricsCollector>) -> Self {
        Self {
            store,
            metrics,
            sessions: Mutex::new(SessionTable::default()),
        }
    }

    pub fn metrics(&self) -> &Arc<MetricsCollector> {
        &self.metrics
    }

    /// Build providers, register the session and start its metrics tracking
    ///
    /// Without `session_id` the id is `{room}_{YYYYmmdd_HHMMSS}`, suffixed
    /// with `_2`, `_3`, ... while it collides with any id this manager has
    /// issued, so derived ids are never reused even after cleanup. A supplied
    /// id that is already live is an error. Nothing is registered on error.
    pub fn create_session(
        &self,
        room_name: &str,
        config: &AgentConfiguration,
        session_id: Option<String>,
    ) -> Result<(Arc<AgentSession>, String), SessionCreationError> {
        let requested = session_id
            .clone()
            .unwrap_or_else(|| derived_session_id(room_name));

        let providers = self
            .build_providers(config)
            .map_err(|source| SessionCreationError::Providers {
                session_id: requested.clone(),
                source,
            })?;

        let session = {
            let mut table = self.sessions.lock();
            let id = match session_id {
                Some(id) if table.active.contains_key(&id) => {
                    return Err(SessionCreationError::DuplicateId { session_id: id });
                }
                Some(id) => id,
                None => unique_id(&requested, |candidate| table.issued.contains(candidate)),
            };

            let session = Arc::new(AgentSession {
                id: id.clone(),
                room_name: room_name.to_string(),
                providers,
                config: config.clone(),
                created_at: Utc::now(),
                state: Mutex::new(SessionState::Created),
            });
            table.issued.insert(id.clone());
            table.active.insert(id, session.clone());
            session
        };

        self.metrics.start_session_tracking(session.id());
        tracing::info!(
            session_id = %session.id(),
            room = %room_name,
            source = ?session.providers.source,
            "Session created"
        );

        let id = session.id().to_string();
        Ok((session, id))
    }

    fn build_providers(&self, config: &AgentConfiguration) -> Result<ProviderSet, ProviderError> {
        match self.dynamic_providers() {
            Ok(providers) => Ok(providers),
            Err(e) => {
                tracing::warn!(error = %e, "Dynamic providers unavailable, falling back to defaults");
                self.fallback_providers(config)
            }
        }
    }

    fn dynamic_providers(&self) -> Result<ProviderSet, ProviderError> {
        let stored = self.store.config();
        let providers = ProviderSet {
            vad: Arc::from(self.store.create_vad_provider()?),
            stt: Arc::from(self.store.create_stt_provider()?),
            llm: Arc::from(self.store.create_llm_provider()?),
            tts: Arc::from(self.store.create_tts_provider()?),
            source: ProviderSource::Dynamic,
        };
        tracing::info!(
            stt = %format!("{}/{}", stored.stt.provider_name, stored.stt.model),
            llm = %format!("{}/{}", stored.llm.provider_name, stored.llm.model),
            tts = %format!("{}/{}", stored.tts.provider_name, stored.tts.model),
            "Providers created"
        );
        Ok(providers)
    }

    fn fallback_providers(&self, config: &AgentConfiguration) -> Result<ProviderSet, ProviderError> {
        let registry = self.store.providers();
        Ok(ProviderSet {
            vad: Arc::from(
                registry.create_vad(FALLBACK_VAD, ProviderConfig::new(FALLBACK_VAD, SILERO_MODEL))?,
            ),
            stt: Arc::from(registry.create_stt(
                FALLBACK_PROVIDER,
                ProviderConfig::new(FALLBACK_PROVIDER, &config.stt_model),
            )?),
            llm: Arc::from(registry.create_llm(
                FALLBACK_PROVIDER,
                ProviderConfig::new(FALLBACK_PROVIDER, &config.llm_model),
            )?),
            tts: Arc::from(
                registry.create_tts(
                    FALLBACK_PROVIDER,
                    ProviderConfig::new(FALLBACK_PROVIDER, &config.tts_model)
                        .with_voice(Some(config.tts_voice.clone())),
                )?,
            ),
            source: ProviderSource::Fallback,
        })
    }

    /// Hand the session to the room and wait for it to end
    pub async fn start_session(
        &self,
        session: &Arc<AgentSession>,
        agent: Arc<ModularAgent>,
        room: &dyn RoomContext,
    ) -> Result<(), SessionStartError> {
        session
            .transition(SessionState::Created, SessionState::Started)
            .map_err(|state| SessionStartError::InvalidState {
                session_id: session.id().to_string(),
                state: state.to_string(),
            })?;

        tracing::info!(session_id = %session.id(), "Starting session");
        match room.start(session.clone(), agent).await {
            Ok(()) => {
                let _ = session.transition(
                    SessionState::Started,
                    SessionState::Ended(EndReason::Normal),
                );
                tracing::info!(session_id = %session.id(), "Session finished");
                Ok(())
            }
            Err(source) => {
                let _ = session.transition(
                    SessionState::Started,
                    SessionState::Ended(EndReason::Error),
                );
                tracing::error!(session_id = %session.id(), error = %source, "Session failed");
                Err(SessionStartError::Room {
                    session_id: session.id().to_string(),
                    source,
                })
            }
        }
    }

    pub fn get_session(&self, session_id: &str) -> Option<Arc<AgentSession>> {
        self.sessions.lock().active.get(session_id).cloned()
    }

    pub fn get_session_metrics(&self, session_id: &str) -> Option<PerformanceMetrics> {
        self.metrics.session_metrics(session_id)
    }

    /// Release a session; returns whether it was still registered
    ///
    /// Safe to call more than once.
    pub fn cleanup_session(&self, session_id: &str) -> bool {
        let removed = self.sessions.lock().active.remove(session_id);
        self.metrics.end_session_tracking(session_id);

        match removed {
            Some(session) => {
                session.finish();
                tracing::info!(session_id = %session_id, state = %session.state(), "Session cleaned up");
                true
            }
            None => false,
        }
    }

    /// Ids of the registered sessions, sorted
    pub fn active_session_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.sessions.lock().active.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Guard that cleans `session_id` up when dropped
    pub fn guard(self: &Arc<Self>, session_id: impl Into<String>) -> SessionGuard {
        SessionGuard::new(self.clone(), session_id)
    }
}

fn derived_session_id(room_name: &str) -> String {
    format!("{room_name}_{}", Local::now().format("%Y%m%d_%H%M%S"))
}

fn unique_id(base: &str, taken: impl Fn(&str) -> bool) -> String {
    if !taken(base) {
        return base.to_string();
    }
    (2..)
        .map(|n| format!("{base}_{n}"))
        .find(|candidate| !taken(candidate))
        .unwrap_or_else(|| base.to_string())
}
