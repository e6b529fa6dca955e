//! Per-room entrypoint
//!
//! Runs once for every room join:
//!
//! 1. connect to the room (audio only)
//! 2. resolve the agent configuration from the persisted config and the
//!    environment
//! 3. build the agent and the session
//! 4. record `connection_success`, then hand the session to the room
//! 5. clean the session up, whatever happened
//!
//! Dependencies are looked up by name in the [`DependencyContainer`] so the
//! entrypoint has no globals of its own.

use std::sync::Arc;

use crate::agent::AgentFactory;
use crate::config::DynamicAgentConfig;
use crate::container::DependencyContainer;
use crate::errors::EntrypointError;
use crate::metrics::{MetricData, MetricsCollector, names};
use crate::room::RoomContext;
use crate::session::SessionManager;

/// Container names the entrypoint resolves
pub mod deps {
    pub const SESSION_MANAGER: &str = "session_manager";
    pub const AGENT_FACTORY: &str = "agent_factory";
    pub const CONFIG_STORE: &str = "config_store";
    pub const AGENT_CONFIG: &str = "agent_config";
    pub const METRICS: &str = "metrics";
}

/// Run one room join to completion; returns the session id
pub async fn entrypoint(
    container: &DependencyContainer,
    room: Arc<dyn RoomContext>,
) -> Result<String, EntrypointError> {
    let metrics = container.get_optional::<MetricsCollector>(deps::METRICS);

    let result = run(container, room.as_ref(), metrics.as_deref()).await;
    if let Err(e) = &result {
        tracing::error!(room = %room.room_name(), error = %e, "Entrypoint failed");
    }
    result
}

async fn run(
    container: &DependencyContainer,
    room: &dyn RoomContext,
    metrics: Option<&MetricsCollector>,
) -> Result<String, EntrypointError> {
    if let Err(e) = room.connect().await {
        if let Some(metrics) = metrics {
            metrics.record(
                MetricData::count(names::CONNECTION_ERROR).with_metadata("room", room.room_name()),
            );
        }
        return Err(e.into());
    }
    tracing::info!(room = %room.room_name(), "Connected to room");

    let session_manager = container.get::<SessionManager>(deps::SESSION_MANAGER)?;
    let agent_factory = container.get::<AgentFactory>(deps::AGENT_FACTORY)?;
    let agent_config = container.get_optional::<DynamicAgentConfig>(deps::AGENT_CONFIG);

    let config = AgentFactory::configuration_from_builder(agent_config.as_deref())?;
    let agent = agent_factory.create_agent(&config)?;

    let (session, session_id) = session_manager.create_session(room.room_name(), &config, None)?;
    let _guard = session_manager.guard(&session_id);

    session_manager
        .metrics()
        .record_session(&session_id, names::CONNECTION_SUCCESS, 1.0, "count");

    if let Err(e) = session_manager.start_session(&session, agent, room).await {
        session_manager
            .metrics()
            .record_session(&session_id, names::CONNECTION_ERROR, 1.0, "count");
        return Err(e.into());
    }

    tracing::info!(session_id = %session_id, "Entrypoint finished");
    Ok(session_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{DependencyError, RoomError};

    struct UnreachableRoom;

    #[async_trait::async_trait]
    impl RoomContext for UnreachableRoom {
        fn room_name(&self) -> &str {
            "offline"
        }

        async fn connect(&self) -> Result<(), RoomError> {
            Err(RoomError::Connection("no route to host".to_string()))
        }

        async fn start(
            &self,
            _session: Arc<crate::session::AgentSession>,
            _agent: Arc<crate::agent::ModularAgent>,
        ) -> Result<(), RoomError> {
            unreachable!("start after failed connect")
        }
    }

    struct IdleRoom;

    #[async_trait::async_trait]
    impl RoomContext for IdleRoom {
        fn room_name(&self) -> &str {
            "idle"
        }

        async fn connect(&self) -> Result<(), RoomError> {
            Ok(())
        }

        async fn start(
            &self,
            _session: Arc<crate::session::AgentSession>,
            _agent: Arc<crate::agent::ModularAgent>,
        ) -> Result<(), RoomError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_connect_failure_is_recorded() {
        let container = DependencyContainer::new();
        let metrics = Arc::new(MetricsCollector::new(10));
        container.register_singleton(deps::METRICS, metrics.clone());

        let err = entrypoint(&container, Arc::new(UnreachableRoom)).await.unwrap_err();
        assert!(matches!(err, EntrypointError::Room(RoomError::Connection(_))));

        let errors = metrics.query(Some(names::CONNECTION_ERROR), None, None);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].metadata["room"], "offline");
    }

    #[tokio::test]
    async fn test_missing_dependencies_fail_after_connect() {
        let container = DependencyContainer::new();
        let err = entrypoint(&container, Arc::new(IdleRoom)).await.unwrap_err();
        assert!(matches!(
            err,
            EntrypointError::Dependency(DependencyError::NotFound(ref name)) if name == deps::SESSION_MANAGER
        ));
    }
}
