//! Real-time room collaborator
//!
//! The media transport (joining the room, audio tracks, the STT → LLM → TTS
//! loop) is owned by the real-time framework. The runtime only needs to
//! connect, learn the room's name, and hand over a prepared session and agent.

use async_trait::async_trait;
use std::sync::Arc;

use crate::agent::ModularAgent;
use crate::errors::RoomError;
use crate::session::AgentSession;

/// One room join, as seen by the entrypoint
#[async_trait]
pub trait RoomContext: Send + Sync {
    /// Name of the room being joined
    fn room_name(&self) -> &str;

    /// Connect to the room, subscribing to audio only
    async fn connect(&self) -> Result<(), RoomError>;

    /// Run the session until it ends
    ///
    /// Returns once the participant leaves or the pipeline stops.
    async fn start(
        &self,
        session: Arc<AgentSession>,
        agent: Arc<ModularAgent>,
    ) -> Result<(), RoomError>;
}
