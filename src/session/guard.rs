use std::sync::Arc;

use super::SessionManager;

/// Cleans a session up when dropped
///
/// Covers every exit path of the entrypoint, including early returns and
/// task cancellation.
pub struct SessionGuard {
    manager: Arc<SessionManager>,
    session_id: String,
}

impl SessionGuard {
    pub fn new(manager: Arc<SessionManager>, session_id: impl Into<String>) -> Self {
        Self {
            manager,
            session_id: session_id.into(),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        tracing::debug!(session_id = %self.session_id, "Session guard released");
        self.manager.cleanup_session(&self.session_id);
    }
}
