pub mod agent;
pub mod cli;
pub mod config;
pub mod container;
pub mod core;
pub mod entrypoint;
pub mod errors;
pub mod handlers;
pub mod metrics;
pub mod plugin;
pub mod room;
pub mod routes;
pub mod session;
pub mod state;
pub mod utils;

// Re-export commonly used items for convenience
pub use agent::{AgentFactory, AgentPlugin, ModularAgent};
pub use config::{AgentConfiguration, ConfigurationBuilder, ServerConfig};
pub use container::DependencyContainer;
pub use core::*;
pub use entrypoint::entrypoint;
pub use metrics::MetricsCollector;
pub use room::RoomContext;
pub use session::{SessionGuard, SessionManager};
pub use state::{AgentRuntime, AppState};
