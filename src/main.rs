use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, anyhow};
use axum::http::{Method, header::CONTENT_TYPE};
use clap::Parser;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::EnvFilter;

use waav_agent::cli::{Cli, Commands, run_command};
use waav_agent::config::ConfigStore;
use waav_agent::plugin::{PluginRegistry, ProviderRegistry};
use waav_agent::{ServerConfig, routes, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if it exists (must be done before config loading)
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    // Load configuration from file or environment
    let mut config = if let Some(config_path) = &cli.config {
        println!("Loading configuration from {}", config_path.display());
        ServerConfig::from_file(config_path).map_err(|e| anyhow!(e.to_string()))?
    } else {
        ServerConfig::from_env().map_err(|e| anyhow!(e.to_string()))?
    };
    if let Some(agent_config) = cli.agent_config {
        config.agent_config_path = agent_config;
    }

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(config).await,
        command => {
            let store = ConfigStore::load(
                &config.agent_config_path,
                Arc::new(ProviderRegistry::with_builtins()),
                Arc::new(PluginRegistry::with_builtins()),
            )
            .context("Failed to load agent configuration")?;

            let stdin = io::stdin();
            let mut input = stdin.lock();
            let mut out = io::stdout();
            run_command(command, &store, &mut input, &mut out)
        }
    }
}

async fn serve(config: ServerConfig) -> anyhow::Result<()> {
    let address = config.address();
    if config.livekit_credentials().is_none() {
        tracing::warn!("LiveKit credentials not set, /token will return 500");
    }
    println!("Starting server on {address}");

    let app_state = AppState::new(config).context("Failed to initialize agent runtime")?;

    let cors_layer = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE]);

    let app = routes::create_app(app_state).layer(cors_layer);

    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {address}"))?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
