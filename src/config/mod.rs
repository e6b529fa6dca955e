//! Configuration module for the agent server
//!
//! Three layers live here:
//!
//! - [`ServerConfig`]: process settings (listen address, LiveKit credentials,
//!   file locations) loaded from environment variables or a YAML file.
//!   Priority: YAML > ENV vars > .env values > defaults.
//! - [`ConfigurationBuilder`]: resolves the flat [`AgentConfiguration`] used to
//!   build an agent (defaults, then structured config, then environment, then
//!   explicit overrides).
//! - [`ConfigStore`]: the persisted, mutable [`DynamicAgentConfig`] that picks
//!   providers and plugins by name.
//!
//! # Example
//! ```rust,no_run
//! use waav_agent::config::ServerConfig;
//! use std::path::PathBuf;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load from environment variables only
//! let config = ServerConfig::from_env()?;
//!
//! // Load from YAML file with environment variable overrides
//! let config = ServerConfig::from_file(&PathBuf::from("config.yaml"))?;
//!
//! println!("Server listening on {}", config.address());
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;
use std::str::FromStr;

pub mod builder;
pub mod store;
mod yaml;

pub use builder::{AgentConfiguration, ConfigurationBuilder, DEFAULT_INSTRUCTIONS, VALID_TTS_MODELS};
pub use store::{ConfigStore, DynamicAgentConfig, PluginConfig, ProviderConfig};

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 3001;
const DEFAULT_STATIC_DIR: &str = "client";
const DEFAULT_AGENT_CONFIG_PATH: &str = "agent_config.json";
const DEFAULT_METRICS_FILE: &str = "shared_metrics.json";
const DEFAULT_METRICS_MAX_HISTORY: usize = 1000;

/// Server configuration
///
/// Contains everything needed to run the HTTP surface and the agent runtime:
/// - Server settings (host, port)
/// - LiveKit credentials used to mint room tokens
/// - Static client directory
/// - Agent configuration and shared metrics file locations
#[derive(Debug, Clone)]
pub struct ServerConfig {
    // Server settings
    pub host: String,
    pub port: u16,

    // LiveKit settings
    pub livekit_url: Option<String>,
    pub livekit_api_key: Option<String>,
    pub livekit_api_secret: Option<String>,

    /// Directory served as static files behind the API routes
    pub static_dir: PathBuf,

    /// Persisted dynamic agent configuration (JSON)
    pub agent_config_path: PathBuf,

    /// Shared metrics snapshot (JSON); `None` disables persistence
    pub metrics_file: Option<PathBuf>,

    /// Ring buffer capacity of the metrics collector
    pub metrics_max_history: usize,
}

/// LiveKit credentials, present only when all three settings are configured
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveKitCredentials<'a> {
    pub url: &'a str,
    pub api_key: &'a str,
    pub api_secret: &'a str,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            livekit_url: None,
            livekit_api_key: None,
            livekit_api_secret: None,
            static_dir: PathBuf::from(DEFAULT_STATIC_DIR),
            agent_config_path: PathBuf::from(DEFAULT_AGENT_CONFIG_PATH),
            metrics_file: Some(PathBuf::from(DEFAULT_METRICS_FILE)),
            metrics_max_history: DEFAULT_METRICS_MAX_HISTORY,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// The .env file is loaded in `main.rs` before this runs, so actual
    /// environment variables override .env values.
    ///
    /// # Errors
    /// Returns an error if `PORT` or `METRICS_MAX_HISTORY` is not a valid number.
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        let defaults = Self::default();

        Ok(Self {
            host: env_string("HOST").unwrap_or(defaults.host),
            port: env_parse("PORT")?.unwrap_or(defaults.port),
            livekit_url: env_string("LIVEKIT_URL"),
            livekit_api_key: env_string("LIVEKIT_API_KEY"),
            livekit_api_secret: env_string("LIVEKIT_API_SECRET"),
            static_dir: env_string("STATIC_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.static_dir),
            agent_config_path: env_string("AGENT_CONFIG_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.agent_config_path),
            metrics_file: env_string("METRICS_FILE")
                .map(PathBuf::from)
                .or(defaults.metrics_file),
            metrics_max_history: env_parse("METRICS_MAX_HISTORY")?
                .unwrap_or(defaults.metrics_max_history),
        })
    }

    /// Load configuration from a YAML file with environment variable base
    ///
    /// Environment variables (with defaults) form the base and YAML values
    /// override them.
    ///
    /// # Errors
    /// Returns an error if:
    /// - The YAML file cannot be read or is malformed
    /// - Environment variables have invalid formats
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        let yaml_config = yaml::YamlConfig::from_file(path)?;
        let mut config = Self::from_env()?;
        yaml_config.apply_to(&mut config);

        if config.metrics_max_history == 0 {
            return Err("metrics.max_history must be greater than zero".into());
        }

        Ok(config)
    }

    /// Get the server address as a string
    ///
    /// Returns the address in the format "host:port"
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// LiveKit credentials, or `None` when any of them is unset
    pub fn livekit_credentials(&self) -> Option<LiveKitCredentials<'_>> {
        Some(LiveKitCredentials {
            url: self.livekit_url.as_deref()?,
            api_key: self.livekit_api_key.as_deref()?,
            api_secret: self.livekit_api_secret.as_deref()?,
        })
    }
}

/// Read a non-empty environment variable
pub(crate) fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T>(key: &str) -> Result<Option<T>, Box<dyn std::error::Error>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env_string(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| format!("Invalid value for {key} ('{raw}'): {e}").into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;
    use std::fs;
    use tempfile::TempDir;

    fn cleanup_env_vars() {
        unsafe {
            for key in [
                "HOST",
                "PORT",
                "LIVEKIT_URL",
                "LIVEKIT_API_KEY",
                "LIVEKIT_API_SECRET",
                "STATIC_DIR",
                "AGENT_CONFIG_PATH",
                "METRICS_FILE",
                "METRICS_MAX_HISTORY",
            ] {
                env::remove_var(key);
            }
        }
    }

    #[test]
    #[serial]
    fn test_from_env_defaults() {
        cleanup_env_vars();

        let config = ServerConfig::from_env().unwrap();
        assert_eq!(config.address(), "0.0.0.0:3001");
        assert_eq!(config.static_dir, PathBuf::from("client"));
        assert_eq!(config.agent_config_path, PathBuf::from("agent_config.json"));
        assert_eq!(
            config.metrics_file,
            Some(PathBuf::from("shared_metrics.json"))
        );
        assert_eq!(config.metrics_max_history, 1000);
        assert!(config.livekit_credentials().is_none());
    }

    #[test]
    #[serial]
    fn test_from_env_overrides() {
        cleanup_env_vars();
        unsafe {
            env::set_var("PORT", "8080");
            env::set_var("LIVEKIT_URL", "ws://localhost:7880");
            env::set_var("LIVEKIT_API_KEY", "devkey");
            env::set_var("LIVEKIT_API_SECRET", "secret");
        }

        let config = ServerConfig::from_env().unwrap();
        assert_eq!(config.port, 8080);
        let creds = config.livekit_credentials().unwrap();
        assert_eq!(creds.url, "ws://localhost:7880");
        assert_eq!(creds.api_key, "devkey");

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_from_env_invalid_port() {
        cleanup_env_vars();
        unsafe {
            env::set_var("PORT", "not-a-port");
        }

        let result = ServerConfig::from_env();
        assert!(result.unwrap_err().to_string().contains("PORT"));

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_from_file_yaml_overrides_env() {
        cleanup_env_vars();

        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.yaml");
        let yaml_content = r#"
server:
  host: "127.0.0.1"
  port: 8080

livekit:
  url: "ws://yaml:7880"

metrics:
  file: "/tmp/metrics.json"
  max_history: 50
"#;
        fs::write(&config_path, yaml_content).unwrap();

        unsafe {
            env::set_var("HOST", "0.0.0.0");
            env::set_var("LIVEKIT_URL", "ws://env:7880");
            env::set_var("LIVEKIT_API_KEY", "env-key");
        }

        let config = ServerConfig::from_file(&config_path).unwrap();

        // YAML overrides ENV
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.livekit_url.as_deref(), Some("ws://yaml:7880"));
        // ENV value kept when YAML is silent
        assert_eq!(config.livekit_api_key.as_deref(), Some("env-key"));
        assert_eq!(config.metrics_max_history, 50);
        assert_eq!(config.metrics_file, Some(PathBuf::from("/tmp/metrics.json")));

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_from_file_missing_file() {
        cleanup_env_vars();

        let result = ServerConfig::from_file(&PathBuf::from("/nonexistent/config.yaml"));
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to read config file")
        );
    }

    #[test]
    #[serial]
    fn test_from_file_zero_history_rejected() {
        cleanup_env_vars();

        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.yaml");
        fs::write(&config_path, "metrics:\n  max_history: 0\n").unwrap();

        assert!(ServerConfig::from_file(&config_path).is_err());
    }
}
