use serde::Deserialize;
use std::path::PathBuf;

use super::ServerConfig;

/// Complete YAML configuration structure
///
/// All fields are optional to allow partial configuration. Values present in
/// the file override the environment.
///
/// # Example YAML structure
/// ```yaml
/// server:
///   host: "0.0.0.0"
///   port: 3001
///   static_dir: "client"
///
/// livekit:
///   url: "ws://localhost:7880"
///   api_key: "your-api-key"
///   api_secret: "your-api-secret"
///
/// agent:
///   config_path: "agent_config.json"
///
/// metrics:
///   file: "shared_metrics.json"
///   max_history: 1000
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub server: Option<ServerYaml>,
    pub livekit: Option<LiveKitYaml>,
    pub agent: Option<AgentYaml>,
    pub metrics: Option<MetricsYaml>,
}

/// Server configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ServerYaml {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub static_dir: Option<String>,
}

/// LiveKit configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct LiveKitYaml {
    pub url: Option<String>,
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
}

/// Agent configuration file location from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AgentYaml {
    pub config_path: Option<String>,
}

/// Metrics settings from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct MetricsYaml {
    pub file: Option<String>,
    pub max_history: Option<usize>,
}

impl YamlConfig {
    /// Load YAML configuration from a file
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file {}: {e}", path.display()))?;

        let config: YamlConfig = serde_yaml::from_str(&contents)
            .map_err(|e| format!("Failed to parse YAML config: {e}"))?;

        Ok(config)
    }

    /// Overlay every value present in the file onto `config`
    pub fn apply_to(self, config: &mut ServerConfig) {
        if let Some(server) = self.server {
            if let Some(host) = server.host {
                config.host = host;
            }
            if let Some(port) = server.port {
                config.port = port;
            }
            if let Some(dir) = server.static_dir {
                config.static_dir = PathBuf::from(dir);
            }
        }

        if let Some(livekit) = self.livekit {
            config.livekit_url = livekit.url.or(config.livekit_url.take());
            config.livekit_api_key = livekit.api_key.or(config.livekit_api_key.take());
            config.livekit_api_secret = livekit.api_secret.or(config.livekit_api_secret.take());
        }

        if let Some(path) = self.agent.and_then(|a| a.config_path) {
            config.agent_config_path = PathBuf::from(path);
        }

        if let Some(metrics) = self.metrics {
            if let Some(file) = metrics.file {
                config.metrics_file = Some(PathBuf::from(file));
            }
            if let Some(max) = metrics.max_history {
                config.metrics_max_history = max;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_yaml_parses() {
        let config: YamlConfig = serde_yaml::from_str("server:\n  port: 9000\n").unwrap();
        assert_eq!(config.server.unwrap().port, Some(9000));
        assert!(config.livekit.is_none());
    }

    #[test]
    fn test_apply_keeps_unset_values() {
        let mut server = ServerConfig {
            livekit_api_key: Some("env-key".to_string()),
            ..Default::default()
        };
        let yaml: YamlConfig =
            serde_yaml::from_str("livekit:\n  api_secret: \"yaml-secret\"\n").unwrap();
        yaml.apply_to(&mut server);

        assert_eq!(server.livekit_api_key.as_deref(), Some("env-key"));
        assert_eq!(server.livekit_api_secret.as_deref(), Some("yaml-secret"));
        assert_eq!(server.port, 3001);
    }
}
