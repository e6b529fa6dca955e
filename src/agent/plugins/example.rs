use async_trait::async_trait;

use super::option_bool;
use crate::agent::{AgentPlugin, PluginContext, PluginOptions};
use crate::errors::PluginError;

const SUFFIX: &str = " (Processed by Example Plugin!)";

/// Tags greetings so a request can be traced through the chain
#[derive(Debug, Clone)]
pub struct ExamplePlugin {
    enabled: bool,
}

impl ExamplePlugin {
    pub fn from_options(options: &PluginOptions) -> Result<Self, PluginError> {
        Ok(Self {
            enabled: option_bool(options, "enabled", true)?,
        })
    }
}

impl Default for ExamplePlugin {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[async_trait]
impl AgentPlugin for ExamplePlugin {
    fn name(&self) -> &str {
        "Example Plugin"
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    async fn process_message(
        &self,
        message: &str,
        _context: &mut PluginContext,
    ) -> Result<String, PluginError> {
        if message.to_lowercase().contains("hello") {
            return Ok(format!("{message}{SUFFIX}"));
        }
        Ok(message.to_string())
    }
}
