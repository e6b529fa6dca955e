//! Built-in message plugins
//!
//! Each plugin is constructed from its `PluginConfig::config` map through
//! `from_options`. Unknown keys are ignored; a known key with the wrong JSON
//! type is a configuration error.

mod example;
mod memory;
mod profanity;
mod sentiment;

pub use example::ExamplePlugin;
pub use memory::{ConversationMemoryPlugin, MemoryEntry};
pub use profanity::ProfanityFilterPlugin;
pub use sentiment::SentimentAnalysisPlugin;

use once_cell::sync::Lazy;
use regex::Regex;

use super::PluginOptions;
use crate::errors::PluginError;

/// Word tokens, the way the keyword plugins split a message
pub(crate) static WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\w+").expect("valid regex"));

pub(crate) fn option_bool(options: &PluginOptions, key: &str, default: bool) -> Result<bool, PluginError> {
    match options.get(key) {
        None => Ok(default),
        Some(value) => value
            .as_bool()
            .ok_or_else(|| PluginError::InvalidConfiguration(format!("'{key}' must be a boolean, got {value}"))),
    }
}

pub(crate) fn option_f64(options: &PluginOptions, key: &str, default: f64) -> Result<f64, PluginError> {
    match options.get(key) {
        None => Ok(default),
        Some(value) => value
            .as_f64()
            .ok_or_else(|| PluginError::InvalidConfiguration(format!("'{key}' must be a number, got {value}"))),
    }
}

pub(crate) fn option_usize(options: &PluginOptions, key: &str, default: usize) -> Result<usize, PluginError> {
    match options.get(key) {
        None => Ok(default),
        Some(value) => value
            .as_u64()
            .filter(|n| *n > 0)
            .map(|n| n as usize)
            .ok_or_else(|| {
                PluginError::InvalidConfiguration(format!("'{key}' must be a positive integer, got {value}"))
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_option_parsing() {
        let options: PluginOptions = json!({"enabled": false, "threshold": 0.8, "memory_size": 3})
            .as_object()
            .cloned()
            .unwrap();

        assert!(!option_bool(&options, "enabled", true).unwrap());
        assert!(option_bool(&options, "strict", true).unwrap());
        assert_eq!(option_f64(&options, "threshold", 0.5).unwrap(), 0.8);
        assert_eq!(option_usize(&options, "memory_size", 10).unwrap(), 3);
    }

    #[test]
    fn test_option_type_errors() {
        let options: PluginOptions = json!({"enabled": "yes", "memory_size": 0})
            .as_object()
            .cloned()
            .unwrap();

        assert!(option_bool(&options, "enabled", true).is_err());
        assert!(option_usize(&options, "memory_size", 10).is_err());
    }
}
