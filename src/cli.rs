//! Command-line interface
//!
//! `serve` (the default) runs the HTTP server; every other subcommand edits or
//! inspects the persisted agent configuration and exits. Output goes to the
//! supplied writer and interactive prompts read from the supplied reader, so
//! the commands run the same under test as on a terminal.

use anyhow::{Context, bail};
use clap::{Parser, Subcommand, ValueEnum};
use std::io::{BufRead, Write};
use std::path::PathBuf;

use crate::agent::PluginOptions;
use crate::config::{ConfigStore, PluginConfig, ProviderConfig};
use crate::core::ProviderKind;
use crate::core::llm::DEFAULT_LLM_MODEL;
use crate::core::stt::DEFAULT_STT_MODEL;
use crate::core::tts::{DEFAULT_TTS_MODEL, DEFAULT_TTS_VOICE};

/// WaaV Agent - voice agent runtime and configuration manager
#[derive(Parser, Debug)]
#[command(name = "waav-agent")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to server configuration file (YAML)
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Path to the persisted agent configuration (JSON)
    #[arg(long = "agent-config", value_name = "FILE")]
    pub agent_config: Option<PathBuf>,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Commands {
    /// Run the HTTP server (default)
    Serve,

    /// Show the current agent configuration
    Show,

    /// List registered providers
    ListProviders,

    /// Change the LLM provider
    ChangeLlm {
        /// Provider name (e.g. openai)
        provider: String,
        /// Model (e.g. gpt-4o-mini)
        model: String,
        #[arg(long)]
        api_key: Option<String>,
        /// Sampling temperature (0.0-1.0)
        #[arg(long)]
        temperature: Option<f32>,
    },

    /// Change the STT provider
    ChangeStt {
        /// Provider name (e.g. openai)
        provider: String,
        /// Model (e.g. whisper-1)
        model: String,
        #[arg(long)]
        api_key: Option<String>,
    },

    /// Change the TTS provider
    ChangeTts {
        /// Provider name (e.g. openai)
        provider: String,
        /// Model (e.g. tts-1)
        model: String,
        /// Voice (e.g. alloy)
        #[arg(long)]
        voice: Option<String>,
        #[arg(long)]
        api_key: Option<String>,
    },

    /// Manage message plugins
    Plugins {
        action: PluginAction,
        /// Plugin name, required for add and remove
        #[arg(long)]
        name: Option<String>,
        /// JSON file with the plugin's options
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,
    },

    /// Write a configuration template
    Template {
        /// Output file
        output: PathBuf,
    },

    /// Configure the agent by answering prompts
    Interactive,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginAction {
    List,
    Add,
    Remove,
}

/// Run a configuration subcommand against `store`
///
/// `serve` is handled by the binary and rejected here.
pub fn run_command(
    command: Commands,
    store: &ConfigStore,
    input: &mut impl BufRead,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    match command {
        Commands::Serve => bail!("serve is not a configuration command"),
        Commands::Show => show(store, out),
        Commands::ListProviders => list_providers(store, out),
        Commands::ChangeLlm {
            provider,
            model,
            api_key,
            temperature,
        } => {
            let config = ProviderConfig::new(provider, model)
                .with_api_key(api_key)
                .with_temperature(temperature);
            change_provider(store, ProviderKind::Llm, config, out)
        }
        Commands::ChangeStt {
            provider,
            model,
            api_key,
        } => {
            let config = ProviderConfig::new(provider, model).with_api_key(api_key);
            change_provider(store, ProviderKind::Stt, config, out)
        }
        Commands::ChangeTts {
            provider,
            model,
            voice,
            api_key,
        } => {
            let config = ProviderConfig::new(provider, model)
                .with_voice(voice)
                .with_api_key(api_key);
            change_provider(store, ProviderKind::Tts, config, out)
        }
        Commands::Plugins {
            action,
            name,
            config,
        } => match action {
            PluginAction::List => list_plugins(store, out),
            PluginAction::Add => {
                let name = name.context("--name is required to add a plugin")?;
                add_plugin(store, name, config, out)
            }
            PluginAction::Remove => {
                let name = name.context("--name is required to remove a plugin")?;
                if store.remove_plugin(&name)? {
                    writeln!(out, "Plugin {name} removed")?;
                } else {
                    writeln!(out, "Plugin {name} was not configured")?;
                }
                Ok(())
            }
        },
        Commands::Template { output } => {
            ConfigStore::create_config_template(&output)?;
            writeln!(out, "Template written to {}", output.display())?;
            Ok(())
        }
        Commands::Interactive => interactive(store, input, out),
    }
}

fn show(store: &ConfigStore, out: &mut impl Write) -> anyhow::Result<()> {
    let config = store.config();
    let preview: String = config.instructions.chars().take(100).collect();

    writeln!(out, "Current configuration ({})", store.path().display())?;
    writeln!(out, "{}", "=".repeat(50))?;
    writeln!(out, "Instructions: {preview}")?;
    writeln!(out)?;
    writeln!(out, "Providers:")?;
    writeln!(out, "  LLM: {}/{}", config.llm.provider_name, config.llm.model)?;
    writeln!(out, "  STT: {}/{}", config.stt.provider_name, config.stt.model)?;
    writeln!(
        out,
        "  TTS: {}/{} (voice: {})",
        config.tts.provider_name,
        config.tts.model,
        config.tts.voice_id.as_deref().unwrap_or("default")
    )?;
    writeln!(out, "  VAD: {}/{}", config.vad.provider_name, config.vad.model)?;
    writeln!(out)?;
    writeln!(out, "Plugins:")?;
    for plugin in &config.enabled_plugins {
        let status = if plugin.enabled { "on " } else { "off" };
        writeln!(out, "  [{status}] {}", plugin.plugin_name)?;
    }
    writeln!(out)?;
    writeln!(out, "Options:")?;
    writeln!(out, "  Barge-in: {}", on_off(config.enable_barge_in))?;
    writeln!(out, "  Metrics: {}", on_off(config.enable_metrics))?;
    writeln!(out, "  Max response time: {}s", config.max_response_time)?;
    Ok(())
}

fn on_off(flag: bool) -> &'static str {
    if flag { "enabled" } else { "disabled" }
}

fn list_providers(store: &ConfigStore, out: &mut impl Write) -> anyhow::Result<()> {
    writeln!(out, "Available providers:")?;
    for (kind, names) in store.list_available_providers() {
        writeln!(out, "\n{}:", kind.as_str().to_uppercase())?;
        for name in names {
            writeln!(out, "  - {name}")?;
        }
    }
    Ok(())
}

fn change_provider(
    store: &ConfigStore,
    kind: ProviderKind,
    config: ProviderConfig,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    if !store.providers().has_provider(kind, &config.provider_name) {
        writeln!(
            out,
            "Warning: {kind} provider '{}' is not registered; sessions will fall back to defaults",
            config.provider_name
        )?;
    }

    let summary = format!("{}/{}", config.provider_name, config.model);
    store
        .update_provider(kind, config)
        .with_context(|| format!("Failed to update {kind} provider"))?;
    writeln!(out, "Provider {kind} changed to {summary}")?;
    Ok(())
}

fn list_plugins(store: &ConfigStore, out: &mut impl Write) -> anyhow::Result<()> {
    writeln!(out, "Available plugins:")?;
    for name in store.list_available_plugins() {
        writeln!(out, "  - {name}")?;
    }

    writeln!(out, "\nConfigured plugins:")?;
    for plugin in store.config().enabled_plugins {
        let status = if plugin.enabled { "on " } else { "off" };
        writeln!(out, "  [{status}] {}", plugin.plugin_name)?;
    }
    Ok(())
}

fn add_plugin(
    store: &ConfigStore,
    name: String,
    options_file: Option<PathBuf>,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let options: PluginOptions = match options_file {
        Some(path) => {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("{} is not a JSON object", path.display()))?
        }
        None => PluginOptions::new(),
    };

    if !store.plugins().has_plugin(&name) {
        writeln!(out, "Warning: plugin '{name}' is not registered and will be skipped")?;
    }

    store.add_plugin(PluginConfig::new(name.as_str()).with_config(options))?;
    writeln!(out, "Plugin {name} added")?;
    Ok(())
}

/// Print `label`, read one line; blank input yields `default`
fn prompt(
    input: &mut impl BufRead,
    out: &mut impl Write,
    label: &str,
    default: &str,
) -> anyhow::Result<String> {
    write!(out, "{label}: ")?;
    out.flush()?;

    let mut line = String::new();
    input.read_line(&mut line)?;
    let answer = line.trim();
    Ok(if answer.is_empty() {
        default.to_string()
    } else {
        answer.to_string()
    })
}

fn interactive(
    store: &ConfigStore,
    input: &mut impl BufRead,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    writeln!(out, "Interactive agent setup")?;
    writeln!(out, "{}", "=".repeat(40))?;

    let instructions = prompt(input, out, "Agent instructions (Enter keeps current)", "")?;
    if !instructions.is_empty() {
        store.set_instructions(instructions)?;
    }

    writeln!(out, "\nLLM")?;
    let llm_provider = prompt(input, out, "Provider (openai, anthropic)", "openai")?;
    let llm_model = prompt(input, out, &format!("Model for {llm_provider}"), DEFAULT_LLM_MODEL)?;

    writeln!(out, "\nSTT")?;
    let stt_provider = prompt(input, out, "Provider (openai, google)", "openai")?;
    let stt_model = prompt(input, out, &format!("Model for {stt_provider}"), DEFAULT_STT_MODEL)?;

    writeln!(out, "\nTTS")?;
    let tts_provider = prompt(input, out, "Provider (openai, elevenlabs)", "openai")?;
    let tts_model = prompt(input, out, &format!("Model for {tts_provider}"), DEFAULT_TTS_MODEL)?;
    let tts_voice = prompt(input, out, "Voice (alloy, echo, fable, ...)", DEFAULT_TTS_VOICE)?;

    change_provider(store, ProviderKind::Llm, ProviderConfig::new(llm_provider, llm_model), out)?;
    change_provider(store, ProviderKind::Stt, ProviderConfig::new(stt_provider, stt_model), out)?;
    change_provider(
        store,
        ProviderKind::Tts,
        ProviderConfig::new(tts_provider, tts_model).with_voice(Some(tts_voice)),
        out,
    )?;

    writeln!(out, "\nConfiguration updated\n")?;
    show(store, out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DynamicAgentConfig;
    use crate::plugin::{PluginRegistry, ProviderRegistry};
    use std::io::Cursor;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn store(dir: &TempDir) -> ConfigStore {
        ConfigStore::with_config(
            dir.path().join("agent_config.json"),
            DynamicAgentConfig::default(),
            Arc::new(ProviderRegistry::with_builtins()),
            Arc::new(PluginRegistry::with_builtins()),
        )
    }

    fn run(store: &ConfigStore, args: &[&str], stdin: &str) -> anyhow::Result<String> {
        let cli = Cli::try_parse_from(std::iter::once("waav-agent").chain(args.iter().copied()))?;
        let mut out = Vec::new();
        let mut input = Cursor::new(stdin.as_bytes().to_vec());
        run_command(cli.command.unwrap_or(Commands::Serve), store, &mut input, &mut out)?;
        Ok(String::from_utf8(out)?)
    }

    #[test]
    fn test_change_llm_persists() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        let out = run(&store, &["change-llm", "openai", "gpt-4o", "--temperature", "0.2"], "").unwrap();
        assert!(out.contains("Provider llm changed to openai/gpt-4o"));

        let saved: DynamicAgentConfig =
            serde_json::from_str(&std::fs::read_to_string(store.path()).unwrap()).unwrap();
        assert_eq!(saved.llm.model, "gpt-4o");
        assert_eq!(saved.llm.temperature, Some(0.2));
        // Replaced wholesale
        assert_eq!(saved.llm.max_tokens, None);
    }

    #[test]
    fn test_unknown_provider_warns_but_saves() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let out = run(&store, &["change-tts", "elevenlabs", "turbo", "--voice", "rachel"], "").unwrap();
        assert!(out.starts_with("Warning: tts provider 'elevenlabs'"));
        assert_eq!(store.config().tts.voice_id.as_deref(), Some("rachel"));
    }

    #[test]
    fn test_plugins_add_remove() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let options = dir.path().join("memory.json");
        std::fs::write(&options, r#"{"memory_size": 4}"#).unwrap();

        run(
            &store,
            &["plugins", "add", "--name", "conversation_memory", "--config", options.to_str().unwrap()],
            "",
        )
        .unwrap();
        let added = store.config();
        let memory = added
            .enabled_plugins
            .iter()
            .find(|p| p.plugin_name == "conversation_memory")
            .unwrap();
        assert_eq!(memory.config["memory_size"], 4);

        let out = run(&store, &["plugins", "remove", "--name", "conversation_memory"], "").unwrap();
        assert!(out.contains("removed"));
        let out = run(&store, &["plugins", "remove", "--name", "conversation_memory"], "").unwrap();
        assert!(out.contains("was not configured"));

        assert!(run(&store, &["plugins", "add"], "").is_err());
    }

    #[test]
    fn test_list_commands() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        let providers = run(&store, &["list-providers"], "").unwrap();
        assert!(providers.contains("LLM:"));
        assert!(providers.contains("  - silero"));

        let plugins = run(&store, &["plugins", "list"], "").unwrap();
        assert!(plugins.contains("  - sentiment_analysis"));
        assert!(plugins.contains("[on ] example"));

        let shown = run(&store, &["show"], "").unwrap();
        assert!(shown.contains("TTS: openai/tts-1 (voice: alloy)"));
    }

    #[test]
    fn test_interactive_blank_answers_keep_defaults() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let before = store.config().instructions;

        let answers = "\n\ngpt-4o\n\n\n\n\nnova\n";
        let out = run(&store, &["interactive"], answers).unwrap();
        assert!(out.contains("Configuration updated"));

        let config = store.config();
        assert_eq!(config.instructions, before);
        assert_eq!(config.llm.provider_name, "openai");
        assert_eq!(config.llm.model, "gpt-4o");
        assert_eq!(config.stt.model, DEFAULT_STT_MODEL);
        assert_eq!(config.tts.model, DEFAULT_TTS_MODEL);
        assert_eq!(config.tts.voice_id.as_deref(), Some("nova"));
    }

    #[test]
    fn test_template_and_default_command() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let output = dir.path().join("template.json");

        run(&store, &["template", output.to_str().unwrap()], "").unwrap();
        let template: DynamicAgentConfig =
            serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(template, DynamicAgentConfig::template());

        let cli = Cli::try_parse_from(["waav-agent"]).unwrap();
        assert_eq!(cli.command, None);
    }
}
