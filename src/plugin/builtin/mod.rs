//! Built-in Registrations
//!
//! Registers the built-in pipeline providers and message plugins with the
//! registries using the `inventory` crate.
//!
//! # Providers
//!
//! - LLM: OpenAI
//! - STT: OpenAI Whisper
//! - TTS: OpenAI
//! - VAD: Silero
//!
//! # Plugins
//!
//! - example, sentiment_analysis, profanity_filter, conversation_memory

use crate::agent::plugins::{
    ConversationMemoryPlugin, ExamplePlugin, ProfanityFilterPlugin, SentimentAnalysisPlugin,
};
use crate::agent::{AgentPlugin, PluginOptions};
use crate::config::ProviderConfig;
use crate::core::llm::DEFAULT_LLM_MODEL;
use crate::core::stt::DEFAULT_STT_MODEL;
use crate::core::tts::{DEFAULT_TTS_MODEL, DEFAULT_TTS_VOICE};
use crate::core::vad::SILERO_MODEL;
use crate::core::{
    LlmProvider, OpenAiLlm, OpenAiStt, OpenAiTts, SileroVad, SttProvider, TtsProvider, VadProvider,
};
use crate::errors::{PluginError, ProviderError};
use crate::plugin::metadata::{PluginMetadata, ProviderMetadata};
use crate::plugin::registry::{PluginConstructor, ProviderConstructor};

// ============================================================================
// Provider Metadata Functions
// ============================================================================

fn openai_llm_metadata() -> ProviderMetadata {
    ProviderMetadata::llm("openai", "OpenAI Chat Completions")
        .with_description("Chat-completion models with streaming responses")
        .with_alias("open-ai")
        .with_features(["streaming", "system-prompt"])
        .with_models([DEFAULT_LLM_MODEL, "gpt-4o", "gpt-4-turbo", "gpt-3.5-turbo"])
}

fn openai_stt_metadata() -> ProviderMetadata {
    ProviderMetadata::stt("openai", "OpenAI Whisper")
        .with_description("Batch transcription using Whisper models")
        .with_alias("open-ai")
        .with_features(["punctuation"])
        .with_models([DEFAULT_STT_MODEL])
}

fn openai_tts_metadata() -> ProviderMetadata {
    ProviderMetadata::tts("openai", "OpenAI TTS")
        .with_description(format!(
            "Speech synthesis with selectable voices (default voice: {DEFAULT_TTS_VOICE})"
        ))
        .with_alias("open-ai")
        .with_features(["voices"])
        .with_models([DEFAULT_TTS_MODEL, "tts-1-hd"])
}

fn silero_vad_metadata() -> ProviderMetadata {
    ProviderMetadata::vad("silero", "Silero VAD")
        .with_description("Voice activity detection with a configurable threshold")
        .with_models([SILERO_MODEL])
}

// ============================================================================
// Provider Factory Functions
// ============================================================================

fn create_openai_llm(config: ProviderConfig) -> Result<Box<dyn LlmProvider>, ProviderError> {
    Ok(Box::new(OpenAiLlm::new(config)?))
}

fn create_openai_stt(config: ProviderConfig) -> Result<Box<dyn SttProvider>, ProviderError> {
    Ok(Box::new(OpenAiStt::new(config)?))
}

fn create_openai_tts(config: ProviderConfig) -> Result<Box<dyn TtsProvider>, ProviderError> {
    Ok(Box::new(OpenAiTts::new(config)?))
}

fn create_silero_vad(config: ProviderConfig) -> Result<Box<dyn VadProvider>, ProviderError> {
    Ok(Box::new(SileroVad::new(config)?))
}

inventory::submit! {
    ProviderConstructor::llm("openai", openai_llm_metadata, create_openai_llm)
}

inventory::submit! {
    ProviderConstructor::stt("openai", openai_stt_metadata, create_openai_stt)
}

inventory::submit! {
    ProviderConstructor::tts("openai", openai_tts_metadata, create_openai_tts)
}

inventory::submit! {
    ProviderConstructor::vad("silero", silero_vad_metadata, create_silero_vad)
}

// ============================================================================
// Plugins
// ============================================================================

fn example_metadata() -> PluginMetadata {
    PluginMetadata::new("example", "Example Plugin")
        .with_description("Tags greetings so the pipeline can be observed end to end")
}

fn sentiment_metadata() -> PluginMetadata {
    PluginMetadata::new("sentiment_analysis", "Sentiment Analysis Plugin")
        .with_description("Keyword sentiment scoring that sets tone and urgency in the context")
        .with_config_keys(["enabled", "threshold"])
}

fn profanity_metadata() -> PluginMetadata {
    PluginMetadata::new("profanity_filter", "Profanity Filter Plugin")
        .with_description("Replaces abusive or spam messages and masks bad words")
        .with_config_keys(["enabled", "strict"])
}

fn memory_metadata() -> PluginMetadata {
    PluginMetadata::new("conversation_memory", "Conversation Memory Plugin")
        .with_description("Per-session history with topic and engagement insights")
        .with_config_keys(["enabled", "memory_size"])
}

fn create_example(options: &PluginOptions) -> Result<Box<dyn AgentPlugin>, PluginError> {
    Ok(Box::new(ExamplePlugin::from_options(options)?))
}

fn create_sentiment(options: &PluginOptions) -> Result<Box<dyn AgentPlugin>, PluginError> {
    Ok(Box::new(SentimentAnalysisPlugin::from_options(options)?))
}

fn create_profanity(options: &PluginOptions) -> Result<Box<dyn AgentPlugin>, PluginError> {
    Ok(Box::new(ProfanityFilterPlugin::from_options(options)?))
}

fn create_memory(options: &PluginOptions) -> Result<Box<dyn AgentPlugin>, PluginError> {
    Ok(Box::new(ConversationMemoryPlugin::from_options(options)?))
}

inventory::submit! {
    PluginConstructor::new("example", example_metadata, create_example)
}

inventory::submit! {
    PluginConstructor::new("sentiment_analysis", sentiment_metadata, create_sentiment)
}

inventory::submit! {
    PluginConstructor::new("profanity_filter", profanity_metadata, create_profanity)
}

inventory::submit! {
    PluginConstructor::new("conversation_memory", memory_metadata, create_memory)
}
