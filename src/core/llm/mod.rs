//! Language model providers
//!
//! An [`LlmProvider`] turns a (plugin-processed) user message and the agent's
//! system instructions into a response. Providers are constructed fresh per
//! call to [`crate::plugin::ProviderRegistry::create_llm`].

mod openai;

use async_trait::async_trait;
use futures::stream::BoxStream;

use super::ModelInfo;
use crate::errors::ProviderError;

pub use openai::{DEFAULT_LLM_MODEL, OpenAiLlm};

/// Stream of response chunks
pub type ResponseStream = BoxStream<'static, Result<String, ProviderError>>;

/// Base trait for language model providers
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Generate a complete response for a user message
    async fn generate_response(
        &self,
        message: &str,
        system_prompt: &str,
    ) -> Result<String, ProviderError>;

    /// Generate a response as a stream of text chunks
    async fn generate_streaming_response(
        &self,
        message: &str,
        system_prompt: &str,
    ) -> Result<ResponseStream, ProviderError>;

    /// Describe the provider and model in use
    fn model_info(&self) -> ModelInfo;
}
