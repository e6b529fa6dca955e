//! Modular agent: one LLM provider plus an ordered plugin chain
//!
//! Every user message runs through the enabled plugins in order. Each plugin
//! may rewrite the message and enrich a shared [`PluginContext`]; the LLM then
//! answers the processed message and the response runs through the chain
//! again. A plugin that fails is logged and skipped, the chain continues with
//! the last good message.
//!
//! The LLM binding and the plugin list can be swapped while the agent is in
//! use. Calls already in flight keep the instances they started with.

mod factory;
pub mod plugins;

pub use factory::AgentFactory;

use arc_swap::ArcSwap;
use async_trait::async_trait;
use serde_json::{Map, Value, json};
use std::sync::Arc;
use std::time::Duration;

use crate::config::ProviderConfig;
use crate::core::{LlmProvider, ModelInfo};
use crate::errors::{PluginError, ProviderError};
use crate::metrics::{MetricData, MetricsCollector, names};
use crate::plugin::{PluginRegistry, ProviderRegistry, call_isolated_async};

/// Mutable context threaded through one pass of the plugin chain
pub type PluginContext = Map<String, Value>;

/// Free-form plugin options, as stored in `PluginConfig::config`
pub type PluginOptions = Map<String, Value>;

/// A message-processing stage in the agent's plugin chain
#[async_trait]
pub trait AgentPlugin: Send + Sync {
    /// Human-readable plugin name
    fn name(&self) -> &str;

    /// Disabled plugins are skipped by the chain runner
    fn is_enabled(&self) -> bool;

    /// Process `message`, returning the text handed to the next stage
    async fn process_message(
        &self,
        message: &str,
        context: &mut PluginContext,
    ) -> Result<String, PluginError>;
}

/// Read a string entry from a plugin context
pub fn context_str<'a>(context: &'a PluginContext, key: &str) -> Option<&'a str> {
    context.get(key).and_then(Value::as_str)
}

type PluginList = Vec<(String, Arc<dyn AgentPlugin>)>;

/// LLM provider plus plugin chain, shared across a session
pub struct ModularAgent {
    instructions: String,
    llm: ArcSwap<Box<dyn LlmProvider>>,
    plugins: ArcSwap<PluginList>,
    metrics: Arc<MetricsCollector>,
    providers: Arc<ProviderRegistry>,
    plugin_registry: Arc<PluginRegistry>,
    response_timeout: Option<Duration>,
}

impl ModularAgent {
    pub fn new(
        instructions: impl Into<String>,
        llm: Box<dyn LlmProvider>,
        metrics: Arc<MetricsCollector>,
        providers: Arc<ProviderRegistry>,
        plugin_registry: Arc<PluginRegistry>,
    ) -> Self {
        Self {
            instructions: instructions.into(),
            llm: ArcSwap::from_pointee(llm),
            plugins: ArcSwap::from_pointee(Vec::new()),
            metrics,
            providers,
            plugin_registry,
            response_timeout: None,
        }
    }

    /// Start with an initial plugin chain, in order
    pub fn with_plugins(self, plugins: Vec<(String, Arc<dyn AgentPlugin>)>) -> Self {
        self.plugins.store(Arc::new(plugins));
        self
    }

    /// Bound every LLM call; `None` disables the limit
    pub fn with_response_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.response_timeout = timeout;
        self
    }

    pub fn instructions(&self) -> &str {
        &self.instructions
    }

    pub fn response_timeout(&self) -> Option<Duration> {
        self.response_timeout
    }

    /// Registry names of the plugins in the chain, in order
    pub fn plugin_names(&self) -> Vec<String> {
        self.plugins
            .load()
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub fn llm_info(&self) -> ModelInfo {
        self.llm.load().model_info()
    }

    /// Run `message` through every enabled plugin
    ///
    /// Each successful plugin records a `plugin_processing` count tagged with
    /// the plugin name and the context's `session_id`.
    pub async fn process_message_with_plugins(
        &self,
        message: &str,
        context: &mut PluginContext,
    ) -> String {
        self.run_chain(message, context, true).await
    }

    async fn run_chain(&self, message: &str, context: &mut PluginContext, record: bool) -> String {
        let plugins = self.plugins.load_full();
        let session_id = context_str(context, "session_id")
            .unwrap_or("unknown")
            .to_string();

        let mut processed = message.to_string();
        for (name, plugin) in plugins.iter() {
            if !plugin.is_enabled() {
                continue;
            }

            let result = call_isolated_async(
                plugin.process_message(&processed, context),
                PluginError::Panicked,
            )
            .await;

            match result {
                Ok(next) => {
                    processed = next;
                    if record {
                        self.metrics.record(
                            MetricData::count(names::PLUGIN_PROCESSING)
                                .with_metadata("plugin", name.as_str())
                                .with_metadata("session_id", session_id.as_str()),
                        );
                    }
                }
                Err(e) => {
                    tracing::warn!(plugin = %name, session_id = %session_id, error = %e, "Plugin failed, skipping");
                }
            }
        }
        processed
    }

    /// Pre-process, ask the LLM, then post-process the response
    ///
    /// The LLM call is timed as `llm_latency` (tagged with the context's
    /// `session_id` when present) and bounded by the response timeout.
    pub async fn generate_response(
        &self,
        message: &str,
        context: &mut PluginContext,
    ) -> Result<String, ProviderError> {
        let processed = self.run_chain(message, context, true).await;

        let llm = self.llm.load_full();
        let session_id = context_str(context, "session_id").map(str::to_string);

        let response = {
            let _timer = self.metrics.timer(names::LLM_LATENCY, session_id.as_deref());
            let call = call_isolated_async(
                llm.generate_response(&processed, &self.instructions),
                ProviderError::Panicked,
            );
            match self.response_timeout {
                Some(limit) => tokio::time::timeout(limit, call)
                    .await
                    .map_err(|_| ProviderError::Timeout(limit))??,
                None => call.await?,
            }
        };

        Ok(self.run_chain(&response, context, false).await)
    }

    /// Replace the LLM binding with a freshly constructed provider
    pub fn update_llm_provider(
        &self,
        provider_name: &str,
        config: ProviderConfig,
    ) -> Result<(), ProviderError> {
        let provider = self.providers.create_llm(provider_name, config)?;
        self.llm.store(Arc::new(provider));
        tracing::info!(provider = %provider_name, "LLM provider swapped");
        Ok(())
    }

    /// Append a plugin to the chain; returns false if it was not added
    pub fn add_plugin(&self, plugin_name: &str, options: &PluginOptions) -> bool {
        let plugin: Arc<dyn AgentPlugin> = match self.plugin_registry.create(plugin_name, options) {
            Ok(plugin) => Arc::from(plugin),
            Err(e) => {
                tracing::error!(plugin = %plugin_name, error = %e, "Failed to add plugin");
                return false;
            }
        };

        if !plugin.is_enabled() {
            tracing::info!(plugin = %plugin_name, "Plugin is disabled, not added");
            return false;
        }

        self.plugins.rcu(|current| {
            let mut next = PluginList::clone(current);
            next.push((plugin_name.to_string(), plugin.clone()));
            next
        });
        tracing::info!(plugin = %plugin_name, "Plugin added");
        true
    }

    /// Latency summary for one session, or averages plus agent composition
    pub fn metrics_summary(&self, session_id: Option<&str>) -> Value {
        if let Some((id, session)) =
            session_id.and_then(|id| self.metrics.session_metrics(id).map(|m| (id, m)))
        {
            return json!({
                "session_id": id,
                "stt_latency": session.stt_latency,
                "llm_latency": session.llm_latency,
                "tts_latency": session.tts_latency,
                "total_latency": session.total_latency,
            });
        }

        let active_plugins: Vec<String> = self
            .plugins
            .load()
            .iter()
            .filter(|(_, plugin)| plugin.is_enabled())
            .map(|(_, plugin)| plugin.name().to_string())
            .collect();
        let llm = self.llm_info();

        json!({
            "average_metrics": self.metrics.average(None),
            "active_plugins": active_plugins,
            "llm_provider": llm.provider,
            "llm_model": llm.model,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::OpenAiLlm;
    use crate::core::llm::ResponseStream;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Suffix(&'static str);

    #[async_trait]
    impl AgentPlugin for Suffix {
        fn name(&self) -> &str {
            "suffix"
        }

        fn is_enabled(&self) -> bool {
            true
        }

        async fn process_message(
            &self,
            message: &str,
            context: &mut PluginContext,
        ) -> Result<String, PluginError> {
            context.insert(self.0.to_string(), Value::Bool(true));
            Ok(format!("{message}{}", self.0))
        }
    }

    struct Failing;

    #[async_trait]
    impl AgentPlugin for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        fn is_enabled(&self) -> bool {
            true
        }

        async fn process_message(
            &self,
            _message: &str,
            _context: &mut PluginContext,
        ) -> Result<String, PluginError> {
            Err(PluginError::Processing("boom".to_string()))
        }
    }

    struct Panicking;

    #[async_trait]
    impl AgentPlugin for Panicking {
        fn name(&self) -> &str {
            "panicking"
        }

        fn is_enabled(&self) -> bool {
            true
        }

        async fn process_message(
            &self,
            _message: &str,
            _context: &mut PluginContext,
        ) -> Result<String, PluginError> {
            panic!("plugin bug");
        }
    }

    struct SlowLlm(Arc<AtomicUsize>);

    #[async_trait]
    impl LlmProvider for SlowLlm {
        async fn generate_response(&self, _: &str, _: &str) -> Result<String, ProviderError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok("late".to_string())
        }

        async fn generate_streaming_response(
            &self,
            _: &str,
            _: &str,
        ) -> Result<ResponseStream, ProviderError> {
            Err(ProviderError::Request("unsupported".to_string()))
        }

        fn model_info(&self) -> ModelInfo {
            ModelInfo {
                provider: "slow".to_string(),
                model: "slow-1".to_string(),
                max_tokens: None,
                version: None,
            }
        }
    }

    fn agent(metrics: Arc<MetricsCollector>) -> ModularAgent {
        let llm = OpenAiLlm::new(ProviderConfig::new("openai", "gpt-4o-mini")).unwrap();
        ModularAgent::new(
            "Be brief.",
            Box::new(llm),
            metrics,
            Arc::new(ProviderRegistry::with_builtins()),
            Arc::new(PluginRegistry::with_builtins()),
        )
    }

    fn session_context(id: &str) -> PluginContext {
        let mut context = PluginContext::new();
        context.insert("session_id".to_string(), json!(id));
        context
    }

    #[tokio::test]
    async fn test_chain_runs_in_order() {
        let metrics = Arc::new(MetricsCollector::new(100));
        let agent = agent(metrics.clone()).with_plugins(vec![
            ("a".to_string(), Arc::new(Suffix("-a")) as Arc<dyn AgentPlugin>),
            ("b".to_string(), Arc::new(Suffix("-b"))),
        ]);

        let mut context = session_context("room_1");
        let out = agent.process_message_with_plugins("msg", &mut context).await;

        assert_eq!(out, "msg-a-b");
        assert_eq!(context.get("-a"), Some(&Value::Bool(true)));
        let counts = metrics.query(Some(names::PLUGIN_PROCESSING), Some("room_1"), None);
        assert_eq!(counts.len(), 2);
        assert_eq!(counts[0].metadata["plugin"], "a");
        assert_eq!(counts[1].metadata["plugin"], "b");
    }

    #[tokio::test]
    async fn test_failing_and_panicking_plugins_are_skipped() {
        let metrics = Arc::new(MetricsCollector::new(100));
        let agent = agent(metrics.clone()).with_plugins(vec![
            ("failing".to_string(), Arc::new(Failing) as Arc<dyn AgentPlugin>),
            ("panicking".to_string(), Arc::new(Panicking)),
            ("b".to_string(), Arc::new(Suffix("-b"))),
        ]);

        let mut context = PluginContext::new();
        let out = agent.process_message_with_plugins("msg", &mut context).await;

        assert_eq!(out, "msg-b");
        let counts = metrics.query(Some(names::PLUGIN_PROCESSING), Some("unknown"), None);
        assert_eq!(counts.len(), 1);
    }

    #[tokio::test]
    async fn test_generate_response_times_llm_for_session() {
        let metrics = Arc::new(MetricsCollector::new(100));
        metrics.start_session_tracking("room_1");
        let agent = agent(metrics.clone())
            .with_plugins(vec![("a".to_string(), Arc::new(Suffix("!")) as Arc<dyn AgentPlugin>)]);

        let mut context = session_context("room_1");
        let response = agent.generate_response("hi there", &mut context).await.unwrap();

        // Pre-pass appends once, post-pass once more
        assert_eq!(response, "hi there!!");
        assert!(metrics.session_metrics("room_1").unwrap().llm_latency.is_some());
        // Only the pre-pass is counted
        assert_eq!(
            metrics.query(Some(names::PLUGIN_PROCESSING), None, None).len(),
            1
        );
    }

    #[tokio::test]
    async fn test_response_timeout_enforced() {
        let metrics = Arc::new(MetricsCollector::new(100));
        let calls = Arc::new(AtomicUsize::new(0));
        let agent = ModularAgent::new(
            "Be brief.",
            Box::new(SlowLlm(calls.clone())),
            metrics.clone(),
            Arc::new(ProviderRegistry::with_builtins()),
            Arc::new(PluginRegistry::with_builtins()),
        )
        .with_response_timeout(Some(Duration::from_millis(50)));

        let result = agent.generate_response("hello", &mut PluginContext::new()).await;
        assert!(matches!(result, Err(ProviderError::Timeout(d)) if d == Duration::from_millis(50)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        // The timer still records the aborted call
        assert_eq!(metrics.query(Some(names::LLM_LATENCY), None, None).len(), 1);
    }

    #[tokio::test]
    async fn test_swap_llm_and_add_plugin() {
        let agent = agent(Arc::new(MetricsCollector::new(10)));

        assert!(agent.update_llm_provider("openai", ProviderConfig::new("openai", "gpt-4o")).is_ok());
        assert_eq!(agent.llm_info().model, "gpt-4o");
        assert!(agent.update_llm_provider("anthropic", ProviderConfig::new("anthropic", "x")).is_err());
        assert_eq!(agent.llm_info().model, "gpt-4o");

        assert!(agent.add_plugin("example", &PluginOptions::new()));
        assert!(!agent.add_plugin("does_not_exist", &PluginOptions::new()));

        let mut disabled = PluginOptions::new();
        disabled.insert("enabled".to_string(), Value::Bool(false));
        assert!(!agent.add_plugin("sentiment_analysis", &disabled));

        assert_eq!(agent.plugin_names(), vec!["example"]);
    }

    #[tokio::test]
    async fn test_metrics_summary_shapes() {
        let metrics = Arc::new(MetricsCollector::new(10));
        metrics.record_session("room_1", names::LLM_LATENCY, 120.0, "ms");
        let agent = agent(metrics.clone());
        agent.add_plugin("example", &PluginOptions::new());

        let session = agent.metrics_summary(Some("room_1"));
        assert_eq!(session["llm_latency"], 120.0);
        assert!(session["stt_latency"].is_null());

        let overall = agent.metrics_summary(Some("missing"));
        assert_eq!(overall["llm_provider"], "openai");
        assert_eq!(overall["active_plugins"], json!(["Example Plugin"]));
        assert_eq!(overall["average_metrics"]["llm_latency"], 120.0);
    }
}
