//! Latency and event metrics
//!
//! [`MetricsCollector`] keeps a bounded FIFO history of [`MetricData`] and a
//! per-session [`PerformanceMetrics`] table. Every record notifies the
//! registered observers and queues a refresh of the shared snapshot file that
//! the HTTP surface reads from (the agent worker and the HTTP server may be
//! different processes). The file is written off the async runtime.

mod timer;
mod writer;

pub use timer::MetricsTimer;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::plugin::call_isolated;
use writer::SnapshotWriter;

/// Number of history entries included in a snapshot
pub const SNAPSHOT_RECENT_METRICS: usize = 50;

/// Metric names with special meaning
pub mod names {
    pub const CONNECTION_SUCCESS: &str = "connection_success";
    pub const CONNECTION_ERROR: &str = "connection_error";
    pub const PLUGIN_PROCESSING: &str = "plugin_processing";
    pub const LLM_LATENCY: &str = "llm_latency";
    pub const STT_LATENCY: &str = "stt_latency";
    pub const TTS_LATENCY: &str = "tts_latency";
    pub const TOTAL_LATENCY: &str = "total_latency";
}

/// A single recorded measurement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricData {
    pub name: String,
    pub value: f64,
    pub unit: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl MetricData {
    /// New measurement stamped now, in milliseconds
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value,
            unit: "ms".to_string(),
            timestamp: Utc::now(),
            metadata: Map::new(),
        }
    }

    /// A `count` event with value 1
    pub fn count(name: impl Into<String>) -> Self {
        Self::new(name, 1.0).with_unit("count")
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = unit.into();
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn session_id(&self) -> Option<&str> {
        self.metadata.get("session_id").and_then(Value::as_str)
    }
}

/// Per-session latency aggregate
///
/// Each field holds the last value recorded under the metric of the same name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub ttfb: Option<f64>,
    pub ttft: Option<f64>,
    pub total_latency: Option<f64>,
    pub stt_latency: Option<f64>,
    pub llm_latency: Option<f64>,
    pub tts_latency: Option<f64>,
    pub audio_duration: Option<f64>,
    pub response_length: Option<f64>,
}

impl PerformanceMetrics {
    /// Set the field named `name`; returns false for names with no field
    pub fn apply(&mut self, name: &str, value: f64) -> bool {
        let slot = match name {
            "ttfb" => &mut self.ttfb,
            "ttft" => &mut self.ttft,
            "total_latency" => &mut self.total_latency,
            "stt_latency" => &mut self.stt_latency,
            "llm_latency" => &mut self.llm_latency,
            "tts_latency" => &mut self.tts_latency,
            "audio_duration" => &mut self.audio_duration,
            "response_length" => &mut self.response_length,
            _ => return false,
        };
        *slot = Some(value);
        true
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Counters included in every snapshot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSummary {
    pub total_metrics_count: usize,
    pub connection_success: usize,
    pub connection_errors: usize,
    pub active_sessions_count: usize,
}

/// Document written to the shared metrics file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub last_updated: DateTime<Utc>,
    pub recent_metrics: Vec<MetricData>,
    pub active_sessions: BTreeMap<String, PerformanceMetrics>,
    pub summary: MetricsSummary,
}

/// Callback notified of every recorded metric
pub type MetricObserver = Arc<dyn Fn(&MetricData) -> anyhow::Result<()> + Send + Sync>;

/// Handle returned by [`MetricsCollector::add_observer`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

struct Inner {
    history: VecDeque<MetricData>,
    sessions: HashMap<String, PerformanceMetrics>,
}

/// Thread-safe metrics store
pub struct MetricsCollector {
    max_history: usize,
    inner: Mutex<Inner>,
    observers: RwLock<Vec<(ObserverId, MetricObserver)>>,
    next_observer: AtomicU64,
    snapshot_writer: Option<Arc<SnapshotWriter>>,
}

impl MetricsCollector {
    /// In-memory collector; `max_history` is clamped to at least one entry
    pub fn new(max_history: usize) -> Self {
        let max_history = max_history.max(1);
        Self {
            max_history,
            inner: Mutex::new(Inner {
                history: VecDeque::with_capacity(max_history),
                sessions: HashMap::new(),
            }),
            observers: RwLock::new(Vec::new()),
            next_observer: AtomicU64::new(0),
            snapshot_writer: None,
        }
    }

    /// Refresh a snapshot at `path` after every change
    pub fn with_snapshot_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.snapshot_writer = Some(Arc::new(SnapshotWriter::new(path.into())));
        self
    }

    pub fn max_history(&self) -> usize {
        self.max_history
    }

    pub fn snapshot_path(&self) -> Option<&Path> {
        self.snapshot_writer.as_deref().map(SnapshotWriter::path)
    }

    /// Append a metric, notify observers, then queue a snapshot refresh
    pub fn record(&self, metric: MetricData) {
        self.push(metric.clone(), None);
        self.notify(&metric);
        self.persist();
    }

    /// Record `name` for a session, creating its aggregate if needed
    pub fn record_session(&self, session_id: &str, name: &str, value: f64, unit: &str) {
        let metric = MetricData::new(name, value)
            .with_unit(unit)
            .with_metadata("session_id", session_id);
        self.push(metric.clone(), Some(session_id));
        self.notify(&metric);
        self.persist();
    }

    fn push(&self, metric: MetricData, session_id: Option<&str>) {
        let mut inner = self.inner.lock();
        if inner.history.len() == self.max_history {
            inner.history.pop_front();
        }
        if let Some(id) = session_id {
            inner
                .sessions
                .entry(id.to_string())
                .or_default()
                .apply(&metric.name, metric.value);
        }
        inner.history.push_back(metric);
    }

    fn notify(&self, metric: &MetricData) {
        let observers: Vec<(ObserverId, MetricObserver)> = self.observers.read().clone();

        for (id, observer) in observers {
            let result = call_isolated(AssertUnwindSafe(|| observer(metric)), |msg| {
                anyhow::anyhow!("observer panicked: {msg}")
            });
            if let Err(e) = result {
                tracing::warn!(observer = id.0, metric = %metric.name, error = %e, "Metric observer failed");
            }
        }
    }

    fn persist(&self) {
        if let Some(writer) = &self.snapshot_writer {
            writer.submit(|| self.snapshot());
        }
    }

    /// Wait until the snapshot file reflects everything recorded so far
    pub async fn flush_snapshot(&self) {
        if let Some(writer) = &self.snapshot_writer {
            writer.flush().await;
        }
    }

    /// Time-ordered metrics matching every supplied filter
    ///
    /// - `name`: exact metric name
    /// - `session_id`: exact `metadata.session_id`
    /// - `time_range`: only entries newer than `now - time_range`
    pub fn query(
        &self,
        name: Option<&str>,
        session_id: Option<&str>,
        time_range: Option<Duration>,
    ) -> Vec<MetricData> {
        let cutoff = time_range.and_then(|range| {
            chrono::Duration::from_std(range)
                .ok()
                .and_then(|range| Utc::now().checked_sub_signed(range))
        });

        let inner = self.inner.lock();
        inner
            .history
            .iter()
            .filter(|m| name.is_none_or(|n| m.name == n))
            .filter(|m| session_id.is_none_or(|id| m.session_id() == Some(id)))
            .filter(|m| cutoff.is_none_or(|c| m.timestamp > c))
            .cloned()
            .collect()
    }

    /// Mean value per metric name over the (optionally windowed) history
    pub fn average(&self, time_range: Option<Duration>) -> BTreeMap<String, f64> {
        let mut sums: BTreeMap<String, (f64, usize)> = BTreeMap::new();
        for metric in self.query(None, None, time_range) {
            let entry = sums.entry(metric.name).or_insert((0.0, 0));
            entry.0 += metric.value;
            entry.1 += 1;
        }
        sums.into_iter()
            .map(|(name, (sum, count))| (name, sum / count as f64))
            .collect()
    }

    /// Start (or restart) a fresh aggregate for a session
    pub fn start_session_tracking(&self, session_id: &str) {
        self.inner
            .lock()
            .sessions
            .insert(session_id.to_string(), PerformanceMetrics::default());
    }

    /// Drop a session's aggregate, returning its final value
    pub fn end_session_tracking(&self, session_id: &str) -> Option<PerformanceMetrics> {
        let removed = self.inner.lock().sessions.remove(session_id);
        if removed.is_some() {
            self.persist();
        }
        removed
    }

    pub fn session_metrics(&self, session_id: &str) -> Option<PerformanceMetrics> {
        self.inner.lock().sessions.get(session_id).cloned()
    }

    pub fn active_sessions(&self) -> BTreeMap<String, PerformanceMetrics> {
        self.inner
            .lock()
            .sessions
            .iter()
            .map(|(id, m)| (id.clone(), m.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current state in the shared-file format
    pub fn snapshot(&self) -> MetricsSnapshot {
        let inner = self.inner.lock();

        let count = |name: &str| inner.history.iter().filter(|m| m.name == name).count();
        let summary = MetricsSummary {
            total_metrics_count: inner.history.len(),
            connection_success: count(names::CONNECTION_SUCCESS),
            connection_errors: count(names::CONNECTION_ERROR),
            active_sessions_count: inner.sessions.len(),
        };

        let skip = inner.history.len().saturating_sub(SNAPSHOT_RECENT_METRICS);
        MetricsSnapshot {
            last_updated: Utc::now(),
            recent_metrics: inner.history.iter().skip(skip).cloned().collect(),
            active_sessions: inner
                .sessions
                .iter()
                .map(|(id, m)| (id.clone(), m.clone()))
                .collect(),
            summary,
        }
    }

    pub fn add_observer(&self, observer: MetricObserver) -> ObserverId {
        let id = ObserverId(self.next_observer.fetch_add(1, Ordering::Relaxed));
        self.observers.write().push((id, observer));
        id
    }

    /// Remove an observer; returns whether it was registered
    pub fn remove_observer(&self, id: ObserverId) -> bool {
        let mut observers = self.observers.write();
        let before = observers.len();
        observers.retain(|(existing, _)| *existing != id);
        observers.len() != before
    }

    /// Scope guard that records elapsed milliseconds under `name` when dropped
    pub fn timer(&self, name: impl Into<String>, session_id: Option<&str>) -> MetricsTimer<'_> {
        MetricsTimer::new(self, name, session_id)
    }
}
