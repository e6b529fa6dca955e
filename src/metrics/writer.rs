//! Background writer for the shared snapshot file
//!
//! Recording a metric only stores the newest snapshot here. A single drain
//! loop, run on tokio's blocking pool, writes whatever is pending and stops
//! when nothing new arrived, so bursts of metrics collapse into few writes
//! and the file never goes backwards. Outside a runtime the drain runs inline.

use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Notify;

use super::MetricsSnapshot;
use crate::utils::write_json_snapshot;

#[derive(Default)]
struct WriterState {
    pending: Option<MetricsSnapshot>,
    running: bool,
}

pub(super) struct SnapshotWriter {
    path: PathBuf,
    state: Mutex<WriterState>,
    idle: Notify,
}

impl SnapshotWriter {
    pub(super) fn new(path: PathBuf) -> Self {
        Self {
            path,
            state: Mutex::new(WriterState::default()),
            idle: Notify::new(),
        }
    }

    pub(super) fn path(&self) -> &Path {
        &self.path
    }

    /// Queue the snapshot built by `build`, replacing any unwritten one
    ///
    /// `build` runs under the writer lock, so a later submit always queues a
    /// snapshot at least as new as an earlier one.
    pub(super) fn submit(self: &Arc<Self>, build: impl FnOnce() -> MetricsSnapshot) {
        {
            let mut state = self.state.lock();
            state.pending = Some(build());
            if state.running {
                return;
            }
            state.running = true;
        }

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let writer = self.clone();
                handle.spawn_blocking(move || writer.drain());
            }
            Err(_) => self.drain(),
        }
    }

    fn drain(&self) {
        loop {
            let snapshot = {
                let mut state = self.state.lock();
                match state.pending.take() {
                    Some(snapshot) => snapshot,
                    None => {
                        state.running = false;
                        break;
                    }
                }
            };

            if let Err(e) = write_json_snapshot(&self.path, &snapshot) {
                tracing::warn!(path = %self.path.display(), error = %e, "Failed to write metrics snapshot");
            }
        }
        self.idle.notify_waiters();
    }

    /// Wait until every queued snapshot is on disk
    pub(super) async fn flush(&self) {
        loop {
            let idle = self.idle.notified();
            if !self.state.lock().running {
                return;
            }
            idle.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    use crate::metrics::MetricsSummary;

    fn snapshot(total: usize) -> MetricsSnapshot {
        MetricsSnapshot {
            last_updated: Utc::now(),
            recent_metrics: Vec::new(),
            active_sessions: BTreeMap::new(),
            summary: MetricsSummary {
                total_metrics_count: total,
                ..MetricsSummary::default()
            },
        }
    }

    fn read_total(path: &Path) -> u64 {
        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        raw["summary"]["total_metrics_count"].as_u64().unwrap()
    }

    #[test]
    fn test_inline_write_without_runtime() {
        let dir = TempDir::new().unwrap();
        let writer = Arc::new(SnapshotWriter::new(dir.path().join("m.json")));

        writer.submit(|| snapshot(3));
        assert_eq!(read_total(writer.path()), 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_burst_ends_on_latest_snapshot() {
        let dir = TempDir::new().unwrap();
        let writer = Arc::new(SnapshotWriter::new(dir.path().join("m.json")));

        for total in 1..=200 {
            writer.submit(|| snapshot(total));
        }
        writer.flush().await;

        assert_eq!(read_total(writer.path()), 200);
        assert!(!writer.state.lock().running);
    }

    #[tokio::test]
    async fn test_flush_when_idle_returns() {
        let dir = TempDir::new().unwrap();
        let writer = SnapshotWriter::new(dir.path().join("m.json"));
        writer.flush().await;
        assert!(!writer.path().exists());
    }
}
