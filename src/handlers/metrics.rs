//! Metrics endpoints
//!
//! The agent worker may run in another process, so both endpoints read the
//! shared snapshot file first. When the file is missing or unreadable they
//! fall back to this process's collector, and when that has seen nothing
//! either they report `not_connected` instead of failing.

use axum::{extract::State, response::Json};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use crate::metrics::{MetricsSnapshot, MetricsSummary, PerformanceMetrics};
use crate::state::AppState;

const NOT_CONNECTED_MESSAGE: &str = "No metrics available yet: the agent worker has not reported any data";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricsSource {
    SharedFile,
    Collector,
}

#[derive(Debug, Serialize)]
pub struct MetricsResponse {
    pub status: &'static str,
    pub source: MetricsSource,
    #[serde(flatten)]
    pub snapshot: MetricsSnapshot,
}

#[derive(Debug, Serialize)]
pub struct NotConnectedResponse {
    pub status: &'static str,
    pub message: &'static str,
    pub recent_metrics: Vec<()>,
    pub active_sessions: BTreeMap<String, PerformanceMetrics>,
    pub summary: MetricsSummary,
}

impl Default for NotConnectedResponse {
    fn default() -> Self {
        Self {
            status: "not_connected",
            message: NOT_CONNECTED_MESSAGE,
            recent_metrics: Vec::new(),
            active_sessions: BTreeMap::new(),
            summary: MetricsSummary::default(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SessionEntry {
    pub session_id: String,
    pub metrics: PerformanceMetrics,
}

#[derive(Debug, Serialize)]
pub struct SessionsResponse {
    pub status: &'static str,
    pub source: Option<MetricsSource>,
    pub count: usize,
    pub sessions: Vec<SessionEntry>,
}

async fn read_snapshot_file(path: &Path) -> Option<MetricsSnapshot> {
    let contents = match tokio::fs::read_to_string(path).await {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Failed to read metrics file");
            return None;
        }
    };

    match serde_json::from_str(&contents) {
        Ok(snapshot) => Some(snapshot),
        Err(e) => {
            // A concurrent writer can leave a torn document behind
            tracing::warn!(path = %path.display(), error = %e, "Ignoring unreadable metrics file");
            None
        }
    }
}

/// Snapshot from the first tier that has one
async fn load_snapshot(state: &AppState) -> Option<(MetricsSource, MetricsSnapshot)> {
    if let Some(path) = &state.config.metrics_file {
        if let Some(snapshot) = read_snapshot_file(path).await {
            return Some((MetricsSource::SharedFile, snapshot));
        }
    }

    let collector = state.runtime.metrics();
    if collector.is_empty() && collector.active_sessions().is_empty() {
        return None;
    }
    Some((MetricsSource::Collector, collector.snapshot()))
}

/// Handler for GET /metrics
pub async fn get_metrics(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let body = match load_snapshot(&state).await {
        Some((source, snapshot)) => serde_json::to_value(MetricsResponse {
            status: "ok",
            source,
            snapshot,
        }),
        None => serde_json::to_value(NotConnectedResponse::default()),
    };

    Json(body.unwrap_or_else(|e| {
        tracing::error!(error = %e, "Failed to serialize metrics");
        serde_json::json!({"status": "error", "message": e.to_string()})
    }))
}

/// Handler for GET /metrics/sessions
pub async fn get_session_metrics(State(state): State<Arc<AppState>>) -> Json<SessionsResponse> {
    let Some((source, snapshot)) = load_snapshot(&state).await else {
        return Json(SessionsResponse {
            status: "not_connected",
            source: None,
            count: 0,
            sessions: Vec::new(),
        });
    };

    let sessions: Vec<SessionEntry> = snapshot
        .active_sessions
        .into_iter()
        .map(|(session_id, metrics)| SessionEntry {
            session_id,
            metrics,
        })
        .collect();

    Json(SessionsResponse {
        status: "ok",
        source: Some(source),
        count: sessions.len(),
        sessions,
    })
}
