//! HTTP surface tests
//!
//! Drive the full router (API routes plus static fallback) with `oneshot`.

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::Value;
use std::sync::Arc;
use tempfile::TempDir;
use tower::util::ServiceExt;

use waav_agent::config::AgentConfiguration;
use waav_agent::metrics::MetricData;
use waav_agent::{ServerConfig, routes, state::AppState};

fn test_config(dir: &TempDir) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        livekit_url: None,
        livekit_api_key: None,
        livekit_api_secret: None,
        static_dir: dir.path().join("client"),
        agent_config_path: dir.path().join("agent_config.json"),
        metrics_file: None,
        metrics_max_history: 100,
    }
}

fn with_livekit(config: ServerConfig) -> ServerConfig {
    ServerConfig {
        livekit_url: Some("wss://example.livekit.cloud".to_string()),
        livekit_api_key: Some("test-api-key".to_string()),
        livekit_api_secret: Some("test-api-secret-long-enough-for-signing".to_string()),
        ..config
    }
}

fn app(state: Arc<AppState>) -> Router {
    routes::create_app(state)
}

async fn get(app: Router, uri: &str) -> (StatusCode, Vec<u8>) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, body.to_vec())
}

async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
    let (status, body) = get(app, uri).await;
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn test_token_requires_livekit_credentials() {
    let dir = TempDir::new().unwrap();
    let state = AppState::new(test_config(&dir)).unwrap();

    let (status, body) = get_json(app(state), "/token?room=lobby&identity=alice").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("LIVEKIT_URL"));
}

#[tokio::test]
async fn test_token_issued_with_url() {
    let dir = TempDir::new().unwrap();
    let state = AppState::new(with_livekit(test_config(&dir))).unwrap();

    let (status, body) = get_json(app(state), "/token?room=lobby&identity=alice").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["url"], "wss://example.livekit.cloud");
    assert_eq!(body["token"].as_str().unwrap().split('.').count(), 3);
}

#[tokio::test]
async fn test_token_rejects_missing_or_empty_params() {
    let dir = TempDir::new().unwrap();
    let state = AppState::new(with_livekit(test_config(&dir))).unwrap();

    let (status, _) = get(app(state.clone()), "/token?room=lobby").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = get_json(app(state), "/token?room=&identity=alice").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("room"));
}

#[tokio::test]
async fn test_metrics_not_connected_then_collector() {
    let dir = TempDir::new().unwrap();
    let state = AppState::new(test_config(&dir)).unwrap();

    let (status, body) = get_json(app(state.clone()), "/metrics").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "not_connected");
    assert_eq!(body["summary"]["total_metrics_count"], 0);

    state
        .runtime
        .metrics()
        .record(MetricData::count("connection_success"));

    let (_, body) = get_json(app(state), "/metrics").await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["source"], "collector");
    assert_eq!(body["summary"]["connection_success"], 1);
    assert_eq!(body["recent_metrics"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_metrics_prefers_shared_file() {
    let dir = TempDir::new().unwrap();
    let config = ServerConfig {
        metrics_file: Some(dir.path().join("shared_metrics.json")),
        ..test_config(&dir)
    };
    let state = AppState::new(config).unwrap();

    // Recording queues a snapshot write
    let metrics = state.runtime.metrics();
    metrics.record_session("lobby_1", "stt_latency", 42.0, "ms");
    metrics.flush_snapshot().await;

    let (_, body) = get_json(app(state.clone()), "/metrics").await;
    assert_eq!(body["source"], "shared_file");
    assert_eq!(body["active_sessions"]["lobby_1"]["stt_latency"], 42.0);

    // A torn file falls back to the collector
    std::fs::write(dir.path().join("shared_metrics.json"), "{\"last_upd").unwrap();
    let (_, body) = get_json(app(state), "/metrics").await;
    assert_eq!(body["source"], "collector");
}

#[tokio::test]
async fn test_metrics_sessions_lists_active_sessions() {
    let dir = TempDir::new().unwrap();
    let state = AppState::new(test_config(&dir)).unwrap();

    let (_, body) = get_json(app(state.clone()), "/metrics/sessions").await;
    assert_eq!(body["status"], "not_connected");
    assert_eq!(body["count"], 0);

    let sessions = state.runtime.sessions();
    let (_, id) = sessions
        .create_session("demo", &AgentConfiguration::default(), None)
        .unwrap();
    sessions
        .metrics()
        .record_session(&id, "llm_latency", 120.0, "ms");

    let (_, body) = get_json(app(state.clone()), "/metrics/sessions").await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["sessions"][0]["session_id"], id.as_str());
    assert_eq!(body["sessions"][0]["metrics"]["llm_latency"], 120.0);

    sessions.cleanup_session(&id);
    let (_, body) = get_json(app(state), "/metrics/sessions").await;
    assert_eq!(body["count"], 0);
}

#[tokio::test]
async fn test_providers_and_plugins() {
    let dir = TempDir::new().unwrap();
    let state = AppState::new(test_config(&dir)).unwrap();

    let (status, body) = get_json(app(state.clone()), "/providers").await;
    assert_eq!(status, StatusCode::OK);
    let llm = body["providers"]["llm"].as_array().unwrap();
    assert!(llm.iter().any(|p| p["name"] == "openai"));
    assert!(body["providers"]["vad"].as_array().unwrap().iter().any(|p| p["name"] == "silero"));
    assert!(body["active"]["tts"]["provider"].is_string());

    let (status, body) = get_json(app(state), "/plugins").await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body["plugins"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|p| p["name"].as_str())
        .collect();
    for expected in ["conversation_memory", "example", "profanity_filter", "sentiment_analysis"] {
        assert!(names.contains(&expected), "{expected} missing from {names:?}");
    }
}

#[tokio::test]
async fn test_static_files_served_after_api_routes() {
    let dir = TempDir::new().unwrap();
    let client = dir.path().join("client");
    std::fs::create_dir_all(&client).unwrap();
    std::fs::write(client.join("index.html"), "<h1>voice client</h1>").unwrap();
    // A file named like an API route must not shadow it
    std::fs::write(client.join("metrics"), "static").unwrap();

    let state = AppState::new(test_config(&dir)).unwrap();

    let (status, body) = get(app(state.clone()), "/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"<h1>voice client</h1>");

    let (_, body) = get_json(app(state.clone()), "/metrics").await;
    assert_eq!(body["status"], "not_connected");

    let (status, _) = get(app(state), "/missing.js").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
