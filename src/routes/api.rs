use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::handlers::{metrics, providers, token};
use crate::state::AppState;
use std::sync::Arc;

/// Create the API router
///
/// Static files are mounted behind these routes in [`super::create_app`].
pub fn create_api_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/token", get(token::create_token))
        .route("/metrics", get(metrics::get_metrics))
        .route("/metrics/sessions", get(metrics::get_session_metrics))
        .route("/providers", get(providers::list_providers))
        .route("/plugins", get(providers::list_plugins))
        .layer(TraceLayer::new_for_http())
}
