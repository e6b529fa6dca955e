pub mod api;

use axum::Router;
use std::sync::Arc;
use tower_http::services::ServeDir;

use crate::state::AppState;

/// Full application: API routes first, static client files as the fallback
pub fn create_app(state: Arc<AppState>) -> Router {
    let static_files = ServeDir::new(&state.config.static_dir);

    api::create_api_router()
        .fallback_service(static_files)
        .with_state(state)
}
