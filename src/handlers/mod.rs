//! HTTP request handlers
//!
//! - `token` - LiveKit room token minting
//! - `metrics` - Metrics snapshot and per-session aggregates
//! - `providers` - Registered providers and plugins

pub mod metrics;
pub mod providers;
pub mod token;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};

/// Body of every error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub(crate) fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}
