//! LiveKit token generation handler
//!
//! The web client calls `GET /token?room=&identity=` before joining a room and
//! receives a signed JWT plus the LiveKit server URL to connect to.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use livekit_api::access_token::{AccessToken, AccessTokenError, VideoGrants};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};

use super::error_response;
use crate::config::LiveKitCredentials;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct TokenQuery {
    /// Room to join
    pub room: String,
    /// Participant identity
    pub identity: String,
}

/// # Example
/// ```json
/// {
///   "token": "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9...",
///   "url": "wss://example.livekit.cloud"
/// }
/// ```
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
    pub url: String,
}

/// Join-only permissions for a single room
fn participant_grants(room: &str) -> VideoGrants {
    VideoGrants {
        room: room.to_string(),
        room_join: true,
        room_create: false,
        can_publish: true,
        can_subscribe: true,
        ..Default::default()
    }
}

/// Sign a participant token for `room`
pub fn mint_token(
    credentials: &LiveKitCredentials<'_>,
    room: &str,
    identity: &str,
) -> Result<String, AccessTokenError> {
    AccessToken::with_api_key(credentials.api_key, credentials.api_secret)
        .with_identity(identity)
        .with_grants(participant_grants(room))
        .to_jwt()
}

/// Handler for GET /token
///
/// # Errors
/// * 400 Bad Request - empty `room` or `identity`
/// * 500 Internal Server Error - LiveKit credentials unset or signing failed
pub async fn create_token(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TokenQuery>,
) -> Response {
    let Some(credentials) = state.config.livekit_credentials() else {
        error!("LiveKit credentials not configured");
        return error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "LiveKit environment not configured (LIVEKIT_URL, LIVEKIT_API_KEY, LIVEKIT_API_SECRET)",
        );
    };

    if query.room.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "Invalid request: room cannot be empty");
    }
    if query.identity.trim().is_empty() {
        return error_response(
            StatusCode::BAD_REQUEST,
            "Invalid request: identity cannot be empty",
        );
    }

    match mint_token(&credentials, &query.room, &query.identity) {
        Ok(token) => {
            info!(room = %query.room, identity = %query.identity, "Token generated");
            Json(TokenResponse {
                token,
                url: credentials.url.to_string(),
            })
            .into_response()
        }
        Err(e) => {
            error!(error = %e, "Failed to generate LiveKit token");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to generate LiveKit token: {e}"),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grants_are_join_only() {
        let grants = participant_grants("lobby");
        assert_eq!(grants.room, "lobby");
        assert!(grants.room_join);
        assert!(!grants.room_create);
        assert!(!grants.room_admin);
        assert!(grants.can_publish);
        assert!(grants.can_subscribe);
    }

    #[test]
    fn test_mint_token_is_a_jwt() {
        let credentials = LiveKitCredentials {
            url: "wss://example.livekit.cloud",
            api_key: "devkey",
            api_secret: "a-secret-that-is-long-enough-for-hmac",
        };
        let token = mint_token(&credentials, "lobby", "alice").unwrap();
        assert_eq!(token.split('.').count(), 3);
    }
}
