//! Session API endpoints. Mounted under a public prefix, so the gate does not
//! verify tokens on these routes; each handler checks what it needs.
//!
//! - POST `/refresh` - Exchange the refresh token for a new session
//! - POST `/logout` - Revoke the session and clear cookies

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
};
use serde::Serialize;
use tracing::debug;

use super::error::ApiError;
use crate::auth::{REFRESH_COOKIE_NAME, get_access_token, get_cookie};
use crate::session::{SessionManager, clear_session_cookies};

#[derive(Clone)]
pub struct SessionState {
    pub sessions: SessionManager,
    pub secure_cookies: bool,
}

pub fn router(state: SessionState) -> Router {
    Router::new()
        .route("/refresh", post(refresh))
        .route("/logout", post(logout))
        .with_state(state)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshResponse {
    success: bool,
    expires_at: u64,
}

/// Issue a new access token (and rotate the refresh token) for a live session.
async fn refresh(State(state): State<SessionState>, headers: HeaderMap) -> Response {
    let refresh_token = get_cookie(&headers, REFRESH_COOKIE_NAME);
    let access_token = get_access_token(&headers);

    match state.sessions.refresh(refresh_token, access_token).await {
        Ok(session) => {
            let mut response = (
                StatusCode::OK,
                Json(RefreshResponse {
                    success: true,
                    expires_at: session.access.claims.expires_at,
                }),
            )
                .into_response();
            session.attach_cookies(response.headers_mut(), state.secure_cookies);
            response
        }
        Err(e) => {
            debug!(error = %e, "Refresh refused");
            let retriable = e.is_retriable();
            let mut response = ApiError::from(e).into_response();
            // A dead session cannot be revived; drop its cookies.
            if !retriable && response.status() == StatusCode::UNAUTHORIZED {
                clear_session_cookies(response.headers_mut(), state.secure_cookies);
            }
            response
        }
    }
}

/// Revoke the session named by the presented tokens and clear both cookies.
/// Tokens only need a genuine signature here; expired ones still log out.
async fn logout(State(state): State<SessionState>, headers: HeaderMap) -> Response {
    let subject = state.sessions.subject_of(
        get_cookie(&headers, REFRESH_COOKIE_NAME),
        get_access_token(&headers),
    );

    let result = match subject {
        Some(subject) => state.sessions.logout(&subject).await,
        None => Ok(()),
    };

    let mut response = match result {
        Ok(()) => (StatusCode::OK, Json(serde_json::json!({ "success": true }))).into_response(),
        Err(e) => ApiError::from(e).into_response(),
    };
    clear_session_cookies(response.headers_mut(), state.secure_cookies);
    response
}
