//! Shared error handling for API endpoints.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::error;

use crate::session::SessionError;

/// API error type with automatic response conversion.
#[derive(Debug)]
pub enum ApiError {
    Unauthorized {
        message: &'static str,
        code: &'static str,
    },
    ServiceUnavailable(String),
    Internal(String),
}

impl ApiError {
    pub fn unauthorized(message: &'static str, code: &'static str) -> Self {
        Self::Unauthorized { message, code }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

impl From<SessionError> for ApiError {
    fn from(e: SessionError) -> Self {
        match e {
            SessionError::NotAuthenticated => {
                ApiError::unauthorized("No token presented", "not_authenticated")
            }
            SessionError::NoSession => ApiError::unauthorized("No active session", "no_session"),
            SessionError::SessionRevoked => {
                ApiError::unauthorized("Session has been revoked", "session_revoked")
            }
            SessionError::InvalidToken(e) if e.is_expired() => {
                ApiError::unauthorized("Refresh token expired", "refresh_expired")
            }
            SessionError::InvalidToken(_) => ApiError::unauthorized("Invalid token", "invalid_token"),
            SessionError::Issue(e) => {
                error!(error = %e, "Failed to issue token");
                ApiError::internal("Failed to issue token")
            }
            SessionError::StoreUnavailable(_) => {
                ApiError::ServiceUnavailable("Session store unavailable, retry later".into())
            }
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<&'static str>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, code) = match self {
            ApiError::Unauthorized { message, code } => {
                (StatusCode::UNAUTHORIZED, message.to_string(), Some(code))
            }
            ApiError::ServiceUnavailable(msg) => {
                (StatusCode::SERVICE_UNAVAILABLE, msg, Some("store_unavailable"))
            }
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg, None),
        };
        (status, Json(ErrorResponse { error, code })).into_response()
    }
}
