//! Authentication error types.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use super::cookie::{ACCESS_COOKIE_NAME, expire_cookie};
use super::types::GateOutcome;

/// Why a request could not be given an identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthErrorKind {
    NotAuthenticated,
    TokenExpired,
    InvalidToken,
}

impl AuthErrorKind {
    /// Rejection kind for a gate outcome without identity.
    pub fn from_outcome(outcome: Option<&GateOutcome>) -> Self {
        match outcome {
            Some(GateOutcome::Expired) => AuthErrorKind::TokenExpired,
            Some(GateOutcome::Invalid) => AuthErrorKind::InvalidToken,
            _ => AuthErrorKind::NotAuthenticated,
        }
    }
}

/// API authentication error (JSON body, 401).
#[derive(Debug)]
pub struct ApiAuthError {
    pub(super) kind: AuthErrorKind,
    pub(super) secure_cookies: bool,
}

impl ApiAuthError {
    pub fn kind(&self) -> AuthErrorKind {
        self.kind
    }

    fn message(&self) -> &'static str {
        match self.kind {
            AuthErrorKind::NotAuthenticated => "Not authenticated",
            AuthErrorKind::TokenExpired => "Access token expired",
            AuthErrorKind::InvalidToken => "Invalid token",
        }
    }

    fn code(&self) -> &'static str {
        match self.kind {
            AuthErrorKind::NotAuthenticated => "not_authenticated",
            AuthErrorKind::TokenExpired => "token_expired",
            AuthErrorKind::InvalidToken => "invalid_token",
        }
    }
}

impl IntoResponse for ApiAuthError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            error: &'static str,
            code: &'static str,
        }

        let mut response = (
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse {
                error: self.message(),
                code: self.code(),
            }),
        )
            .into_response();

        // An expired cookie is still needed by the refresh exchange.
        if self.kind == AuthErrorKind::InvalidToken {
            expire_cookie(response.headers_mut(), ACCESS_COOKIE_NAME, self.secure_cookies);
        }

        response
    }
}
