//! Axum extractors for the identity established by the gate.

use axum::{extract::FromRequestParts, http::request::Parts};

use super::errors::{ApiAuthError, AuthErrorKind};
use super::state::HasAuthSettings;
use super::types::{GateOutcome, Identity};

/// Extractor for endpoints that require an identity.
/// Rejects with 401; an expired token is reported as `token_expired`.
pub struct Auth(pub Identity);

impl<S> FromRequestParts<S> for Auth
where
    S: HasAuthSettings + Send + Sync,
{
    type Rejection = ApiAuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(identity) = parts.extensions.get::<Identity>() {
            return Ok(Auth(identity.clone()));
        }

        let outcome = parts.extensions.get::<GateOutcome>();
        if outcome.is_none() {
            tracing::warn!(path = %parts.uri.path(), "Auth extractor used on a route without the gate");
        }

        Err(ApiAuthError {
            kind: AuthErrorKind::from_outcome(outcome),
            secure_cookies: state.secure_cookies(),
        })
    }
}

/// Optional authentication extractor - never fails.
/// Useful for endpoints that work both authenticated and anonymous.
pub struct MaybeAuth(pub Option<Identity>);

impl<S> FromRequestParts<S> for MaybeAuth
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeAuth(parts.extensions.get::<Identity>().cloned()))
    }
}
