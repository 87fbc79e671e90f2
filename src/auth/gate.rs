//! Per-request authentication gate.
//!
//! Runs as axum middleware on every request. It reads the access token,
//! verifies it, and records a [`GateOutcome`] in the request extensions for
//! the extractors to read. It never rejects a request itself: handlers that
//! need an identity do that through [`super::Auth`].

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use tracing::{debug, info, warn};

use super::cookie::get_access_token;
use super::types::{GateOutcome, Identity};
use crate::jwt::{InvalidReason, TokenCodec, Verification, now_secs};

/// Response header set when the presented access token had expired.
pub const TOKEN_EXPIRED_HEADER: &str = "x-token-expired";

/// Gate configuration: the codec and the public path prefixes.
#[derive(Clone)]
pub struct AuthGate {
    codec: Arc<TokenCodec>,
    public_prefixes: Arc<[String]>,
}

impl AuthGate {
    pub fn new(codec: Arc<TokenCodec>, public_prefixes: Vec<String>) -> Self {
        Self {
            codec,
            public_prefixes: public_prefixes.into(),
        }
    }

    pub fn is_public(&self, path: &str) -> bool {
        self.public_prefixes
            .iter()
            .any(|prefix| path.starts_with(prefix.as_str()))
    }

    /// Decide the outcome for a request with the given path and headers.
    pub fn evaluate(&self, path: &str, headers: &HeaderMap) -> GateOutcome {
        match now_secs() {
            Ok(now) => self.evaluate_at(path, headers, now),
            Err(e) => {
                warn!(error = %e, "Cannot read clock, treating request as anonymous");
                GateOutcome::NoToken
            }
        }
    }

    pub fn evaluate_at(&self, path: &str, headers: &HeaderMap, now: u64) -> GateOutcome {
        if self.is_public(path) {
            return GateOutcome::Bypassed;
        }

        let Some(token) = get_access_token(headers) else {
            debug!(path = %path, "No access token in request");
            return GateOutcome::NoToken;
        };

        match self.codec.check_at(token, now) {
            Verification::Valid(claims) => {
                debug!(subject = %claims.subject, "Access token verified");
                GateOutcome::Authenticated(Identity::from(claims))
            }
            Verification::Expired(claims) => {
                info!(
                    subject = %claims.subject,
                    expired_at = claims.expires_at,
                    "Access token expired"
                );
                GateOutcome::Expired
            }
            Verification::Invalid(reason) => {
                let reason = match reason {
                    InvalidReason::Signature => "signature mismatch",
                    InvalidReason::Malformed => "malformed",
                };
                warn!(path = %path, reason, "Rejected untrusted access token");
                GateOutcome::Invalid
            }
        }
    }
}

/// Middleware entry point. Install with
/// `axum::middleware::from_fn_with_state(gate, authenticate)`.
pub async fn authenticate(State(gate): State<AuthGate>, mut req: Request, next: Next) -> Response {
    let outcome = gate.evaluate(req.uri().path(), req.headers());
    let expired = outcome == GateOutcome::Expired;

    if let Some(identity) = outcome.identity() {
        req.extensions_mut().insert(identity.clone());
    }
    req.extensions_mut().insert(outcome);

    let mut response = next.run(req).await;
    if expired {
        response
            .headers_mut()
            .insert(TOKEN_EXPIRED_HEADER, HeaderValue::from_static("true"));
    }
    response
}
