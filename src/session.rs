//! Login, refresh and logout flows.
//!
//! The codec is the authority on token integrity, the refresh session store
//! on session validity. A refresh succeeds only when both agree.

use std::sync::Arc;

use axum::http::HeaderMap;
use tracing::{error, info, warn};

use crate::auth::{ACCESS_COOKIE_NAME, REFRESH_COOKIE_NAME, attach_cookie, expire_cookie};
use crate::db::Database;
use crate::jwt::{
    ACCESS_TOKEN_DURATION_SECS, IssuedToken, REFRESH_TOKEN_DURATION_SECS, TokenCodec, TokenError,
    now_secs,
};

/// Token lifetimes in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenLifetimes {
    pub access: u64,
    pub refresh: u64,
}

impl Default for TokenLifetimes {
    fn default() -> Self {
        Self {
            access: ACCESS_TOKEN_DURATION_SECS,
            refresh: REFRESH_TOKEN_DURATION_SECS,
        }
    }
}

/// Access and refresh token issued together.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub access: IssuedToken,
    pub refresh: IssuedToken,
}

impl IssuedSession {
    /// Attach both tokens as cookies, each living as long as its token.
    pub fn attach_cookies(&self, headers: &mut HeaderMap, secure: bool) {
        attach_cookie(
            headers,
            ACCESS_COOKIE_NAME,
            &self.access.token,
            self.access.duration,
            secure,
        );
        attach_cookie(
            headers,
            REFRESH_COOKIE_NAME,
            &self.refresh.token,
            self.refresh.duration,
            secure,
        );
    }
}

/// Expire both token cookies.
pub fn clear_session_cookies(headers: &mut HeaderMap, secure: bool) {
    expire_cookie(headers, ACCESS_COOKIE_NAME, secure);
    expire_cookie(headers, REFRESH_COOKIE_NAME, secure);
}

/// Issues sessions and runs the refresh exchange.
#[derive(Clone)]
pub struct SessionManager {
    codec: Arc<TokenCodec>,
    db: Database,
    lifetimes: TokenLifetimes,
}

impl SessionManager {
    pub fn new(codec: Arc<TokenCodec>, db: Database, lifetimes: TokenLifetimes) -> Self {
        Self {
            codec,
            db,
            lifetimes,
        }
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    pub fn lifetimes(&self) -> TokenLifetimes {
        self.lifetimes
    }

    /// Start a session for an authenticated login. Replaces any previous
    /// session of the same subject.
    pub async fn login(&self, subject: &str, member_id: i64) -> Result<IssuedSession, SessionError> {
        self.login_at(subject, member_id, now_secs().map_err(SessionError::Issue)?)
            .await
    }

    pub async fn login_at(
        &self,
        subject: &str,
        member_id: i64,
        now: u64,
    ) -> Result<IssuedSession, SessionError> {
        let session = self.issue_pair(subject, member_id, now)?;

        self.db
            .refresh_sessions()
            .put_at(subject, &session.refresh.token, self.lifetimes.refresh, now)
            .await
            .map_err(store_unavailable)?;

        info!(subject = %subject, "Session started");
        Ok(session)
    }

    /// Exchange a refresh token for a new session.
    ///
    /// The subject is taken from the presented refresh token, which must be
    /// the one on record. Without one, it is taken from the access token
    /// (signature checked, expiry ignored), which must have been issued
    /// alongside the refresh token on record; that refresh token must still
    /// verify. Both tokens are rotated on success.
    pub async fn refresh(
        &self,
        refresh_token: Option<&str>,
        access_token: Option<&str>,
    ) -> Result<IssuedSession, SessionError> {
        let now = now_secs().map_err(SessionError::Issue)?;
        self.refresh_at(refresh_token, access_token, now).await
    }

    pub async fn refresh_at(
        &self,
        refresh_token: Option<&str>,
        access_token: Option<&str>,
        now: u64,
    ) -> Result<IssuedSession, SessionError> {
        let store = self.db.refresh_sessions();

        let (claims, stored) = match (refresh_token, access_token) {
            (Some(presented), _) => {
                let claims = self
                    .codec
                    .verify_at(presented, now)
                    .map_err(SessionError::InvalidToken)?;
                let stored = store
                    .get_at(&claims.subject, now)
                    .await
                    .map_err(store_unavailable)?
                    .ok_or(SessionError::NoSession)?;
                if stored != presented {
                    warn!(subject = %claims.subject, "Superseded refresh token presented");
                    return Err(SessionError::SessionRevoked);
                }
                (claims, stored)
            }
            (None, Some(access)) => {
                let presented = self
                    .codec
                    .inspect(access)
                    .map_err(SessionError::InvalidToken)?;
                let stored = store
                    .get_at(&presented.subject, now)
                    .await
                    .map_err(store_unavailable)?
                    .ok_or(SessionError::NoSession)?;
                let claims = self
                    .codec
                    .verify_at(&stored, now)
                    .map_err(SessionError::InvalidToken)?;
                // A pair is issued together; only the access token of the
                // session on record may stand in for its refresh token.
                if claims.issued_at != presented.issued_at {
                    warn!(subject = %presented.subject, "Access token from a superseded session presented");
                    return Err(SessionError::SessionRevoked);
                }
                (claims, stored)
            }
            (None, None) => return Err(SessionError::NotAuthenticated),
        };

        let session = self.issue_pair(&claims.subject, claims.member_id, now)?;

        let replaced = store
            .replace_at(
                &claims.subject,
                &stored,
                &session.refresh.token,
                self.lifetimes.refresh,
                now,
            )
            .await
            .map_err(store_unavailable)?;
        if !replaced {
            warn!(subject = %claims.subject, "Session changed during refresh");
            return Err(SessionError::SessionRevoked);
        }

        info!(subject = %claims.subject, "Session refreshed");
        Ok(session)
    }

    /// Revoke the subject's session. Idempotent.
    pub async fn logout(&self, subject: &str) -> Result<(), SessionError> {
        let removed = self
            .db
            .refresh_sessions()
            .delete(subject)
            .await
            .map_err(store_unavailable)?;

        info!(subject = %subject, removed, "Session revoked");
        Ok(())
    }

    /// Subject named by either token, provided its signature is genuine.
    /// Expired tokens still name their subject.
    pub fn subject_of(&self, refresh_token: Option<&str>, access_token: Option<&str>) -> Option<String> {
        [refresh_token, access_token]
            .into_iter()
            .flatten()
            .find_map(|token| self.codec.inspect(token).ok())
            .map(|claims| claims.subject)
    }

    fn issue_pair(&self, subject: &str, member_id: i64, now: u64) -> Result<IssuedSession, SessionError> {
        let access = self
            .codec
            .issue_at(subject, member_id, self.lifetimes.access, now)
            .map_err(SessionError::Issue)?;
        let refresh = self
            .codec
            .issue_at(subject, member_id, self.lifetimes.refresh, now)
            .map_err(SessionError::Issue)?;
        Ok(IssuedSession { access, refresh })
    }
}

fn store_unavailable(e: sqlx::Error) -> SessionError {
    error!(error = %e, "Refresh session store unavailable");
    SessionError::StoreUnavailable(e)
}

/// Errors from the session flows.
#[derive(Debug)]
pub enum SessionError {
    /// Neither a refresh nor an access token was presented
    NotAuthenticated,
    /// No live session on record for the subject
    NoSession,
    /// The presented refresh token is no longer the one on record
    SessionRevoked,
    /// A presented or stored token failed verification
    InvalidToken(TokenError),
    /// Token issuance failed
    Issue(TokenError),
    /// The session store could not be reached; retry later
    StoreUnavailable(sqlx::Error),
}

impl SessionError {
    pub fn is_retriable(&self) -> bool {
        matches!(self, SessionError::StoreUnavailable(_))
    }
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionError::NotAuthenticated => write!(f, "No token presented"),
            SessionError::NoSession => write!(f, "No active session"),
            SessionError::SessionRevoked => write!(f, "Session has been revoked"),
            SessionError::InvalidToken(e) => write!(f, "Token rejected: {}", e),
            SessionError::Issue(e) => write!(f, "Failed to issue token: {}", e),
            SessionError::StoreUnavailable(e) => write!(f, "Session store unavailable: {}", e),
        }
    }
}

impl std::error::Error for SessionError {}
