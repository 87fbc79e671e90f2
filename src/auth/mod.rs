//! Token authentication for API routes.
//!
//! Dual-token system: short-lived access tokens (15 min, stateless) carried
//! in the `accessToken` cookie, and long-lived refresh tokens (3 days) whose
//! single live copy per subject is held in the refresh session store.
//! The gate middleware verifies the access token on every request; extractors
//! hand the resulting identity to handlers.

mod cookie;
mod errors;
mod extractors;
mod gate;
mod state;
mod types;

pub use cookie::{
    ACCESS_COOKIE_NAME, REFRESH_COOKIE_NAME, attach_cookie, build_cookie, expire_cookie,
    get_access_token, get_bearer_token, get_cookie,
};
pub use errors::{ApiAuthError, AuthErrorKind};
pub use extractors::{Auth, MaybeAuth};
pub use gate::{AuthGate, TOKEN_EXPIRED_HEADER, authenticate};
pub use state::HasAuthSettings;
pub use types::{GateOutcome, Identity};
