mod auth;
mod error;
mod me;

use axum::Router;

use crate::session::SessionManager;

pub use auth::SessionState;
pub use error::ApiError;

/// Create the API router.
pub fn create_api_router(sessions: SessionManager, secure_cookies: bool) -> Router {
    let session_state = auth::SessionState {
        sessions,
        secure_cookies,
    };

    let me_state = me::MeState { secure_cookies };

    Router::new()
        .nest("/auth", auth::router(session_state))
        .nest("/me", me::router(me_state))
}
