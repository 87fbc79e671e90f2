//! Identity endpoint.
//!
//! - GET `/` - Return the caller's identity; 401 when anonymous

use axum::{Json, Router, routing::get};

use crate::auth::{Auth, Identity};
use crate::impl_has_auth_settings;

#[derive(Clone)]
pub struct MeState {
    pub secure_cookies: bool,
}

impl_has_auth_settings!(MeState);

pub fn router(state: MeState) -> Router {
    Router::new().route("/", get(me)).with_state(state)
}

async fn me(Auth(identity): Auth) -> Json<Identity> {
    Json(identity)
}
