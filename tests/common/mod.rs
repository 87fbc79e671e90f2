#![allow(dead_code)]

use axum::{
    Json, Router,
    body::Body,
    http::{Request, Response},
    routing::get,
};
use base64::{Engine, engine::general_purpose::STANDARD};
use tollgate::{
    App, ServerConfig,
    auth::{Auth, MaybeAuth},
    create_app_with,
    db::Database,
    impl_has_auth_settings,
    jwt::TokenCodec,
    session::TokenLifetimes,
    signing::SigningKey,
};

pub fn test_key() -> SigningKey {
    SigningKey::from_base64(&STANDARD.encode(b"test-signing-key-for-integration-tests-0123456789"))
        .expect("valid test key")
}

pub fn test_codec() -> TokenCodec {
    TokenCodec::new(&test_key())
}

pub fn now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_secs()
}

#[derive(Clone)]
struct HostState {
    secure_cookies: bool,
}

impl_has_auth_settings!(HostState);

/// Host routes standing in for the business endpoints behind the gate.
fn host_routes() -> Router {
    Router::new()
        .route(
            "/api/business",
            get(|Auth(identity): Auth| async move { Json(identity) }),
        )
        .route(
            "/api/public-info",
            get(|MaybeAuth(identity): MaybeAuth| async move {
                match identity {
                    Some(identity) => format!("hello {}", identity.subject),
                    None => "hello anonymous".to_string(),
                }
            }),
        )
        .with_state(HostState {
            secure_cookies: false,
        })
}

/// Create a test app and return (app, db).
pub async fn create_test_app() -> (App, Database) {
    let db = Database::open(":memory:")
        .await
        .expect("Failed to open test database");
    let config = ServerConfig {
        db: db.clone(),
        signing_key: test_key(),
        lifetimes: TokenLifetimes::default(),
        public_prefixes: vec!["/api/auth/".to_string()],
        secure_cookies: false,
    };
    (create_app_with(&config, host_routes()), db)
}

pub fn get_with_cookie(uri: &str, cookie: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .header("cookie", cookie)
        .body(Body::empty())
        .unwrap()
}

pub fn post_with_cookie(uri: &str, cookie: &str) -> Request<Body> {
    let builder = Request::builder().method("POST").uri(uri);
    let builder = if cookie.is_empty() {
        builder
    } else {
        builder.header("cookie", cookie)
    };
    builder.body(Body::empty()).unwrap()
}

/// Extract Set-Cookie headers from response
pub fn extract_set_cookies(response: &Response<Body>) -> Vec<String> {
    response
        .headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .collect()
}

/// Check if cookies contain a token being cleared (Max-Age=0)
pub fn has_cleared_cookie(cookies: &[String], cookie_name: &str) -> bool {
    cookies
        .iter()
        .any(|c| c.starts_with(&format!("{}=;", cookie_name)) && c.contains("Max-Age=0"))
}

/// Value of a cookie being set (not cleared)
pub fn new_cookie_value(cookies: &[String], cookie_name: &str) -> Option<String> {
    let prefix = format!("{}=", cookie_name);
    cookies
        .iter()
        .filter(|c| !c.contains("Max-Age=0"))
        .find_map(|c| c.strip_prefix(&prefix))
        .and_then(|rest| rest.split(';').next())
        .map(|v| v.to_string())
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}
