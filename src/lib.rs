pub mod api;
pub mod auth;
pub mod cleanup;
pub mod cli;
pub mod db;
pub mod jwt;
pub mod session;
pub mod signing;

use api::create_api_router;
use auth::{AuthGate, authenticate};
use axum::{Router, middleware};
use db::Database;
use jwt::TokenCodec;
use session::{SessionManager, TokenLifetimes};
use signing::SigningKey;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Default gate bypass prefix: the session endpoints.
pub const DEFAULT_PUBLIC_PREFIX: &str = "/api/auth/";

pub struct ServerConfig {
    /// Database connection (cloneable, uses connection pool internally)
    pub db: Database,
    /// Key used to sign and verify tokens
    pub signing_key: SigningKey,
    /// Access and refresh token lifetimes
    pub lifetimes: TokenLifetimes,
    /// Path prefixes the authentication gate skips
    pub public_prefixes: Vec<String>,
    /// Whether to set Secure flag on cookies (should be true in production with HTTPS)
    pub secure_cookies: bool,
}

/// The router plus the session manager handlers can use to start sessions.
pub struct App {
    pub router: Router,
    pub sessions: SessionManager,
}

/// Build the application: session API under `/api`, gate in front of everything.
///
/// Routes merged into the returned router afterwards are not behind the gate;
/// pass host routes to [`create_app_with`] instead.
pub fn create_app(config: &ServerConfig) -> App {
    create_app_with(config, Router::new())
}

/// Like [`create_app`], with additional host routes placed behind the gate.
pub fn create_app_with(config: &ServerConfig, routes: Router) -> App {
    let codec = Arc::new(TokenCodec::new(&config.signing_key));
    let sessions = SessionManager::new(codec.clone(), config.db.clone(), config.lifetimes);
    let gate = AuthGate::new(codec, config.public_prefixes.clone());

    let router = Router::new()
        .nest("/api", create_api_router(sessions.clone(), config.secure_cookies))
        .merge(routes)
        .layer(middleware::from_fn_with_state(gate, authenticate));

    App { router, sessions }
}

/// Purge expired refresh sessions. Call this before starting the server.
pub async fn init_cleanup(db: &Database) {
    cleanup::run_cleanup(db).await;
}

/// Run the server on the given listener. This function blocks until the server exits.
pub async fn run_server(config: ServerConfig, listener: TcpListener) -> Result<(), std::io::Error> {
    let app = create_app(&config);
    let make_service = app.router.into_make_service_with_connect_info::<SocketAddr>();
    axum::serve(listener, make_service).await
}

/// Start the server on the given port in a background task. Use port 0 to let the OS choose a random port.
/// Returns the actual address the server is listening on.
pub async fn start_server(
    config: ServerConfig,
    port: u16,
) -> Result<(tokio::task::JoinHandle<()>, SocketAddr), std::io::Error> {
    init_cleanup(&config.db).await;

    let addr = format!("127.0.0.1:{}", port);
    let listener = TcpListener::bind(&addr).await?;
    let local_addr = listener.local_addr()?;

    let handle = tokio::spawn(async move {
        if let Err(e) = run_server(config, listener).await {
            tracing::error!(error = %e, "Server error");
        }
    });

    Ok((handle, local_addr))
}
