use std::net::SocketAddr;

use clap::Parser;
use tollgate::cli::{
    Args, build_config, init_logging, load_signing_key, open_database, validate_lifetimes,
};
use tollgate::signing::generate_secret;
use tollgate::{create_app, init_cleanup};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let args = Args::parse();

    if args.generate_secret {
        println!("{}", generate_secret());
        return;
    }

    init_logging(&args.log_format);

    let Some(signing_key) = load_signing_key(args.jwt_secret_file.as_deref()) else {
        std::process::exit(1);
    };

    let Some(lifetimes) = validate_lifetimes(args.access_ttl, args.refresh_ttl) else {
        std::process::exit(1);
    };

    let Some(db) = open_database(&args.database).await else {
        std::process::exit(1);
    };

    init_cleanup(&db).await;

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| {
            error!(address = %addr, error = %e, "Failed to bind");
            std::process::exit(1);
        });

    let local_addr = listener.local_addr().unwrap_or_else(|e| {
        error!(error = %e, "Failed to read local address");
        std::process::exit(1);
    });

    let config = build_config(
        db,
        signing_key,
        lifetimes,
        args.public_prefixes,
        args.secure_cookies,
    );
    let app = create_app(&config);

    info!(
        address = %local_addr,
        public_prefixes = ?config.public_prefixes,
        "Listening"
    );

    let make_service = app.router.into_make_service_with_connect_info::<SocketAddr>();
    if let Err(e) = axum::serve(listener, make_service).await {
        error!(error = %e, "Server error");
        std::process::exit(1);
    }
}
