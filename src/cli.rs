//! CLI argument parsing, validation, and startup helpers.

use crate::ServerConfig;
use crate::db::Database;
use crate::jwt::{ACCESS_TOKEN_DURATION_SECS, MAX_TOKEN_DURATION_SECS, REFRESH_TOKEN_DURATION_SECS};
use crate::session::TokenLifetimes;
use crate::signing::SigningKey;
use clap::Parser;
use tracing::{error, info};

#[derive(clap::ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "tollgate", about = "Bearer token issuer and authentication gate")]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "7291")]
    pub port: u16,

    /// Path to SQLite database file holding refresh sessions
    #[arg(short, long, default_value = "tollgate.db")]
    pub database: String,

    /// Path to file containing the base64 signing secret. Prefer using JWT_SECRET env var instead
    #[arg(long)]
    pub jwt_secret_file: Option<String>,

    /// Path prefix exempt from token verification (repeatable)
    #[arg(long = "public-prefix", value_parser = validate_public_prefix, default_value = crate::DEFAULT_PUBLIC_PREFIX)]
    pub public_prefixes: Vec<String>,

    /// Access token lifetime in seconds (at most one year)
    #[arg(long, default_value_t = ACCESS_TOKEN_DURATION_SECS, value_parser = clap::value_parser!(u64).range(1..=MAX_TOKEN_DURATION_SECS))]
    pub access_ttl: u64,

    /// Refresh token lifetime in seconds (at most one year)
    #[arg(long, default_value_t = REFRESH_TOKEN_DURATION_SECS, value_parser = clap::value_parser!(u64).range(1..=MAX_TOKEN_DURATION_SECS))]
    pub refresh_ttl: u64,

    /// Set the Secure attribute on cookies (use behind HTTPS)
    #[arg(long, env = "SECURE_COOKIES")]
    pub secure_cookies: bool,

    /// Print a freshly generated signing secret and exit
    #[arg(long)]
    pub generate_secret: bool,

    /// Log output format
    #[arg(short, long, default_value = "pretty")]
    pub log_format: LogFormat,
}

fn validate_public_prefix(s: &str) -> Result<String, String> {
    if !s.starts_with('/') {
        return Err(format!("Public prefix must start with '/': {}", s));
    }

    if s.chars().any(|c| !c.is_ascii() || c.is_whitespace()) {
        return Err(format!("Public prefix contains invalid characters: {}", s));
    }

    Ok(s.to_string())
}

/// Initialize logging based on the specified format.
pub fn init_logging(format: &LogFormat) {
    match format {
        LogFormat::Pretty => tracing_subscriber::fmt::init(),
        LogFormat::Json => tracing_subscriber::fmt().json().init(),
        LogFormat::Compact => tracing_subscriber::fmt().compact().init(),
    }
}

/// Load the signing key from environment variable or file.
/// Returns None and logs an error if the key cannot be loaded.
pub fn load_signing_key(jwt_secret_file: Option<&str>) -> Option<SigningKey> {
    let secret = if let Ok(secret) = std::env::var("JWT_SECRET") {
        // Clear the environment variable to prevent leaking
        // SAFETY: We're single-threaded at this point during startup,
        // and no other code is reading this environment variable.
        unsafe { std::env::remove_var("JWT_SECRET") };
        secret
    } else if let Some(path) = jwt_secret_file {
        match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                error!(path = %path, error = %e, "Failed to read JWT secret file");
                return None;
            }
        }
    } else {
        error!(
            "JWT secret is required. Set JWT_SECRET environment variable (recommended) or use --jwt-secret-file"
        );
        return None;
    };

    match SigningKey::from_base64(&secret) {
        Ok(key) => Some(key),
        Err(e) => {
            error!(error = %e, "Invalid JWT secret. Generate one with --generate-secret");
            None
        }
    }
}

/// Check that the refresh lifetime is not shorter than the access lifetime.
pub fn validate_lifetimes(access_ttl: u64, refresh_ttl: u64) -> Option<TokenLifetimes> {
    if refresh_ttl < access_ttl {
        error!(
            access_ttl,
            refresh_ttl, "Refresh token lifetime must not be shorter than access token lifetime"
        );
        return None;
    }

    Some(TokenLifetimes {
        access: access_ttl,
        refresh: refresh_ttl,
    })
}

/// Build ServerConfig from validated arguments.
pub fn build_config(
    db: Database,
    signing_key: SigningKey,
    lifetimes: TokenLifetimes,
    public_prefixes: Vec<String>,
    secure_cookies: bool,
) -> ServerConfig {
    ServerConfig {
        db,
        signing_key,
        lifetimes,
        public_prefixes,
        secure_cookies,
    }
}

/// Open the database, logging errors if it fails.
pub async fn open_database(path: &str) -> Option<Database> {
    match Database::open(path).await {
        Ok(db) => {
            info!(path = %path, "Database opened");
            Some(db)
        }
        Err(e) => {
            error!(path = %path, error = %e, "Failed to open database");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_args() {
        let args = Args::try_parse_from(["tollgate"]).unwrap();
        assert_eq!(args.public_prefixes, vec!["/api/auth/".to_string()]);
        assert_eq!(args.access_ttl, 900);
        assert_eq!(args.refresh_ttl, 259200);
        assert!(!args.generate_secret);
    }

    #[test]
    fn test_repeated_public_prefix() {
        let args = Args::try_parse_from([
            "tollgate",
            "--public-prefix",
            "/api/auth/",
            "--public-prefix",
            "/health",
        ])
        .unwrap();
        assert_eq!(args.public_prefixes, vec!["/api/auth/", "/health"]);
    }

    #[test]
    fn test_public_prefix_must_be_absolute() {
        assert!(Args::try_parse_from(["tollgate", "--public-prefix", "api/auth/"]).is_err());
    }

    #[test]
    fn test_zero_ttl_rejected() {
        assert!(Args::try_parse_from(["tollgate", "--access-ttl", "0"]).is_err());
    }

    #[test]
    fn test_ttl_upper_bound() {
        let max = MAX_TOKEN_DURATION_SECS.to_string();
        let args = Args::try_parse_from(["tollgate", "--refresh-ttl", &max]).unwrap();
        assert_eq!(args.refresh_ttl, MAX_TOKEN_DURATION_SECS);

        let over = (MAX_TOKEN_DURATION_SECS + 1).to_string();
        assert!(Args::try_parse_from(["tollgate", "--refresh-ttl", &over]).is_err());
        assert!(Args::try_parse_from(["tollgate", "--access-ttl", &u64::MAX.to_string()]).is_err());
    }

    #[test]
    fn test_validate_lifetimes() {
        assert!(validate_lifetimes(900, 259200).is_some());
        assert!(validate_lifetimes(900, 900).is_some());
        assert!(validate_lifetimes(900, 60).is_none());
    }
}
