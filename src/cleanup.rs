//! Startup cleanup of expired data.

use crate::db::Database;
use tracing::{error, info};

/// Run all cleanup tasks once.
pub async fn run_cleanup(db: &Database) {
    match db.refresh_sessions().purge_expired().await {
        Ok(count) if count > 0 => info!("Cleaned up {} expired refresh sessions", count),
        Ok(_) => {}
        Err(e) => error!("Failed to clean up expired refresh sessions: {}", e),
    }
}
