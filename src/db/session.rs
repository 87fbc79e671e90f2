//! Refresh session storage.
//!
//! One row per subject holding the subject's current refresh token. Writing a
//! new token replaces the old one, so a subject has at most one live session.
//! A row stays readable through the same final second its token stays valid,
//! then is invisible to reads and purged at startup.

use sqlx::sqlite::SqlitePool;

use crate::jwt::now_secs;

/// Store for the live refresh token of each subject.
#[derive(Clone)]
pub struct RefreshSessionStore {
    pool: SqlitePool,
}

impl RefreshSessionStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Store `token` as the subject's refresh token for `ttl` seconds,
    /// replacing any previous one.
    pub async fn put(&self, subject: &str, token: &str, ttl: u64) -> Result<(), sqlx::Error> {
        self.put_at(subject, token, ttl, current_time()).await
    }

    pub async fn put_at(
        &self,
        subject: &str,
        token: &str,
        ttl: u64,
        now: u64,
    ) -> Result<(), sqlx::Error> {
        let expires_at = to_db_time(now.saturating_add(ttl));

        sqlx::query(
            "INSERT INTO refresh_sessions (subject, token, expires_at) VALUES (?, ?, ?)
             ON CONFLICT(subject) DO UPDATE SET token = excluded.token, expires_at = excluded.expires_at",
        )
        .bind(subject)
        .bind(token)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Get the subject's live refresh token, if any.
    pub async fn get(&self, subject: &str) -> Result<Option<String>, sqlx::Error> {
        self.get_at(subject, current_time()).await
    }

    pub async fn get_at(&self, subject: &str, now: u64) -> Result<Option<String>, sqlx::Error> {
        let row: Option<(String,)> = sqlx::query_as(
            "SELECT token FROM refresh_sessions WHERE subject = ? AND expires_at >= ?",
        )
        .bind(subject)
        .bind(to_db_time(now))
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(token,)| token))
    }

    /// Replace the subject's token only if it is still `expected`.
    /// Returns false when the session was rotated or revoked meanwhile.
    pub async fn replace_at(
        &self,
        subject: &str,
        expected: &str,
        token: &str,
        ttl: u64,
        now: u64,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE refresh_sessions SET token = ?, expires_at = ? WHERE subject = ? AND token = ?",
        )
        .bind(token)
        .bind(to_db_time(now.saturating_add(ttl)))
        .bind(subject)
        .bind(expected)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Revoke the subject's session. Returns whether a row was removed.
    pub async fn delete(&self, subject: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM refresh_sessions WHERE subject = ?")
            .bind(subject)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete all expired sessions.
    pub async fn purge_expired(&self) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM refresh_sessions WHERE expires_at < ?")
            .bind(to_db_time(current_time()))
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

fn current_time() -> u64 {
    // A clock before the epoch makes every row look live; reads then fall
    // back to the codec's own expiry check.
    now_secs().unwrap_or(0)
}

/// SQLite integers are signed.
fn to_db_time(secs: u64) -> i64 {
    i64::try_from(secs).unwrap_or(i64::MAX)
}
