use sqlx::{Pool, Sqlite};

use crate::{
    error::{ApiError, QueryError},
    jwt::SessionData,
};

/// Marks the session's token as unusable until it would have expired anyway
pub async fn revoke_token(session: &SessionData, pool: &Pool<Sqlite>) -> Result<(), ApiError> {
    sqlx::query(
        "INSERT INTO revoked_tokens (jti, user_id, expires_at) VALUES (?, ?, ?) ON CONFLICT DO NOTHING",
    )
    .bind(&session.jti)
    .bind(session.user_id)
    .bind(session.exp)
    .execute(pool)
    .await
    .map_err(QueryError::from)?;

    log::info!("user {} logged out", session.username);
    Ok(())
}

pub async fn is_token_revoked(jti: &str, pool: &Pool<Sqlite>) -> Result<bool, ApiError> {
    let row: Option<(String,)> = sqlx::query_as("SELECT jti FROM revoked_tokens WHERE jti = ?")
        .bind(jti)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(row.is_some())
}

/// Drops revocations for tokens that have expired on their own
pub async fn purge_expired_tokens(pool: &Pool<Sqlite>) -> Result<u64, ApiError> {
    let result = sqlx::query("DELETE FROM revoked_tokens WHERE expires_at < ?")
        .bind(chrono::Utc::now().timestamp())
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(result.rows_affected())
}
