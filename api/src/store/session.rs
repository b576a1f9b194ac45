//! Users and bearer-token sessions.

use jiff::Span;
use jiff_sqlx::ToSqlx;
use payloads::{SessionToken, UserId, requests};
use sqlx::PgPool;

use super::{Session, StoreError, User};
use crate::time::TimeSource;

const SESSION_TTL_DAYS: i64 = 30;

pub async fn create_user(
    pool: &PgPool,
    username: &str,
    email: &str,
    password_hash: &str,
    time_source: &TimeSource,
) -> Result<User, StoreError> {
    if username.len() > requests::USERNAME_MAX_LEN
        || email.len() > requests::EMAIL_MAX_LEN
    {
        return Err(StoreError::FieldTooLong);
    }

    let result = sqlx::query_as::<_, User>(
        "INSERT INTO users (email, username, password_hash, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $4) RETURNING *;",
    )
    .bind(email)
    .bind(username)
    .bind(password_hash)
    .bind(time_source.now().to_sqlx())
    .fetch_one(pool)
    .await;

    result.map_err(|e| match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            if db.constraint().is_some_and(|c| c.contains("email")) {
                StoreError::EmailTaken
            } else {
                StoreError::UsernameTaken
            }
        }
        _ => StoreError::Database(e),
    })
}

/// Issue a fresh bearer token; the caller's stale expired sessions are
/// reaped on the way.
pub async fn create_session(
    user_id: &UserId,
    pool: &PgPool,
    time_source: &TimeSource,
) -> Result<Session, StoreError> {
    let now = time_source.now();

    sqlx::query("DELETE FROM sessions WHERE user_id = $1 AND expires_at <= $2;")
        .bind(user_id)
        .bind(now.to_sqlx())
        .execute(pool)
        .await?;

    Ok(sqlx::query_as::<_, Session>(
        "INSERT INTO sessions (user_id, created_at, expires_at)
        VALUES ($1, $2, $3) RETURNING *;",
    )
    .bind(user_id)
    .bind(now.to_sqlx())
    .bind((now + Span::new().hours(SESSION_TTL_DAYS * 24)).to_sqlx())
    .fetch_one(pool)
    .await?)
}

/// Resolve a bearer token to its user; expired or unknown tokens are
/// indistinguishable to the caller.
pub async fn session_user(
    token: &SessionToken,
    pool: &PgPool,
    time_source: &TimeSource,
) -> Result<User, StoreError> {
    sqlx::query_as::<_, User>(
        "SELECT u.* FROM sessions s
        JOIN users u ON u.id = s.user_id
        WHERE s.token = $1 AND s.expires_at > $2;",
    )
    .bind(token)
    .bind(time_source.now().to_sqlx())
    .fetch_optional(pool)
    .await?
    .ok_or(StoreError::SessionNotFound)
}
