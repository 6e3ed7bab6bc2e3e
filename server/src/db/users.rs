//! User Repository

use sqlx::SqlitePool;
use uuid::Uuid;

use shared::models::{User, UserRole};
use shared::util::now_millis;

use super::{RepoError, RepoResult};

pub async fn find_by_id(pool: &SqlitePool, id: &str) -> RepoResult<Option<User>> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(user)
}

pub async fn find_by_email(pool: &SqlitePool, email: &str) -> RepoResult<Option<User>> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ? LIMIT 1")
        .bind(email)
        .fetch_optional(pool)
        .await?;
    Ok(user)
}

pub async fn create(
    pool: &SqlitePool,
    email: &str,
    hashed_password: &str,
    name: &str,
    avatar: Option<&str>,
    role: UserRole,
) -> RepoResult<User> {
    let id = Uuid::new_v4().to_string();
    let now = now_millis();

    sqlx::query(
        "INSERT INTO users (id, email, password, name, avatar, role, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(email)
    .bind(hashed_password)
    .bind(name)
    .bind(avatar)
    .bind(role.as_str())
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    find_by_id(pool, &id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create user".into()))
}

/// Store a hashed reset token with its expiry timestamp
pub async fn set_reset_token(
    pool: &SqlitePool,
    user_id: &str,
    token_hash: &str,
    expires_at: i64,
) -> RepoResult<()> {
    sqlx::query(
        "UPDATE users SET reset_password_token = ?, reset_password_expires = ?, updated_at = ?
         WHERE id = ?",
    )
    .bind(token_hash)
    .bind(expires_at)
    .bind(now_millis())
    .bind(user_id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Find the user holding an unexpired reset token
pub async fn find_by_reset_token(pool: &SqlitePool, token_hash: &str) -> RepoResult<Option<User>> {
    let user = sqlx::query_as::<_, User>(
        "SELECT * FROM users
         WHERE reset_password_token = ? AND reset_password_expires > ?
         LIMIT 1",
    )
    .bind(token_hash)
    .bind(now_millis())
    .fetch_optional(pool)
    .await?;
    Ok(user)
}

/// Set a new password and clear any pending reset token
pub async fn update_password(
    pool: &SqlitePool,
    user_id: &str,
    hashed_password: &str,
) -> RepoResult<()> {
    sqlx::query(
        "UPDATE users SET password = ?, reset_password_token = NULL,
         reset_password_expires = NULL, updated_at = ?
         WHERE id = ?",
    )
    .bind(hashed_password)
    .bind(now_millis())
    .bind(user_id)
    .execute(pool)
    .await?;
    Ok(())
}
