//! User repository — CRUD operations for user accounts.

use anyhow::Result;
use sqlx::PgPool;
use uuid::Uuid;
use veil_common::models::User;

/// Create a new user account for `identifier`. Callers should first check
/// `find_by_identifier` — this function does not itself enforce uniqueness
/// beyond the database's `UNIQUE` constraint on `identifier`.
pub async fn create_user(pool: &PgPool, id: Uuid, identifier: &str) -> Result<User> {
    let row = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (id, identifier, created_at, updated_at)
        VALUES ($1, $2, now(), now())
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(identifier)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

/// Find a user by their unique ID.
pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<User>> {
    let row = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

/// Find a user by the identifier they registered with.
pub async fn find_by_identifier(pool: &PgPool, identifier: &str) -> Result<Option<User>> {
    let row = sqlx::query_as::<_, User>("SELECT * FROM users WHERE identifier = $1")
        .bind(identifier)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

/// Bind a user's identity key. A no-op that returns the user unchanged if
/// an identity key is already bound — identity keys are immutable once set,
/// so this never overwrites an existing key.
pub async fn bind_identity_key(pool: &PgPool, user_id: Uuid, identity_key: &str) -> Result<User> {
    let row = sqlx::query_as::<_, User>(
        r#"
        UPDATE users SET
            identity_key = COALESCE(identity_key, $2),
            updated_at = now()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(identity_key)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

/// Count total registered users (diagnostics only).
pub async fn count_users(pool: &PgPool) -> Result<i64> {
    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await?;
    Ok(row.0)
}
