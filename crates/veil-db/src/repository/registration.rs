//! Registration session repository (C3) — the durable half of the
//! registration state machine.

use anyhow::Result;
use sqlx::PgPool;
use uuid::Uuid;
use veil_common::models::RegistrationSession;

/// Create a fresh registration session for `identifier`, valid until
/// `expires_at`.
pub async fn create_registration_session(
    pool: &PgPool,
    identifier: &str,
    code_hash: &[u8],
    expires_at: chrono::DateTime<chrono::Utc>,
) -> Result<RegistrationSession> {
    let row = sqlx::query_as::<_, RegistrationSession>(
        r#"
        INSERT INTO registration_sessions (id, identifier, code_hash, expires_at, created_at)
        VALUES ($1, $2, $3, $4, now())
        RETURNING *
        "#,
    )
    .bind(Uuid::now_v7())
    .bind(identifier)
    .bind(code_hash)
    .bind(expires_at)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

/// The newest still-valid registration session for `identifier` (spec
/// §3/§4.3: multiple concurrent sessions per identifier are permitted,
/// and verification always reconciles against the newest-by-`created_at`
/// one). A session whose `expires_at` has already lapsed never matches —
/// the caller sees the same "no session" outcome as an identifier that was
/// never registered.
pub async fn latest_unexpired_session(
    pool: &PgPool,
    identifier: &str,
) -> Result<Option<RegistrationSession>> {
    let row = sqlx::query_as::<_, RegistrationSession>(
        r#"
        SELECT * FROM registration_sessions
        WHERE identifier = $1 AND expires_at > now()
        ORDER BY created_at DESC
        LIMIT 1
        "#,
    )
    .bind(identifier)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Delete a registration session. Called immediately on successful
/// verification so a verified code can never be replayed.
pub async fn delete_registration_session(pool: &PgPool, id: Uuid) -> Result<()> {
    sqlx::query("DELETE FROM registration_sessions WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Delete every registration session older than `expires_at` cutoffs that
/// have already lapsed. Intended to be run periodically so the table does
/// not grow unbounded with abandoned attempts.
pub async fn delete_expired_registration_sessions(pool: &PgPool) -> Result<u64> {
    let result = sqlx::query("DELETE FROM registration_sessions WHERE expires_at < now()")
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
