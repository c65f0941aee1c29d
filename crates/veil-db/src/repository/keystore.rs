//! Key-store repository — CRUD for pre-key inventory (C4).
//!
//! All functions work against PostgreSQL via sqlx non-macro queries. The
//! signed pre-key and one-time pre-key pool both belong to the *user*
//! (spec §3); a device is just a labeled public key used to fan a bundle
//! response out to every install a user owns. One-time pre-keys are
//! consume-once but never deleted — [`consume_one_time_pre_key`] flips
//! `used` under a `FOR UPDATE SKIP LOCKED` row lock so two concurrent
//! bundle fetches for the same user can never be handed the same key.

use anyhow::Result;
use sqlx::PgPool;
use uuid::Uuid;
use veil_common::models::{Device, KeyBundle, OneTimePreKey, SignedPreKey};

// ============================================================
// Devices
// ============================================================

pub async fn create_device(
    pool: &PgPool,
    user_id: Uuid,
    label: &str,
    device_public_key: &str,
) -> Result<Device> {
    let row = sqlx::query_as::<_, Device>(
        r#"
        INSERT INTO devices (id, user_id, label, device_public_key, created_at)
        VALUES ($1, $2, $3, $4, now())
        RETURNING *
        "#,
    )
    .bind(Uuid::now_v7())
    .bind(user_id)
    .bind(label)
    .bind(device_public_key)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

pub async fn list_devices(pool: &PgPool, user_id: Uuid) -> Result<Vec<Device>> {
    let rows = sqlx::query_as::<_, Device>(
        "SELECT * FROM devices WHERE user_id = $1 ORDER BY created_at ASC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn delete_device(pool: &PgPool, device_id: Uuid) -> Result<()> {
    sqlx::query("DELETE FROM devices WHERE id = $1")
        .bind(device_id)
        .execute(pool)
        .await?;
    Ok(())
}

// ============================================================
// Signed Pre-Key
// ============================================================

/// Insert a new signed pre-key for `user_id`. Callers must have already
/// verified the signature (`veil_common::crypto::verify_signed_prekey`)
/// before calling this — the store itself does not re-check it.
pub async fn insert_signed_prekey(
    pool: &PgPool,
    user_id: Uuid,
    key_id: &str,
    public_key: &str,
    signature: &str,
    expires_at: chrono::DateTime<chrono::Utc>,
) -> Result<SignedPreKey> {
    let row = sqlx::query_as::<_, SignedPreKey>(
        r#"
        INSERT INTO signed_pre_keys (id, user_id, key_id, public_key, signature, expires_at, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, now())
        RETURNING *
        "#,
    )
    .bind(Uuid::now_v7())
    .bind(user_id)
    .bind(key_id)
    .bind(public_key)
    .bind(signature)
    .bind(expires_at)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

/// The user's current signed pre-key: the one with the latest `created_at`.
pub async fn latest_signed_prekey(pool: &PgPool, user_id: Uuid) -> Result<Option<SignedPreKey>> {
    let row = sqlx::query_as::<_, SignedPreKey>(
        "SELECT * FROM signed_pre_keys WHERE user_id = $1 ORDER BY created_at DESC LIMIT 1",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

// ============================================================
// One-Time Pre-Keys
// ============================================================

/// Bulk-insert one-time pre-keys for a user via `UNNEST`.
pub async fn insert_one_time_pre_keys(
    pool: &PgPool,
    user_id: Uuid,
    public_keys: &[String],
) -> Result<u64> {
    if public_keys.is_empty() {
        return Ok(0);
    }
    let now = chrono::Utc::now();
    let ids: Vec<Uuid> = (0..public_keys.len()).map(|_| Uuid::now_v7()).collect();
    let user_ids: Vec<Uuid> = std::iter::repeat(user_id).take(public_keys.len()).collect();
    let used_flags: Vec<bool> = std::iter::repeat(false).take(public_keys.len()).collect();
    let created_ats: Vec<chrono::DateTime<chrono::Utc>> =
        std::iter::repeat(now).take(public_keys.len()).collect();

    let result = sqlx::query(
        r#"
        INSERT INTO one_time_pre_keys (id, user_id, public_key, used, created_at)
        SELECT * FROM UNNEST($1::uuid[], $2::uuid[], $3::text[], $4::bool[], $5::timestamptz[])
        "#,
    )
    .bind(&ids)
    .bind(&user_ids)
    .bind(public_keys)
    .bind(&used_flags)
    .bind(&created_ats)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

/// Consume one unused one-time pre-key for `user_id`, atomically: at most
/// one concurrent caller ever observes a given key as unused. The row is
/// flagged `used = true`, never deleted — the inventory keeps a full audit
/// trail of every key ever issued, per spec §3. The oldest unused row
/// (`created_at` ascending) is consumed first. Returns `None` if the
/// inventory is exhausted.
pub async fn consume_one_time_pre_key(pool: &PgPool, user_id: Uuid) -> Result<Option<OneTimePreKey>> {
    let row = sqlx::query_as::<_, OneTimePreKey>(
        r#"
        WITH target AS (
            SELECT id FROM one_time_pre_keys
            WHERE user_id = $1 AND used = false
            ORDER BY created_at ASC
            FOR UPDATE SKIP LOCKED
            LIMIT 1
        )
        UPDATE one_time_pre_keys
        SET used = true
        WHERE id IN (SELECT id FROM target)
        RETURNING *
        "#,
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

pub async fn count_unused_one_time_pre_keys(pool: &PgPool, user_id: Uuid) -> Result<i64> {
    let row: (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM one_time_pre_keys WHERE user_id = $1 AND used = false",
    )
    .bind(user_id)
    .fetch_one(pool)
    .await?;
    Ok(row.0)
}

// ============================================================
// Key Bundle
// ============================================================

/// Fetch a full key bundle for `user_id` (for X3DH initiators): identity
/// key, current signed pre-key, every device entry, and one freshly
/// consumed one-time pre-key if the inventory isn't exhausted. Returns
/// `None` if the user has no bound identity key or no signed pre-key yet.
pub async fn get_bundle(pool: &PgPool, user_id: Uuid) -> Result<Option<KeyBundle>> {
    let user = crate::repository::users::find_by_id(pool, user_id).await?;
    let Some(user) = user else { return Ok(None) };
    let Some(identity_key) = user.identity_key else {
        return Ok(None);
    };

    let Some(signed_pre_key) = latest_signed_prekey(pool, user_id).await? else {
        return Ok(None);
    };

    let devices = list_devices(pool, user_id)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();

    let otpk = consume_one_time_pre_key(pool, user_id).await?;

    Ok(Some(KeyBundle {
        user_id,
        identity_key,
        signed_pre_key: signed_pre_key.public_key,
        signed_pre_key_signature: signed_pre_key.signature,
        signed_pre_key_id: signed_pre_key.key_id,
        one_time_pre_key: otpk.map(|k| k.public_key),
        devices,
    }))
}
