//! Match profile repository (C5) — durable matchmaking preferences.

use anyhow::Result;
use sqlx::PgPool;
use uuid::Uuid;
use veil_common::models::MatchProfile;

/// Create or replace a user's match profile.
pub async fn upsert_match_profile(
    pool: &PgPool,
    user_id: Uuid,
    tag_hash: Option<&str>,
) -> Result<MatchProfile> {
    let row = sqlx::query_as::<_, MatchProfile>(
        r#"
        INSERT INTO match_profiles (user_id, tag_hash, updated_at)
        VALUES ($1, $2, now())
        ON CONFLICT (user_id) DO UPDATE
            SET tag_hash = EXCLUDED.tag_hash,
                updated_at = now()
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(tag_hash)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

pub async fn find_match_profile(pool: &PgPool, user_id: Uuid) -> Result<Option<MatchProfile>> {
    let row = sqlx::query_as::<_, MatchProfile>("SELECT * FROM match_profiles WHERE user_id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}
