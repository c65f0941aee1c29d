//! Match Profile model (C5) — the durable half of matchmaking state.
//!
//! The matchmaker's live waiters/pairs/queue are purely in-memory (see
//! `veil-matchmaker`); `MatchProfile` is the small piece of matching
//! configuration a user sets ahead of time and that survives a restart.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A user's standing matchmaking preference.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct MatchProfile {
    pub user_id: Uuid,
    /// Opaque hash of the user's interest tags. Persisted so a future
    /// tag-aware matchmaking algorithm has data to work with; the current
    /// FIFO-only pairing algorithm does not read this field (see
    /// DESIGN.md's Open Question decision on tag-aware matchmaking).
    pub tag_hash: Option<String>,
    pub updated_at: DateTime<Utc>,
}
