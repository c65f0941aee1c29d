//! User model (C1 Credential Store) — the identity layer.
//!
//! A user is pseudonymous: there is no username/password. The only durable
//! secret attached to a user account is their Ed25519 identity key, and
//! even that is absent until the first device finishes registration.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A Veil user account.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    /// Unique user ID (UUID v7 — time-sortable).
    pub id: Uuid,

    /// The identifier the user registered with (email or phone number).
    /// Never returned in API responses.
    #[serde(skip_serializing)]
    pub identifier: String,

    /// The user's Ed25519 public identity key, base64-encoded. `None`
    /// until the first device completes registration; immutable once set
    /// — a user cannot rebind their identity key through this API.
    pub identity_key: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Safe user representation for API responses.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub has_identity_key: bool,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            has_identity_key: u.identity_key.is_some(),
            created_at: u.created_at,
        }
    }
}
