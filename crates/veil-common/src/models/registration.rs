//! Registration Session model (C3) — the state machine that turns an
//! unauthenticated identifier into a bound user with a first device and a
//! session token.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// An in-flight registration attempt: an identifier has been given a code,
/// and that code has not yet been consumed successfully. Deleted as soon as
/// verification succeeds (see SPEC_FULL.md §4's Open Question decision) —
/// a session never outlives its code.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct RegistrationSession {
    pub id: Uuid,
    pub identifier: String,
    /// HMAC-SHA256 of the one-time code under the process pepper. The
    /// plaintext code is never persisted.
    pub code_hash: Vec<u8>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// `POST /auth/register` — begin registration for an identifier.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 3, max = 320, message = "identifier must be at least 3 characters"))]
    pub identifier: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub registration_session_id: Uuid,
    pub expires_at: DateTime<Utc>,
    /// Only populated when the server is running in dev mode — never set
    /// in a production configuration.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dev_code: Option<String>,
}

/// `POST /auth/verify-2fa` — the one-phase verification surface: verifies
/// the code, binds the identity key (first verification only), creates the
/// first device, and issues a session token, all atomically.
///
/// Resolved against the newest unexpired [`RegistrationSession`] for
/// `identifier` (spec §3/§4.3) rather than a session ID the client would
/// otherwise have to remember — multiple concurrent sessions per
/// identifier are permitted, and the newest one always wins.
#[derive(Debug, Deserialize, Validate)]
pub struct VerifyRequest {
    #[validate(length(min = 3, max = 320, message = "identifier must be at least 3 characters"))]
    pub identifier: String,
    #[validate(length(min = 4, max = 12, message = "code has an unexpected length"))]
    pub code: String,
    /// The Ed25519 identity key to bind, base64-encoded. Required the
    /// first time a given user ever verifies; ignored (the existing key is
    /// kept) on subsequent devices for an already-bound identity.
    pub identity_key: String,
    pub device_label: String,
    pub device_pub: String,
    pub signed_pre_key: String,
    pub signed_pre_key_sig: String,
    pub signed_pre_key_id: String,
    #[serde(default)]
    pub one_time_pre_keys: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub user_id: Uuid,
    pub device_id: Uuid,
    pub session_token: String,
}
