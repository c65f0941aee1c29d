//! Device and pre-key inventory models (C4) — what a client uploads so
//! other clients can start an X3DH key exchange with it.
//!
//! The server stores only public key material. Ciphertext, ratchet state,
//! and the identity private key never leave the client. Per the data model
//! in spec §3, the signed pre-key and the one-time pre-key pool belong to
//! the *user*, not any one device — a device is just a labeled client
//! install with its own device key, listed alongside the user's shared
//! X3DH material in a bundle response.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A registered device belonging to a user.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Device {
    pub id: Uuid,
    pub user_id: Uuid,
    /// Not unique — a user may label two devices identically.
    pub label: String,
    /// The device's own public key, base64-encoded. Distinct from the
    /// user's identity key and signed pre-key; used only to identify the
    /// device entry in a bundle response, not for X3DH itself.
    pub device_public_key: String,
    pub created_at: DateTime<Utc>,
}

/// A user's current (or historical) signed pre-key. Invariant: the
/// signature verifies under the user's identity key at insertion time
/// (enforced by the caller before `insert_signed_prekey` is ever called —
/// see `veil-common::crypto::verify_signed_prekey`). The "current" key is
/// whichever row has the latest `created_at` for that user.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SignedPreKey {
    pub id: Uuid,
    pub user_id: Uuid,
    pub key_id: String,
    pub public_key: String,
    pub signature: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// A single one-time pre-key record. Never deleted once inserted, even
/// after consumption — `used` flips exactly once, for audit (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct OneTimePreKey {
    pub id: Uuid,
    pub user_id: Uuid,
    pub public_key: String,
    pub used: bool,
    pub created_at: DateTime<Utc>,
}

/// Full key bundle for a user — returned to X3DH initiators. Consumes one
/// one-time pre-key if any remain unused (see
/// `veil-db::repository::keystore::get_bundle`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyBundle {
    pub user_id: Uuid,
    pub identity_key: String,
    pub signed_pre_key: String,
    pub signed_pre_key_signature: String,
    pub signed_pre_key_id: String,
    /// Absent if the inventory is exhausted. A bundle without a one-time
    /// pre-key still permits X3DH (the spec's reduced mode), so this is
    /// informational, not an error condition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub one_time_pre_key: Option<String>,
    pub devices: Vec<DeviceSummary>,
}

/// A device entry as it appears inside a bundle response — just enough to
/// address the device, nothing cryptographically load-bearing beyond its
/// own public key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceSummary {
    pub label: String,
    pub device_public_key: String,
}

impl From<Device> for DeviceSummary {
    fn from(d: Device) -> Self {
        Self {
            label: d.label,
            device_public_key: d.device_public_key,
        }
    }
}
