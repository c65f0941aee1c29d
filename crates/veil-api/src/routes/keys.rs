//! Pre-Key Inventory (C4) — `POST /api/keys/prekeys/upload`,
//! `GET /api/keys/bundle/{user_id}`.

use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use veil_common::{
    crypto::verify_signed_prekey,
    error::{VeilError, VeilResult},
    models::KeyBundle,
    validation::validate_device_label,
};
use veil_db::repository::{keystore, users};

use crate::{middleware::AuthContext, AppState};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/keys/prekeys/upload", post(upload_prekey_bundle))
        .route("/keys/bundle/{user_id}", get(get_bundle))
}

/// Upload request for the *whole* bundle, per spec §4.4: identity key,
/// signed pre-key + signature, a batch of one-time pre-keys, and the
/// device that's uploading them, in one call.
#[derive(Debug, Deserialize)]
pub struct UploadPrekeyBundleRequest {
    pub identity_pub: String,
    /// The Ed25519 signing key the signature below was produced under.
    /// Equal to `identity_pub` for a first device; kept distinct in the
    /// wire shape so a future multi-identity-key design doesn't need a
    /// breaking change.
    pub signing_pub: String,
    pub signed_prekey: String,
    pub signed_prekey_signature: String,
    pub signed_prekey_id: String,
    #[serde(default)]
    pub one_time_prekeys: Vec<String>,
    pub device_label: String,
    pub device_pub: String,
}

#[derive(Debug, Serialize)]
pub struct UploadPrekeyBundleResponse {
    pub status: &'static str,
    pub device_id: Uuid,
}

/// Signed pre-keys are valid for 30 days from upload, per spec §4.4.
const SIGNED_PREKEY_TTL_DAYS: i64 = 30;

async fn upload_prekey_bundle(
    Extension(auth): Extension<AuthContext>,
    State(state): State<Arc<AppState>>,
    Json(body): Json<UploadPrekeyBundleRequest>,
) -> VeilResult<Json<UploadPrekeyBundleResponse>> {
    validate_device_label(&body.device_label)?;
    veil_common::crypto::validate_x25519_key(&body.device_pub, "device_pub")
        .map_err(|_| VeilError::InvalidSignature)?;

    // Byte-length checks happen inside `verify_signed_prekey` itself (it
    // never panics on malformed input, only returns false), so a single
    // call covers validation steps 1 and 2 of spec §4.4. Per spec §7, a
    // format failure here is indistinguishable from a failed verification
    // — both collapse to the same generic `InvalidSignature` kind so a
    // caller learns nothing about *why* a key was rejected.
    let signature_ok = verify_signed_prekey(
        &body.signing_pub,
        &body.signed_prekey,
        &body.signed_prekey_signature,
    )
    .map_err(|_| VeilError::InvalidSignature)?;
    if !signature_ok {
        return Err(VeilError::InvalidSignature);
    }

    // Bind identity key (idempotent; rejects a mismatched rebind).
    let user = users::find_by_id(&state.db.pg, auth.user_id)
        .await?
        .ok_or(VeilError::NotFound { resource: "User".into() })?;
    if let Some(existing) = &user.identity_key {
        if existing != &body.identity_pub {
            return Err(VeilError::IdentityAlreadyBound);
        }
    } else {
        users::bind_identity_key(&state.db.pg, auth.user_id, &body.identity_pub).await?;
    }

    keystore::insert_signed_prekey(
        &state.db.pg,
        auth.user_id,
        &body.signed_prekey_id,
        &body.signed_prekey,
        &body.signed_prekey_signature,
        chrono::Utc::now() + chrono::Duration::days(SIGNED_PREKEY_TTL_DAYS),
    )
    .await
    .map_err(VeilError::Internal)?;

    let device = keystore::create_device(&state.db.pg, auth.user_id, &body.device_label, &body.device_pub)
        .await
        .map_err(VeilError::Internal)?;

    // One-time pre-keys are best-effort at the element level; a bad
    // base64 entry is skipped rather than failing the whole upload, but
    // the signed pre-key above was mandatory.
    let valid_otpks: Vec<String> = body
        .one_time_prekeys
        .into_iter()
        .filter(|k| veil_common::crypto::validate_x25519_key(k, "one_time_prekey").is_ok())
        .collect();
    if !valid_otpks.is_empty() {
        keystore::insert_one_time_pre_keys(&state.db.pg, auth.user_id, &valid_otpks)
            .await
            .map_err(VeilError::Internal)?;
    }

    Ok(Json(UploadPrekeyBundleResponse {
        status: "ok",
        device_id: device.id,
    }))
}

/// Fetch `user_id`'s key bundle. Each successful call consumes one
/// one-time pre-key, per spec §4.4 — the read has a side effect.
async fn get_bundle(
    Extension(_auth): Extension<AuthContext>,
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
) -> VeilResult<Json<KeyBundle>> {
    let bundle = keystore::get_bundle(&state.db.pg, user_id)
        .await
        .map_err(VeilError::Internal)?
        .ok_or(VeilError::NotFound { resource: "KeyBundle".into() })?;

    Ok(Json(bundle))
}
