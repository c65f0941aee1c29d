//! Registration State Machine (C3) HTTP surface — `POST /auth/register`,
//! `POST /auth/verify-2fa`, and the server's RSA public key for the legacy
//! bundle-encryption path.

use std::sync::Arc;

use axum::{extract::State, routing::{get, post}, Json, Router};
use veil_common::{
    auth::issue_session_token,
    crypto::{generate_code, verify_code},
    error::{VeilError, VeilResult},
    models::{RegisterRequest, RegisterResponse, VerifyRequest, VerifyResponse},
    validation::validate_request,
};
use veil_db::repository::{registration, users};

use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/verify-2fa", post(verify_2fa))
        .route("/auth/server-pubkey", get(server_pubkey))
}

/// `POST /auth/register` — start_registration(identifier): generate a
/// code, store its hash, enqueue the raw code on the notification sink.
/// Multiple concurrent sessions per identifier are permitted; verification
/// always looks up the newest one.
async fn register(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RegisterRequest>,
) -> VeilResult<Json<RegisterResponse>> {
    validate_request(&body)?;

    let config = veil_common::config::get();
    let generated = generate_code(config.auth.otp_digits, &config.auth.otp_pepper_bytes());
    let expires_at = chrono::Utc::now()
        + chrono::Duration::minutes(config.auth.otp_expiry_minutes as i64);

    let session = registration::create_registration_session(
        &state.db.pg,
        &body.identifier,
        &generated.code_hash,
        expires_at,
    )
    .await
    .map_err(VeilError::Internal)?;

    // The core never synthesizes the transport itself — the concrete
    // sink is injected into `AppState` at construction (spec §9).
    state
        .notification_sink
        .send_code(&body.identifier, &generated.plaintext)
        .await?;

    Ok(Json(RegisterResponse {
        registration_session_id: session.id,
        expires_at: session.expires_at,
        dev_code: config.dev_mode.then_some(generated.plaintext),
    }))
}

/// `POST /auth/verify-2fa` — the one-phase combined surface: verify the
/// code, bind the identity key (first verification only), create the
/// first device, and issue a session token, atomically from the caller's
/// point of view. The registration session is deleted immediately on a
/// successful code check, before identity binding, so a racing second
/// verify attempt against the same session can never double-spend it.
async fn verify_2fa(
    State(state): State<Arc<AppState>>,
    Json(body): Json<VerifyRequest>,
) -> VeilResult<Json<VerifyResponse>> {
    validate_request(&body)?;
    veil_common::validation::validate_device_label(&body.device_label)?;
    veil_common::crypto::validate_identity_key(&body.identity_key)
        .map_err(|_| VeilError::InvalidSignature)?;

    let config = veil_common::config::get();
    // Always reconciles against the newest unexpired session for this
    // identifier (spec §3/§4.3) — a lapsed session never matches, so it
    // reads to the caller exactly like "no session for this identifier".
    let session = registration::latest_unexpired_session(&state.db.pg, &body.identifier)
        .await
        .map_err(VeilError::Internal)?
        .ok_or(VeilError::RegistrationSessionNotFound)?;

    if !verify_code(&body.code, &config.auth.otp_pepper_bytes(), &session.code_hash) {
        return Err(VeilError::IncorrectCode);
    }

    // Verified: the session is now spent regardless of what happens next.
    registration::delete_registration_session(&state.db.pg, session.id)
        .await
        .map_err(VeilError::Internal)?;

    let user = match users::find_by_identifier(&state.db.pg, &session.identifier)
        .await
        .map_err(VeilError::Internal)?
    {
        Some(existing) => existing,
        None => users::create_user(
            &state.db.pg,
            veil_common::snowflake::generate_id(),
            &session.identifier,
        )
        .await
        .map_err(VeilError::Internal)?,
    };

    if let Some(existing_key) = &user.identity_key {
        if existing_key != &body.identity_key {
            return Err(VeilError::IdentityAlreadyBound);
        }
    } else {
        users::bind_identity_key(&state.db.pg, user.id, &body.identity_key)
            .await
            .map_err(VeilError::Internal)?;
    }

    veil_common::crypto::validate_x25519_key(&body.device_pub, "device_pub")
        .map_err(|_| VeilError::InvalidSignature)?;

    // Signature gate (spec §3 invariant 6): no signed pre-key is ever
    // inserted unless it verifies under the identity key being bound. A
    // format failure (wrong length, bad base64) and a failed verification
    // both collapse to the same `InvalidSignature` kind per spec §7.
    let signature_ok = veil_common::crypto::verify_signed_prekey(
        &body.identity_key,
        &body.signed_pre_key,
        &body.signed_pre_key_sig,
    )
    .map_err(|_| VeilError::InvalidSignature)?;
    if !signature_ok {
        return Err(VeilError::InvalidSignature);
    }

    veil_db::repository::keystore::insert_signed_prekey(
        &state.db.pg,
        user.id,
        &body.signed_pre_key_id,
        &body.signed_pre_key,
        &body.signed_pre_key_sig,
        chrono::Utc::now() + chrono::Duration::days(30),
    )
    .await
    .map_err(VeilError::Internal)?;

    let device = veil_db::repository::keystore::create_device(
        &state.db.pg,
        user.id,
        &body.device_label,
        &body.device_pub,
    )
    .await
    .map_err(VeilError::Internal)?;

    if !body.one_time_pre_keys.is_empty() {
        veil_db::repository::keystore::insert_one_time_pre_keys(
            &state.db.pg,
            user.id,
            &body.one_time_pre_keys,
        )
        .await
        .map_err(VeilError::Internal)?;
    }

    let session_token = issue_session_token(
        user.id,
        device.id,
        &config.auth.jwt_signing_key,
        config.auth.session_token_ttl_secs,
    )?;

    tracing::info!(user_id = %user.id, device_id = %device.id, "registration completed");

    Ok(Json(VerifyResponse {
        user_id: user.id,
        device_id: device.id,
        session_token,
    }))
}

#[derive(serde::Serialize)]
struct ServerPubkeyResponse {
    public_key: String,
}

async fn server_pubkey(State(state): State<Arc<AppState>>) -> Json<ServerPubkeyResponse> {
    Json(ServerPubkeyResponse {
        public_key: (*state.server_public_key_pem).clone(),
    })
}
