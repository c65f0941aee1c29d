//! Session Token Issuer (C7): stateless JWT issuance and validation for
//! handoff tokens (short-lived, scoped to a single registration flow) and
//! session tokens (longer-lived, used to authenticate API/WS requests).

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::VeilError;

/// Claims embedded in a session token — the credential a client presents on
/// every authenticated REST call and on the `/api/ws` upgrade.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SessionClaims {
    /// Subject: the user ID.
    pub sub: Uuid,
    /// The device this session was issued for.
    pub device_id: Uuid,
    pub iat: i64,
    pub exp: i64,
}

/// A handoff token ties a specific registration session to a single
/// purpose so it can't be replayed against a different step of the flow.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub enum HandoffPurpose {
    /// Permits calling the "complete registration" step for this session.
    CompleteRegistration,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct HandoffClaims {
    /// Subject: the registration session ID.
    pub sub: Uuid,
    pub purpose: HandoffPurpose,
    pub iat: i64,
    pub exp: i64,
}

/// Issue a session token for `user_id`/`device_id`, valid for `ttl_secs`.
pub fn issue_session_token(
    user_id: Uuid,
    device_id: Uuid,
    signing_key: &str,
    ttl_secs: u64,
) -> Result<String, VeilError> {
    let now = chrono::Utc::now().timestamp();
    let claims = SessionClaims {
        sub: user_id,
        device_id,
        iat: now,
        exp: now + ttl_secs as i64,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(signing_key.as_bytes()),
    )
    .map_err(|e| VeilError::Internal(e.into()))
}

/// Validate and decode a session token.
pub fn validate_session_token(token: &str, signing_key: &str) -> Result<SessionClaims, VeilError> {
    decode::<SessionClaims>(
        token,
        &DecodingKey::from_secret(signing_key.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => VeilError::TokenExpired,
        _ => VeilError::InvalidToken,
    })
}

/// Issue a handoff token scoped to `registration_session_id` and `purpose`.
pub fn issue_handoff_token(
    registration_session_id: Uuid,
    purpose: HandoffPurpose,
    signing_key: &str,
    ttl_secs: u64,
) -> Result<String, VeilError> {
    let now = chrono::Utc::now().timestamp();
    let claims = HandoffClaims {
        sub: registration_session_id,
        purpose,
        iat: now,
        exp: now + ttl_secs as i64,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(signing_key.as_bytes()),
    )
    .map_err(|e| VeilError::Internal(e.into()))
}

/// Validate a handoff token and assert it was issued for `expected_purpose`.
pub fn validate_handoff_token(
    token: &str,
    signing_key: &str,
    expected_purpose: HandoffPurpose,
) -> Result<HandoffClaims, VeilError> {
    let claims = decode::<HandoffClaims>(
        token,
        &DecodingKey::from_secret(signing_key.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => VeilError::TokenExpired,
        _ => VeilError::InvalidToken,
    })?;

    if claims.purpose != expected_purpose {
        return Err(VeilError::InvalidToken);
    }
    Ok(claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "test-signing-key-at-least-32-bytes-long!";

    #[test]
    fn session_token_roundtrips() {
        let user_id = Uuid::now_v7();
        let device_id = Uuid::now_v7();
        let token = issue_session_token(user_id, device_id, KEY, 3600).unwrap();
        let claims = validate_session_token(&token, KEY).unwrap();
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.device_id, device_id);
    }

    #[test]
    fn session_token_rejects_wrong_key() {
        let token = issue_session_token(Uuid::now_v7(), Uuid::now_v7(), KEY, 3600).unwrap();
        let result = validate_session_token(&token, "a-completely-different-key-value");
        assert!(result.is_err());
    }

    #[test]
    fn expired_session_token_is_rejected() {
        let token = issue_session_token(Uuid::now_v7(), Uuid::now_v7(), KEY, 0).unwrap();
        std::thread::sleep(std::time::Duration::from_secs(1));
        let result = validate_session_token(&token, KEY);
        assert!(matches!(result, Err(VeilError::TokenExpired)));
    }

    #[test]
    fn handoff_token_rejects_mismatched_purpose() {
        let session_id = Uuid::now_v7();
        let token = issue_handoff_token(
            session_id,
            HandoffPurpose::CompleteRegistration,
            KEY,
            300,
        )
        .unwrap();
        // Only one purpose variant exists today, so re-validate against the
        // same purpose to confirm the success path, and confirm a foreign
        // key is rejected.
        let claims = validate_handoff_token(&token, KEY, HandoffPurpose::CompleteRegistration)
            .unwrap();
        assert_eq!(claims.sub, session_id);

        let wrong_key_result =
            validate_handoff_token(&token, "wrong-signing-key-value-padded!!", HandoffPurpose::CompleteRegistration);
        assert!(wrong_key_result.is_err());
    }
}
