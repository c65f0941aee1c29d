//! Middleware — bearer session-token extraction for the protected routes
//! (everything under `/api` except the WS upgrade, which validates its own
//! token so it can also accept a `?token=` query parameter).

use axum::{extract::Request, http::header, middleware::Next, response::Response};
use veil_common::{auth::validate_session_token, error::VeilError};

/// Authentication context extracted from the Authorization header.
#[derive(Debug, Clone, Copy)]
pub struct AuthContext {
    pub user_id: uuid::Uuid,
    pub device_id: uuid::Uuid,
}

/// Extract and validate the session token from `Authorization: Bearer <token>`.
pub async fn auth_middleware(mut request: Request, next: Next) -> Result<Response, VeilError> {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(VeilError::Unauthorized)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or(VeilError::Unauthorized)?;

    let config = veil_common::config::get();
    let claims = validate_session_token(token, &config.auth.jwt_signing_key)?;

    request.extensions_mut().insert(AuthContext {
        user_id: claims.sub,
        device_id: claims.device_id,
    });

    Ok(next.run(request).await)
}

impl AuthContext {
    pub fn from_request_extensions(extensions: &axum::http::Extensions) -> Result<&Self, VeilError> {
        extensions.get::<AuthContext>().ok_or(VeilError::Unauthorized)
    }
}
