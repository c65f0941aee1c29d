//! Matchmaker (C5) authenticated entry points — `POST /api/match/enqueue`,
//! `GET /api/match/status`.

use std::sync::Arc;

use axum::{
    extract::{Extension, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use veil_common::error::{VeilError, VeilResult};
use veil_db::repository::match_profiles;
use veil_matchmaker::MatchStatus;

use crate::{middleware::AuthContext, AppState};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/match/enqueue", post(enqueue))
        .route("/match/status", get(status))
}

#[derive(Debug, Deserialize)]
pub struct EnqueueRequest {
    /// Opaque hash of the caller's interest tags. Carried into the waiter
    /// record but not read by the current FIFO-only pairing tick (see
    /// DESIGN.md's tag-aware matchmaking decision).
    pub tag_hash: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MatchStatusResponse {
    Idle,
    Waiting,
    Matched { pair_id: Uuid },
}

async fn enqueue(
    Extension(auth): Extension<AuthContext>,
    State(state): State<Arc<AppState>>,
    Json(body): Json<EnqueueRequest>,
) -> VeilResult<Json<MatchStatusResponse>> {
    // Persist the caller's tag_hash durably (C1's upsert_match_profile) so
    // it survives a restart, even though the live FIFO tick doesn't
    // consult it today (see DESIGN.md's tag-aware matchmaking decision).
    match_profiles::upsert_match_profile(&state.db.pg, auth.user_id, body.tag_hash.as_deref())
        .await
        .map_err(VeilError::Internal)?;

    let status = state.matchmaker.enqueue(auth.user_id, body.tag_hash)?;
    Ok(Json(to_response(status)))
}

async fn status(
    Extension(auth): Extension<AuthContext>,
    State(state): State<Arc<AppState>>,
) -> Json<MatchStatusResponse> {
    Json(to_response(state.matchmaker.status(auth.user_id)))
}

fn to_response(status: MatchStatus) -> MatchStatusResponse {
    match status {
        MatchStatus::NotQueued => MatchStatusResponse::Idle,
        MatchStatus::Waiting => MatchStatusResponse::Waiting,
        MatchStatus::Paired { partner } => MatchStatusResponse::Matched { pair_id: partner },
    }
}
