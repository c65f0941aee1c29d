//! `GET /health` — load balancer / monitoring endpoint. Reports Credential
//! Store reachability and matchmaker liveness alongside the plain "ok"
//! spec.md §6 requires, following the reference repo's
//! `nexus_db::postgres::health_check` pattern.

use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::AppState;

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    timestamp: chrono::DateTime<chrono::Utc>,
    database_ok: bool,
    matchmaker_queue_len: usize,
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/health", get(health_check))
}

async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let database_ok = veil_db::postgres::health_check(&state.db.pg).await;

    Json(HealthResponse {
        status: if database_ok { "ok".into() } else { "degraded".into() },
        timestamp: chrono::Utc::now(),
        database_ok,
        matchmaker_queue_len: state.matchmaker.queue_len(),
    })
}
