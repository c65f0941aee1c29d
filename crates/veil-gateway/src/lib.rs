//! # veil-gateway
//!
//! Connection Hub (C6): the `/api/ws` upgrade and the relay between a
//! matched pair's two live connections. No fire-and-forget tasks — every
//! connection's reader and writer are joined on disconnect, and the hub
//! itself has no background task of its own.

pub mod envelope;
pub mod hub;

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use futures_util::{SinkExt, StreamExt};
use uuid::Uuid;
use veil_common::auth::validate_session_token;
use veil_matchmaker::{MatchStatus, MatchmakerState};

use envelope::{ClientEnvelope, ServerEnvelope};
use hub::Hub;

/// Shared gateway state, wired into the router via `with_state`.
#[derive(Clone)]
pub struct GatewayState {
    pub hub: Hub,
    pub matchmaker: MatchmakerState,
}

impl GatewayState {
    pub fn new(outbound_capacity: usize, matchmaker: MatchmakerState) -> Self {
        Self {
            hub: Hub::new(outbound_capacity),
            matchmaker,
        }
    }
}

/// Mount the WebSocket upgrade at `/ws` under whatever prefix the caller
/// nests this router at (`veil-api` nests it at `/api`).
pub fn build_router(state: GatewayState) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .with_state(Arc::new(state))
}

#[derive(serde::Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

/// WebSocket upgrade handler. Accepts the session token either via a
/// `Authorization: Bearer <token>` header or a `?token=` query parameter —
/// browsers cannot set headers on a WebSocket handshake, so the query
/// parameter exists for them.
async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<GatewayState>>,
    headers: HeaderMap,
    Query(query): Query<TokenQuery>,
) -> Response {
    let token = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_owned)
        .or(query.token);

    let Some(token) = token else {
        return (StatusCode::UNAUTHORIZED, "missing session token").into_response();
    };

    let config = veil_common::config::get();
    let claims = match validate_session_token(&token, &config.auth.jwt_signing_key) {
        Ok(claims) => claims,
        Err(_) => return (StatusCode::UNAUTHORIZED, "invalid session token").into_response(),
    };

    ws.on_upgrade(move |socket| handle_connection(socket, state, claims.sub, claims.device_id))
}

async fn handle_connection(socket: WebSocket, state: Arc<GatewayState>, user_id: Uuid, device_id: Uuid) {
    let (mut sender, mut receiver) = socket.split();
    let mut outbound_rx = state.hub.register(user_id, device_id).await;
    state
        .hub
        .send_to(user_id, ServerEnvelope::Ready { user_id, device_id })
        .await;

    let writer = tokio::spawn(async move {
        while let Some(envelope) = outbound_rx.recv().await {
            let Ok(text) = serde_json::to_string(&envelope) else {
                continue;
            };
            if sender.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(msg)) = receiver.next().await {
        match msg {
            Message::Text(text) => handle_client_envelope(&state, user_id, &text).await,
            Message::Close(_) => break,
            _ => {}
        }
    }

    writer.abort();
    let _ = writer.await;
    state.hub.unregister(user_id, device_id).await;

    // If this user was paired, tear the pairing down and tell the partner.
    if let MatchStatus::Paired { partner } = state.matchmaker.status(user_id) {
        state.matchmaker.remove_pair(user_id);
        state
            .hub
            .send_to(partner, ServerEnvelope::PeerDisconnected)
            .await;
    }

    tracing::info!(%user_id, %device_id, "connection closed");
}

async fn handle_client_envelope(state: &GatewayState, user_id: Uuid, text: &str) {
    let envelope = match serde_json::from_str::<ClientEnvelope>(text) {
        Ok(e) => e,
        Err(e) => {
            tracing::debug!(%user_id, error = %e, "dropped malformed envelope");
            state
                .hub
                .send_to(
                    user_id,
                    ServerEnvelope::Error {
                        message: "malformed envelope".into(),
                    },
                )
                .await;
            return;
        }
    };

    match envelope {
        ClientEnvelope::Ping => {
            state.hub.send_to(user_id, ServerEnvelope::Pong).await;
        }
        ClientEnvelope::Message { to, payload } => {
            let authorized = matches!(
                state.matchmaker.status(user_id),
                MatchStatus::Paired { partner } if partner == to
            );
            if !authorized {
                state
                    .hub
                    .send_to(
                        user_id,
                        ServerEnvelope::Error {
                            message: "no active pairing with that recipient".into(),
                        },
                    )
                    .await;
                return;
            }
            state
                .hub
                .send_to(
                    to,
                    ServerEnvelope::Message {
                        from: user_id,
                        payload,
                        timestamp: chrono::Utc::now(),
                    },
                )
                .await;
        }
    }
}

/// Re-exported so `veil-server` can report liveness without reaching into
/// the `hub` module directly.
pub async fn active_connection_count(state: &GatewayState) -> usize {
    state.hub.active_count().await
}
