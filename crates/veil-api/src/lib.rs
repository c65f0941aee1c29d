//! # veil-api
//!
//! HTTP surface driving the Registration State Machine (C3) and Pre-Key
//! Inventory (C4), plus the matchmaker's authenticated entry points and
//! the `/api/ws` mount. Everything that talks to `veil-db`, issues tokens,
//! or validates key material funnels through the handlers in `routes`.

pub mod middleware;
pub mod routes;
pub mod rsa_keys;

use std::sync::Arc;

use axum::Router;
use veil_common::notify::NotificationSink;
use veil_db::Database;
use veil_matchmaker::MatchmakerState;

/// Shared application state available to every route handler.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub matchmaker: MatchmakerState,
    /// Cached at startup so every `/auth/server-pubkey` call is a plain
    /// string clone rather than a key-generation round trip.
    pub server_public_key_pem: Arc<String>,
    /// Injected at construction (spec §9) so a deployment can swap in a
    /// real SMS/email transport without touching `routes::auth`.
    pub notification_sink: Arc<dyn NotificationSink>,
}

/// Build the complete router: public registration/health/server-pubkey
/// routes at the root, bearer-authenticated key/match routes and the
/// gateway's `/ws` upgrade nested under `/api`.
pub fn build_router(state: AppState, gateway: veil_gateway::GatewayState) -> Router {
    let shared = Arc::new(state);

    let public = Router::new()
        .merge(routes::auth::router())
        .merge(routes::health::router())
        .with_state(shared.clone());

    let protected = Router::new()
        .merge(routes::keys::router())
        .merge(routes::r#match::router())
        .route_layer(axum::middleware::from_fn(middleware::auth_middleware))
        .with_state(shared);

    let gateway_router = veil_gateway::build_router(gateway);

    Router::new()
        .merge(public)
        .nest("/api", protected.merge(gateway_router))
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .layer(tower_http::compression::CompressionLayer::new())
}
