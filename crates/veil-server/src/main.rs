//! # veil-server
//!
//! Main binary. Unlike the reference codebase (which splits REST API, WS
//! gateway, and voice SFU across three listening ports), Veil serves the
//! REST surface and the `/api/ws` upgrade off a single listener — the
//! gateway is just another authenticated endpoint here, not a separate
//! protocol surface.
//!
//! Construction order mirrors the component dependency graph: credential
//! store, then the in-memory matchmaker (which spawns its own worker),
//! then the connection hub, then the router that ties them to HTTP.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use veil_api::{build_router, AppState};
use veil_db::Database;
use veil_gateway::GatewayState;
use veil_matchmaker::{MatchmakerHandle, MatchmakerState};

const SHUTDOWN_BUDGET: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = veil_common::config::init()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "veil=info,tower_http=info".into()),
        )
        .with_target(true)
        .init();

    tracing::info!("starting veil v{}", env!("CARGO_PKG_VERSION"));

    let db = Database::connect(config).await?;
    db.migrate().await?;

    let matchmaker = MatchmakerState::new(config.matchmaker.queue_capacity);
    let (mm_events_tx, mut mm_events_rx) = tokio::sync::mpsc::channel(256);
    let matchmaker_handle = MatchmakerHandle::spawn(
        matchmaker.clone(),
        Duration::from_millis(config.matchmaker.tick_interval_ms),
        chrono::Duration::seconds(config.matchmaker.waiter_max_age_secs as i64),
        mm_events_tx,
    );

    let gateway_state = GatewayState::new(config.hub.outbound_capacity, matchmaker.clone());

    // Forward matchmaker pairing/timeout events to whichever connections
    // are live in the hub. This is the only task outside `veil-matchmaker`
    // and `veil-gateway` proper that either crate's state is handed to;
    // it terminates on its own once the matchmaker handle is dropped and
    // closes the event channel.
    let forwarder_hub = gateway_state.hub.clone();
    let forwarder = tokio::spawn(async move {
        use veil_gateway::envelope::ServerEnvelope;
        use veil_matchmaker::MatchmakerEvent;

        while let Some(event) = mm_events_rx.recv().await {
            match event {
                MatchmakerEvent::Paired { a, b } => {
                    forwarder_hub.send_to(a, ServerEnvelope::MatchFound { partner: b }).await;
                    forwarder_hub.send_to(b, ServerEnvelope::MatchFound { partner: a }).await;
                }
                MatchmakerEvent::TimedOut { user_id } => {
                    forwarder_hub.send_to(user_id, ServerEnvelope::MatchTimeout).await;
                }
            }
        }
    });

    let server_public_key_pem = Arc::new(veil_api::rsa_keys::server_public_key_pem(config)?);

    // Swap this for a real SMS/email-backed sink in a production
    // deployment; the core never hard-codes a transport (spec §9).
    let notification_sink: Arc<dyn veil_common::notify::NotificationSink> =
        Arc::new(veil_common::notify::LoggingNotificationSink);

    let api_state = AppState {
        db: db.clone(),
        matchmaker: matchmaker.clone(),
        server_public_key_pem,
        notification_sink,
    };

    let router = build_router(api_state, gateway_state);
    let addr = SocketAddr::new(config.server.host.parse()?, config.server.port);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("listening on http://{addr}");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("shutting down, budget {:?}", SHUTDOWN_BUDGET);
    let _ = tokio::time::timeout(SHUTDOWN_BUDGET, async {
        matchmaker_handle.shutdown().await;
        forwarder.abort();
        let _ = forwarder.await;
    })
    .await;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
