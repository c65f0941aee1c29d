//! Matchmaker tick-loop worker: the single background task that turns the
//! waiter queue into pairs.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::state::MatchmakerState;

/// Event emitted to subscribers when the worker forms a pair or reaps a
/// stale waiter. `veil-gateway` listens on this channel to push a
/// `match_found` / `match_timeout` envelope to the affected connections.
#[derive(Debug, Clone)]
pub enum MatchmakerEvent {
    Paired { a: Uuid, b: Uuid },
    TimedOut { user_id: Uuid },
}

/// Owns the spawned tick-loop task. Dropping or calling [`MatchmakerHandle::shutdown`]
/// stops the loop; the task is never fire-and-forget.
pub struct MatchmakerHandle {
    join: JoinHandle<()>,
}

impl MatchmakerHandle {
    /// Spawn the worker loop: on every `tick_interval`, reap stale waiters
    /// and then attempt to pair whoever remains. Emits events over
    /// `events_tx` — the receiver end is owned by whatever wires
    /// connections to matches (normally `veil-gateway`).
    pub fn spawn(
        state: MatchmakerState,
        tick_interval: Duration,
        waiter_max_age: chrono::Duration,
        events_tx: mpsc::Sender<MatchmakerEvent>,
    ) -> Self {
        let join = tokio::spawn(async move {
            let mut interval = tokio::time::interval(tick_interval);
            loop {
                interval.tick().await;

                for user_id in state.reap_stale(waiter_max_age) {
                    if events_tx
                        .send(MatchmakerEvent::TimedOut { user_id })
                        .await
                        .is_err()
                    {
                        tracing::warn!("matchmaker event receiver dropped; stopping worker");
                        return;
                    }
                }

                for (a, b) in state.tick_pair() {
                    tracing::debug!(%a, %b, "matchmaker formed a pair");
                    if events_tx.send(MatchmakerEvent::Paired { a, b }).await.is_err() {
                        tracing::warn!("matchmaker event receiver dropped; stopping worker");
                        return;
                    }
                }
            }
        });
        Self { join }
    }

    /// Stop the worker and wait for it to exit.
    pub async fn shutdown(self) {
        self.join.abort();
        let _ = self.join.await;
    }
}
