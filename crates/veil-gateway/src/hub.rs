//! Connection Hub (C6): one live connection per user, a bounded outbound
//! queue per connection, and slow-consumer eviction.
//!
//! Grounded on the same `Arc<RwLock<HashMap<...>>>` shape the reference
//! codebase uses for its session registry, but where that registry allowed
//! multiple concurrent sessions per user fanned out over one shared
//! broadcast channel, the hub here enforces exactly one live connection per
//! user and gives each connection its own bounded channel — a slow reader
//! only ever backs up its own queue, never anyone else's.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

use crate::envelope::ServerEnvelope;

struct Connection {
    device_id: Uuid,
    outbound: mpsc::Sender<ServerEnvelope>,
    connected_at: chrono::DateTime<chrono::Utc>,
}

/// The connection registry. Cheap to clone — internally an
/// `Arc<RwLock<HashMap<...>>>`.
#[derive(Clone)]
pub struct Hub {
    connections: Arc<RwLock<HashMap<Uuid, Connection>>>,
    outbound_capacity: usize,
}

impl Hub {
    pub fn new(outbound_capacity: usize) -> Self {
        Self {
            connections: Arc::new(RwLock::new(HashMap::new())),
            outbound_capacity,
        }
    }

    /// Register a new live connection for `user_id`, returning the receiver
    /// half of its outbound queue. If the user already had a connection, it
    /// is evicted: its receiver is dropped, which causes that connection's
    /// writer task to observe a closed channel and exit.
    pub async fn register(&self, user_id: Uuid, device_id: Uuid) -> mpsc::Receiver<ServerEnvelope> {
        let (tx, rx) = mpsc::channel(self.outbound_capacity);
        let mut connections = self.connections.write().await;
        connections.insert(
            user_id,
            Connection {
                device_id,
                outbound: tx,
                connected_at: chrono::Utc::now(),
            },
        );
        rx
    }

    /// Remove a user's connection. A no-op if `user_id` is not registered,
    /// or if it has already been replaced by a newer connection for the
    /// same user (checked via `device_id` so an old connection's cleanup
    /// can't clobber a newer one's registration).
    pub async fn unregister(&self, user_id: Uuid, device_id: Uuid) {
        let mut connections = self.connections.write().await;
        if let Some(conn) = connections.get(&user_id) {
            if conn.device_id == device_id {
                connections.remove(&user_id);
            }
        }
    }

    pub async fn is_online(&self, user_id: Uuid) -> bool {
        self.connections.read().await.contains_key(&user_id)
    }

    pub async fn active_count(&self) -> usize {
        self.connections.read().await.len()
    }

    /// When `user_id`'s current connection was established, for diagnostics.
    pub async fn connected_since(&self, user_id: Uuid) -> Option<chrono::DateTime<chrono::Utc>> {
        self.connections
            .read()
            .await
            .get(&user_id)
            .map(|c| c.connected_at)
    }

    /// Attempt to deliver `envelope` to `user_id`. Returns `false` if the
    /// user has no live connection, or if its outbound queue is full — a
    /// full queue means a stalled client, and the connection is evicted
    /// rather than let the send block or silently buffer forever.
    pub async fn send_to(&self, user_id: Uuid, envelope: ServerEnvelope) -> bool {
        {
            let connections = self.connections.read().await;
            match connections.get(&user_id) {
                Some(conn) => {
                    if conn.outbound.try_send(envelope).is_ok() {
                        return true;
                    }
                }
                None => return false,
            }
        }
        tracing::warn!(%user_id, "evicting slow or closed connection");
        self.connections.write().await.remove(&user_id);
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn register_then_send_delivers() {
        let hub = Hub::new(4);
        let user = Uuid::now_v7();
        let mut rx = hub.register(user, Uuid::now_v7()).await;

        assert!(hub.send_to(user, ServerEnvelope::Pong).await);
        let received = rx.recv().await.unwrap();
        assert!(matches!(received, ServerEnvelope::Pong));
    }

    #[tokio::test]
    async fn registering_again_evicts_prior_connection() {
        let hub = Hub::new(4);
        let user = Uuid::now_v7();
        let first_device = Uuid::now_v7();
        let mut first_rx = hub.register(user, first_device).await;

        let second_device = Uuid::now_v7();
        let _second_rx = hub.register(user, second_device).await;

        // The first connection's sender has been dropped from the map;
        // its receiver now observes a closed channel.
        assert!(first_rx.recv().await.is_none());
        assert!(hub.is_online(user).await);
    }

    #[tokio::test]
    async fn full_queue_evicts_connection() {
        let hub = Hub::new(1);
        let user = Uuid::now_v7();
        let _rx = hub.register(user, Uuid::now_v7()).await;

        assert!(hub.send_to(user, ServerEnvelope::Pong).await);
        // Queue (capacity 1) is now full and nobody is draining it.
        assert!(!hub.send_to(user, ServerEnvelope::Pong).await);
        assert!(!hub.is_online(user).await);
    }

    #[tokio::test]
    async fn unregister_only_removes_matching_device() {
        let hub = Hub::new(4);
        let user = Uuid::now_v7();
        let first_device = Uuid::now_v7();
        hub.register(user, first_device).await;
        let second_device = Uuid::now_v7();
        hub.register(user, second_device).await;

        // Stale cleanup from the first connection must not evict the second.
        hub.unregister(user, first_device).await;
        assert!(hub.is_online(user).await);

        hub.unregister(user, second_device).await;
        assert!(!hub.is_online(user).await);
    }
}
