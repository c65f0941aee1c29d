//! Wire envelope exchanged over the `/api/ws` upgrade.
//!
//! The hub never inspects message payloads beyond routing them — `payload`
//! is an opaque, client-encrypted ciphertext blob the server cannot read.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEnvelope {
    /// Relay an opaque ciphertext payload to the sender's current match
    /// partner. Rejected if the sender has no active pairing, or if `to`
    /// does not match the current partner.
    Message { to: Uuid, payload: serde_json::Value },
    /// Keepalive; answered with `ServerEnvelope::Pong`.
    Ping,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEnvelope {
    /// A message relayed from `from`, stamped with the hub's receipt time.
    Message {
        from: Uuid,
        payload: serde_json::Value,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
    Pong,
    /// Sent once, right after upgrade, so the client knows its own
    /// identity on this connection.
    Ready { user_id: Uuid, device_id: Uuid },
    /// The matchmaker paired this user with `partner`.
    MatchFound { partner: Uuid },
    /// The matchmaker reaped this user's wait before a partner appeared.
    MatchTimeout,
    /// The peer this user was paired with disconnected or was unpaired.
    PeerDisconnected,
    Error { message: String },
}
