//! In-memory matchmaker state: a FIFO waiter queue plus the map of
//! currently-paired users. Everything lives behind one `Mutex` with
//! deliberately short critical sections — no lock is ever held across an
//! `.await`.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use uuid::Uuid;
use veil_common::error::VeilError;

/// A user waiting to be paired.
#[derive(Debug, Clone)]
pub struct Waiter {
    pub user_id: Uuid,
    /// Carried for a future tag-aware pairing algorithm; the current
    /// FIFO-only tick does not read this field.
    pub tag_hash: Option<String>,
    pub enqueued_at: DateTime<Utc>,
}

/// Where a user currently stands in the matchmaker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchStatus {
    NotQueued,
    Waiting,
    Paired { partner: Uuid },
}

pub(crate) struct Inner {
    pub(crate) queue: VecDeque<Waiter>,
    pub(crate) pairs: HashMap<Uuid, Uuid>,
    pub(crate) capacity: usize,
}

/// Shared handle to the matchmaker's in-memory state. Cheap to clone —
/// internally an `Arc<Mutex<Inner>>`.
#[derive(Clone)]
pub struct MatchmakerState {
    inner: std::sync::Arc<Mutex<Inner>>,
}

impl MatchmakerState {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: std::sync::Arc::new(Mutex::new(Inner {
                queue: VecDeque::new(),
                pairs: HashMap::new(),
                capacity,
            })),
        }
    }

    /// Add `user_id` to the queue. Idempotent: a user already waiting or
    /// already paired is left untouched rather than double-enqueued.
    pub fn enqueue(&self, user_id: Uuid, tag_hash: Option<String>) -> Result<MatchStatus, VeilError> {
        let mut inner = self.inner.lock().expect("matchmaker mutex poisoned");

        if let Some(&partner) = inner.pairs.get(&user_id) {
            return Ok(MatchStatus::Paired { partner });
        }
        if inner.queue.iter().any(|w| w.user_id == user_id) {
            return Ok(MatchStatus::Waiting);
        }
        if inner.queue.len() >= inner.capacity {
            return Err(VeilError::QueueFull);
        }

        inner.queue.push_back(Waiter {
            user_id,
            tag_hash,
            enqueued_at: Utc::now(),
        });
        Ok(MatchStatus::Waiting)
    }

    /// Report a user's current matchmaker status.
    pub fn status(&self, user_id: Uuid) -> MatchStatus {
        let inner = self.inner.lock().expect("matchmaker mutex poisoned");
        if let Some(&partner) = inner.pairs.get(&user_id) {
            return MatchStatus::Paired { partner };
        }
        if inner.queue.iter().any(|w| w.user_id == user_id) {
            return MatchStatus::Waiting;
        }
        MatchStatus::NotQueued
    }

    /// Tear down a pairing for both members. Idempotent — calling this on
    /// an unpaired (or unknown) user is not an error.
    pub fn remove_pair(&self, user_id: Uuid) {
        let mut inner = self.inner.lock().expect("matchmaker mutex poisoned");
        if let Some(partner) = inner.pairs.remove(&user_id) {
            inner.pairs.remove(&partner);
        }
    }

    /// Remove a user from the waiter queue without pairing them (used when
    /// a client disconnects while still waiting).
    pub fn cancel_wait(&self, user_id: Uuid) {
        let mut inner = self.inner.lock().expect("matchmaker mutex poisoned");
        inner.queue.retain(|w| w.user_id != user_id);
    }

    /// Current waiter count, for health diagnostics.
    pub fn queue_len(&self) -> usize {
        self.inner.lock().expect("matchmaker mutex poisoned").queue.len()
    }

    /// Run one tick of the pairing algorithm: take exactly two user IDs
    /// from the head of the queue and pair them symmetrically. Bounds
    /// per-tick work by a constant (spec §4.5) — a tick with a large
    /// backlog pairs one couple and leaves the rest for the next tick,
    /// rather than draining the whole queue at once. If fewer than two
    /// waiters are available, a lone waiter taken off the head is
    /// requeued at the tail (fairness: it doesn't starve behind itself)
    /// and no pair is formed this tick.
    pub(crate) fn tick_pair(&self) -> Vec<(Uuid, Uuid)> {
        let mut inner = self.inner.lock().expect("matchmaker mutex poisoned");
        if inner.queue.len() < 2 {
            if let Some(lone) = inner.queue.pop_front() {
                inner.queue.push_back(lone);
            }
            return Vec::new();
        }
        let a = inner.queue.pop_front().expect("len checked >= 2");
        let b = inner.queue.pop_front().expect("len checked >= 2");
        inner.pairs.insert(a.user_id, b.user_id);
        inner.pairs.insert(b.user_id, a.user_id);
        vec![(a.user_id, b.user_id)]
    }

    /// Evict waiters older than `max_age`, returning the evicted user IDs so
    /// the caller can notify them. A reaped waiter is simply removed — it
    /// was never paired, so no pairing invariant is at risk.
    pub(crate) fn reap_stale(&self, max_age: chrono::Duration) -> Vec<Uuid> {
        let mut inner = self.inner.lock().expect("matchmaker mutex poisoned");
        let cutoff = Utc::now() - max_age;
        let mut reaped = Vec::new();
        inner.queue.retain(|w| {
            if w.enqueued_at < cutoff {
                reaped.push(w.user_id);
                false
            } else {
                true
            }
        });
        reaped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enqueue_is_idempotent_while_waiting() {
        let state = MatchmakerState::new(10);
        let user = Uuid::now_v7();
        assert_eq!(state.enqueue(user, None).unwrap(), MatchStatus::Waiting);
        assert_eq!(state.enqueue(user, None).unwrap(), MatchStatus::Waiting);
    }

    #[test]
    fn enqueue_rejects_once_capacity_reached() {
        let state = MatchmakerState::new(1);
        state.enqueue(Uuid::now_v7(), None).unwrap();
        let result = state.enqueue(Uuid::now_v7(), None);
        assert!(matches!(result, Err(VeilError::QueueFull)));
    }

    #[test]
    fn tick_pair_is_fifo_and_symmetric() {
        let state = MatchmakerState::new(10);
        let a = Uuid::now_v7();
        let b = Uuid::now_v7();
        let c = Uuid::now_v7();
        state.enqueue(a, None).unwrap();
        state.enqueue(b, None).unwrap();
        state.enqueue(c, None).unwrap();

        let formed = state.tick_pair();
        assert_eq!(formed, vec![(a, b)]);
        assert_eq!(state.status(a), MatchStatus::Paired { partner: b });
        assert_eq!(state.status(b), MatchStatus::Paired { partner: a });
        // c is odd one out, still waiting
        assert_eq!(state.status(c), MatchStatus::Waiting);
    }

    #[test]
    fn remove_pair_is_symmetric_and_idempotent() {
        let state = MatchmakerState::new(10);
        let a = Uuid::now_v7();
        let b = Uuid::now_v7();
        state.enqueue(a, None).unwrap();
        state.enqueue(b, None).unwrap();
        state.tick_pair();

        state.remove_pair(a);
        assert_eq!(state.status(a), MatchStatus::NotQueued);
        assert_eq!(state.status(b), MatchStatus::NotQueued);
        // calling again is a no-op, not an error
        state.remove_pair(a);
    }

    #[test]
    fn reap_stale_evicts_only_expired_waiters() {
        let state = MatchmakerState::new(10);
        let old = Uuid::now_v7();
        state.enqueue(old, None).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(20));
        let fresh = Uuid::now_v7();
        state.enqueue(fresh, None).unwrap();

        let reaped = state.reap_stale(chrono::Duration::milliseconds(10));
        assert_eq!(reaped, vec![old]);
        assert_eq!(state.status(old), MatchStatus::NotQueued);
        assert_eq!(state.status(fresh), MatchStatus::Waiting);
    }
}
