//! # veil-matchmaker
//!
//! Matchmaker (C5): a bounded FIFO waiter queue and a single tick-loop
//! worker that pairs waiters two at a time. The public contract is
//! `enqueue` / `status` / `remove_pair` on [`MatchmakerState`]; the worker
//! in [`worker`] is the only task that ever mutates pairings on a timer —
//! everything else is driven directly by caller requests.

pub mod state;
pub mod worker;

pub use state::{MatchStatus, MatchmakerState, Waiter};
pub use worker::{MatchmakerEvent, MatchmakerHandle};
