//! Core domain models shared across every Veil crate.
//!
//! These are the "truth" types — what the credential store persists and the
//! API serializes. Every entity uses a UUID v7 (see [`crate::snowflake`]) for
//! a globally unique, time-sortable identifier.

pub mod device;
pub mod match_profile;
pub mod registration;
pub mod user;

pub use device::*;
pub use match_profile::*;
pub use registration::*;
pub use user::*;
