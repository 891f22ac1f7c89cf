//! Domain model for the study-group coordination core.
//!
//! # Responsibility
//! - Define the canonical records shared by repositories and services.
//!
//! # Invariants
//! - Every entity is identified by a stable UUID.
//! - Post deletion is represented by a soft-delete tombstone, not hard delete.
//! - All timestamps are Unix epoch milliseconds.

pub mod group;
pub mod post;
pub mod user;

use std::time::{SystemTime, UNIX_EPOCH};

/// Current wall-clock time in epoch milliseconds.
pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_millis() as i64)
}
