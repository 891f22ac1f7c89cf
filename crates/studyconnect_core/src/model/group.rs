//! Group and membership domain model.
//!
//! # Invariants
//! - `(subject, ordinal)` is unique: the ordinal is the per-subject
//!   generation sequence for auto-provisioned groups.
//! - A user holds at most one membership among groups sharing one subject.

use super::user::UserId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier for a study group.
pub type GroupId = Uuid;

/// A subject-specific study group. Groups are created explicitly or lazily
/// by the resolver and are never physically deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    /// Stable global ID.
    pub id: GroupId,
    /// Subject key used for matching and the one-per-subject invariant.
    pub subject: String,
    /// Per-subject generation sequence, starting at 1.
    pub ordinal: u32,
    /// Display name.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// User who created the group (or triggered its auto-provisioning).
    pub creator_id: UserId,
    /// Creation timestamp in epoch milliseconds.
    pub created_at: i64,
}

impl Group {
    /// Creates an auto-provisioned group for `subject` with the given
    /// generation ordinal, named `"{subject} Study Group #{ordinal}"`.
    pub fn provisioned(subject: &str, ordinal: u32, creator_id: UserId) -> Self {
        Self {
            id: Uuid::new_v4(),
            subject: subject.to_string(),
            ordinal,
            name: format!("{subject} Study Group #{ordinal}"),
            description: format!("Auto-created study group for {subject}."),
            creator_id,
            created_at: super::now_millis(),
        }
    }
}

/// A (user, group) membership pair. Unique per pair; at most one membership
/// per user among groups sharing one subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    pub user_id: UserId,
    pub group_id: GroupId,
    /// Join timestamp in epoch milliseconds; the unread cutoff for this
    /// member in this group.
    pub joined_at: i64,
}
