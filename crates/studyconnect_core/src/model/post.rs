//! Post domain model. View records live only in storage; the repository
//! exposes them through the unread queries, never as a materialized struct.

use super::group::GroupId;
use super::user::UserId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier for a post.
pub type PostId = Uuid;

/// A post inside exactly one group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    /// Stable global ID.
    pub id: PostId,
    pub group_id: GroupId,
    pub author_id: UserId,
    pub title: String,
    pub content: String,
    /// Creation timestamp in epoch milliseconds.
    pub created_at: i64,
    /// Soft-delete tombstone. Posts with this set are excluded from all
    /// counts and listings.
    pub deleted_at: Option<i64>,
}

impl Post {
    /// Creates a new post with a generated stable ID.
    pub fn new(
        group_id: GroupId,
        author_id: UserId,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            group_id,
            author_id,
            title: title.into(),
            content: content.into(),
            created_at: super::now_millis(),
            deleted_at: None,
        }
    }

    /// Returns whether this post should be considered visible/active.
    pub fn is_active(&self) -> bool {
        self.deleted_at.is_none()
    }
}
