//! Engagement tracker use-case service.
//!
//! # Responsibility
//! - Compute per-group unread counts from join cutoffs and view records.
//! - Record explicit read acknowledgements idempotently.
//!
//! # Invariants
//! - Every group the user belongs to appears in the unread map, zero
//!   included; no membership is ever omitted.
//! - Self-authored posts never count toward the author's own unread total.
//! - `mark_all_read` only ever creates view records for the currently
//!   unread set; repeated calls create nothing new.

use crate::model::group::GroupId;
use crate::model::user::UserId;
use crate::repo::post_repo::{MarkReadWrite, PostRepository};
use crate::service::{CoreError, CoreResult};
use log::info;
use std::collections::BTreeMap;

/// Engagement tracker facade over the post/view repository.
pub struct EngagementTracker<R: PostRepository> {
    repo: R,
}

impl<R: PostRepository> EngagementTracker<R> {
    /// Creates a tracker using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Returns the unread post count per group the user belongs to.
    pub fn unread_counts(&self, user_id: UserId) -> CoreResult<BTreeMap<GroupId, u32>> {
        Ok(self.repo.unread_counts(user_id)?.into_iter().collect())
    }

    /// Acknowledges every currently-unread post of the group for the user
    /// and returns how many new view records were created.
    pub fn mark_all_read(&mut self, user_id: UserId, group_id: GroupId) -> CoreResult<u32> {
        match self.repo.mark_group_read(user_id, group_id)? {
            MarkReadWrite::Marked(count) => {
                info!(
                    "event=posts_marked_read module=engagement status=ok user_id={user_id} \
                     group_id={group_id} marked={count}"
                );
                Ok(count)
            }
            MarkReadWrite::NotMember => Err(CoreError::Forbidden("not-a-member")),
            MarkReadWrite::GroupMissing => Err(CoreError::GroupNotFound(group_id)),
        }
    }
}
