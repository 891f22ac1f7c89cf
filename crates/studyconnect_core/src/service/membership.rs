//! Membership guard use-case service.
//!
//! # Responsibility
//! - Enforce the one-group-per-subject-per-user invariant at join time.
//! - Keep join idempotent for the exact (user, group) pair.
//!
//! # Invariants
//! - Rule order: group existence, subject exclusivity, exact-membership
//!   idempotency, insert.
//! - Rejoining the same group is a success (`AlreadyMember`), not an error.

use crate::model::group::{GroupId, Membership};
use crate::model::user::UserId;
use crate::repo::membership_repo::{JoinWrite, LeaveWrite, MembershipRepository};
use crate::service::{CoreError, CoreResult};
use log::{info, warn};

/// Successful join outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    /// A new membership was created.
    Joined,
    /// The user already belonged to this exact group.
    AlreadyMember,
}

/// Membership guard facade over the membership repository.
pub struct MembershipGuard<R: MembershipRepository> {
    repo: R,
}

impl<R: MembershipRepository> MembershipGuard<R> {
    /// Creates a guard using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Joins the user to the group, enforcing subject exclusivity.
    pub fn join(&mut self, user_id: UserId, group_id: GroupId) -> CoreResult<JoinOutcome> {
        match self.repo.join_group(user_id, group_id)? {
            JoinWrite::Inserted => {
                info!(
                    "event=group_join module=membership status=ok user_id={user_id} \
                     group_id={group_id}"
                );
                Ok(JoinOutcome::Joined)
            }
            JoinWrite::AlreadyMember => Ok(JoinOutcome::AlreadyMember),
            JoinWrite::DuplicateSubject => {
                warn!(
                    "event=group_join module=membership status=rejected user_id={user_id} \
                     group_id={group_id} error_code=duplicate_subject"
                );
                Err(CoreError::Conflict("duplicate-subject"))
            }
            JoinWrite::GroupMissing => Err(CoreError::GroupNotFound(group_id)),
        }
    }

    /// Removes the user's membership in the group.
    pub fn leave(&mut self, user_id: UserId, group_id: GroupId) -> CoreResult<()> {
        match self.repo.leave_group(user_id, group_id)? {
            LeaveWrite::Removed => {
                info!(
                    "event=group_leave module=membership status=ok user_id={user_id} \
                     group_id={group_id}"
                );
                Ok(())
            }
            LeaveWrite::NotMember => Err(CoreError::Forbidden("not-a-member")),
        }
    }

    /// Lists the user's memberships, oldest join first.
    pub fn memberships(&self, user_id: UserId) -> CoreResult<Vec<Membership>> {
        Ok(self.repo.memberships_of(user_id)?)
    }
}
