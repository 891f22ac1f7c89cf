//! Group resolver use-case service.
//!
//! # Responsibility
//! - Answer a subject search with the full annotated candidate list and a
//!   single recommended group.
//! - Lazily provision groups so a joinable option always exists: a `#1`
//!   group for a never-seen subject, a fresh empty group when every
//!   candidate is populated.
//!
//! # Invariants
//! - Candidates are scored in stable first-created order; affinity ties
//!   resolve to the first-encountered group.
//! - A zero-affinity result recommends the joinable empty group, never a
//!   populated-but-irrelevant one.
//! - The recommended group's member count, affinity score and membership
//!   flag are recomputed fresh after any provisioning insert.
//! - A raced provisioning pre-check re-runs the whole pass; the resolver
//!   never returns a partial candidate list.

use crate::model::group::{Group, GroupId};
use crate::model::user::UserId;
use crate::repo::group_repo::{GroupRepository, ProvisionOutcome};
use crate::service::matcher::shared_interest_members;
use crate::service::{CoreError, CoreResult};
use log::{info, warn};
use serde::Serialize;
use std::collections::BTreeSet;

/// How many times one `recommend` call re-reads the candidate set after a
/// provisioning pre-check loses its race.
const MAX_PROVISION_ATTEMPTS: usize = 3;

/// A candidate group annotated for the requesting user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupSummary {
    pub group_id: GroupId,
    pub name: String,
    pub subject: String,
    pub description: String,
    pub member_count: u32,
    /// Members sharing at least one interest tag with the requester.
    pub shared_interest_members: u32,
    /// Whether the requester already belongs to this group.
    pub is_member: bool,
}

/// Result envelope of a subject search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Recommendation {
    pub recommended: GroupSummary,
    /// All matched candidates in stable first-created order. Empty when the
    /// subject had never been seen and its `#1` group was just provisioned.
    pub all_groups: Vec<GroupSummary>,
}

enum Pass {
    Done(Recommendation),
    Raced,
}

/// Group resolver facade over the group repository.
pub struct GroupResolver<R: GroupRepository> {
    repo: R,
}

impl<R: GroupRepository> GroupResolver<R> {
    /// Creates a resolver using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Recommends a group for the subject query, provisioning one when
    /// needed. Fuzzy match: case-insensitive substring against the stored
    /// subject, so one query can surface groups of several distinct
    /// subjects.
    pub fn recommend(
        &mut self,
        subject: &str,
        user_id: UserId,
        user_interests: &BTreeSet<String>,
    ) -> CoreResult<Recommendation> {
        let subject = subject.trim();
        if subject.is_empty() {
            return Err(CoreError::InvalidInput("subject query must not be empty"));
        }

        for _attempt in 0..MAX_PROVISION_ATTEMPTS {
            match self.recommend_pass(subject, user_id, user_interests)? {
                Pass::Done(recommendation) => return Ok(recommendation),
                Pass::Raced => continue,
            }
        }

        warn!(
            "event=recommend module=resolver status=error subject={subject} \
             error_code=provision_contended attempts={MAX_PROVISION_ATTEMPTS}"
        );
        Err(CoreError::Contended("group provisioning"))
    }

    fn recommend_pass(
        &mut self,
        subject: &str,
        user_id: UserId,
        user_interests: &BTreeSet<String>,
    ) -> CoreResult<Pass> {
        let groups = self.repo.search_groups_by_subject(subject)?;

        // Never-seen subject: provision the sole #1 group and return it as
        // the recommendation with an empty candidate list.
        if groups.is_empty() {
            return match self.repo.create_first_group(subject, user_id)? {
                ProvisionOutcome::Created(group) => {
                    info!(
                        "event=group_provisioned module=resolver kind=first subject={subject} \
                         group_id={} name={:?}",
                        group.id, group.name
                    );
                    Ok(Pass::Done(Recommendation {
                        recommended: provisioned_summary(&group),
                        all_groups: Vec::new(),
                    }))
                }
                ProvisionOutcome::Raced => Ok(Pass::Raced),
            };
        }

        let mut summaries = Vec::with_capacity(groups.len() + 1);
        for group in &groups {
            summaries.push(self.summarize(group, user_id, user_interests)?);
        }

        // First zero-member candidate is the joinable fallback; when every
        // candidate is populated, manufacture one.
        let joinable = match summaries.iter().find(|summary| summary.member_count == 0) {
            Some(summary) => summary.clone(),
            None => match self.repo.create_overflow_group(subject, user_id)? {
                ProvisionOutcome::Created(group) => {
                    info!(
                        "event=group_provisioned module=resolver kind=overflow subject={subject} \
                         group_id={} ordinal={}",
                        group.id, group.ordinal
                    );
                    let summary = provisioned_summary(&group);
                    summaries.push(summary.clone());
                    summary
                }
                ProvisionOutcome::Raced => return Ok(Pass::Raced),
            },
        };

        // Highest affinity wins; strict comparison keeps the first
        // encountered candidate on ties.
        let mut best_index = 0;
        for (index, summary) in summaries.iter().enumerate().skip(1) {
            if summary.shared_interest_members
                > summaries[best_index].shared_interest_members
            {
                best_index = index;
            }
        }

        let recommended = if summaries[best_index].shared_interest_members == 0 {
            joinable
        } else {
            // Recompute from storage rather than reusing the first-pass
            // annotation, which may predate the overflow insert.
            let best_id = summaries[best_index].group_id;
            match self.repo.get_group(best_id)? {
                Some(group) => self.summarize(&group, user_id, user_interests)?,
                None => return Ok(Pass::Raced),
            }
        };

        Ok(Pass::Done(Recommendation {
            recommended,
            all_groups: summaries,
        }))
    }

    fn summarize(
        &self,
        group: &Group,
        user_id: UserId,
        user_interests: &BTreeSet<String>,
    ) -> CoreResult<GroupSummary> {
        let member_interests = self.repo.member_interest_sets(group.id)?;
        let shared = shared_interest_members(user_interests, &member_interests);
        let is_member = self.repo.is_member(user_id, group.id)?;

        Ok(GroupSummary {
            group_id: group.id,
            name: group.name.clone(),
            subject: group.subject.clone(),
            description: group.description.clone(),
            member_count: member_interests.len() as u32,
            shared_interest_members: shared,
            is_member,
        })
    }
}

fn provisioned_summary(group: &Group) -> GroupSummary {
    GroupSummary {
        group_id: group.id,
        name: group.name.clone(),
        subject: group.subject.clone(),
        description: group.description.clone(),
        member_count: 0,
        shared_interest_members: 0,
        is_member: false,
    }
}
