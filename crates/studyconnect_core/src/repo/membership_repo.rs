//! Membership repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Persist (user, group) memberships with their join timestamps.
//! - Evaluate the subject-exclusivity check and the membership write inside
//!   one transaction.
//!
//! # Invariants
//! - `(user_id, group_id)` is unique; `(user_id, subject)` is unique via
//!   the denormalized subject column.
//! - The subject column always mirrors `groups.subject` for the joined
//!   group; it is written only here, from the group row, under the same
//!   transaction.

use crate::model::group::{GroupId, Membership};
use crate::model::now_millis;
use crate::model::user::UserId;
use crate::repo::{is_constraint_violation, parse_uuid, RepoResult};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};

/// Storage-level outcome of a join write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinWrite {
    /// A new membership row was created.
    Inserted,
    /// The user already holds a membership in this exact group.
    AlreadyMember,
    /// The user already holds a membership in a sibling group of the same
    /// subject.
    DuplicateSubject,
    /// The target group does not exist.
    GroupMissing,
}

/// Storage-level outcome of a leave write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveWrite {
    Removed,
    NotMember,
}

/// Repository interface for membership writes and listings.
pub trait MembershipRepository {
    /// Runs the join rule sequence (group exists, subject exclusivity,
    /// exact-membership idempotency, insert) in one transaction.
    fn join_group(&mut self, user_id: UserId, group_id: GroupId) -> RepoResult<JoinWrite>;
    /// Removes the membership if present.
    fn leave_group(&mut self, user_id: UserId, group_id: GroupId) -> RepoResult<LeaveWrite>;
    /// Lists all memberships of one user, oldest join first.
    fn memberships_of(&self, user_id: UserId) -> RepoResult<Vec<Membership>>;
}

/// SQLite-backed membership repository.
pub struct SqliteMembershipRepository<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> SqliteMembershipRepository<'conn> {
    pub fn new(conn: &'conn mut Connection) -> Self {
        Self { conn }
    }
}

impl MembershipRepository for SqliteMembershipRepository<'_> {
    fn join_group(&mut self, user_id: UserId, group_id: GroupId) -> RepoResult<JoinWrite> {
        let user_id_text = user_id.to_string();
        let group_id_text = group_id.to_string();
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let subject: Option<String> = tx
            .query_row(
                "SELECT subject FROM groups WHERE id = ?1;",
                [group_id_text.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        let subject = match subject {
            Some(subject) => subject,
            None => return Ok(JoinWrite::GroupMissing),
        };

        let held: Option<String> = tx
            .query_row(
                "SELECT group_id FROM group_members WHERE user_id = ?1 AND subject = ?2;",
                params![user_id_text.as_str(), subject.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        match held {
            Some(held_group) if held_group == group_id_text => {
                return Ok(JoinWrite::AlreadyMember);
            }
            Some(_) => return Ok(JoinWrite::DuplicateSubject),
            None => {}
        }

        let inserted = tx.execute(
            "INSERT INTO group_members (user_id, group_id, subject, joined_at)
             VALUES (?1, ?2, ?3, ?4);",
            params![
                user_id_text.as_str(),
                group_id_text.as_str(),
                subject.as_str(),
                now_millis(),
            ],
        );
        if let Err(err) = inserted {
            // Backstop for a write conflict the pre-check could not see.
            if is_constraint_violation(&err) {
                return Ok(JoinWrite::DuplicateSubject);
            }
            return Err(err.into());
        }

        tx.commit()?;
        Ok(JoinWrite::Inserted)
    }

    fn leave_group(&mut self, user_id: UserId, group_id: GroupId) -> RepoResult<LeaveWrite> {
        let removed = self.conn.execute(
            "DELETE FROM group_members WHERE user_id = ?1 AND group_id = ?2;",
            params![user_id.to_string(), group_id.to_string()],
        )?;
        if removed == 0 {
            return Ok(LeaveWrite::NotMember);
        }
        Ok(LeaveWrite::Removed)
    }

    fn memberships_of(&self, user_id: UserId) -> RepoResult<Vec<Membership>> {
        let mut stmt = self.conn.prepare(
            "SELECT user_id, group_id, joined_at
             FROM group_members
             WHERE user_id = ?1
             ORDER BY joined_at ASC, group_id ASC;",
        )?;

        let mut rows = stmt.query([user_id.to_string()])?;
        let mut memberships = Vec::new();
        while let Some(row) = rows.next()? {
            let user_text: String = row.get("user_id")?;
            let group_text: String = row.get("group_id")?;
            memberships.push(Membership {
                user_id: parse_uuid(&user_text, "group_members.user_id")?,
                group_id: parse_uuid(&group_text, "group_members.group_id")?,
                joined_at: row.get("joined_at")?,
            });
        }

        Ok(memberships)
    }
}
