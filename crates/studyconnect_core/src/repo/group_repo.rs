//! Group repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide the candidate queries the resolver scores (fuzzy subject
//!   search, member counts, member interest sets).
//! - Own lazy group provisioning with its create-if-absent discipline.
//!
//! # Invariants
//! - Candidate ordering is fixed (`created_at, ordinal, id` ascending) so
//!   first-encountered tie-breaks resolve deterministically.
//! - Provisioning re-checks its precondition inside the same IMMEDIATE
//!   transaction as the insert; `UNIQUE (subject, ordinal)` rejects any
//!   duplicate that slips past the write lock.

use crate::model::group::{Group, GroupId};
use crate::model::user::UserId;
use crate::repo::{is_constraint_violation, parse_uuid, RepoResult};
use rusqlite::{params, Connection, Row, Transaction, TransactionBehavior};
use std::collections::BTreeSet;

const GROUP_SELECT_SQL: &str = "SELECT
    id,
    subject,
    ordinal,
    name,
    description,
    creator_id,
    created_at
FROM groups";

/// Result of one provisioning attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisionOutcome {
    /// The group was created by this writer.
    Created(Group),
    /// Another writer satisfied the precondition first; the caller should
    /// re-read the candidate set and re-evaluate.
    Raced,
}

/// Repository interface for group lookup, scoring inputs and provisioning.
pub trait GroupRepository {
    /// Lists groups whose subject contains `query` (case-insensitive
    /// substring), in stable first-created order.
    fn search_groups_by_subject(&self, query: &str) -> RepoResult<Vec<Group>>;
    /// Gets one group by stable ID.
    fn get_group(&self, group_id: GroupId) -> RepoResult<Option<Group>>;
    /// Returns one interest set per current member of the group. The vector
    /// length is the group's member count.
    fn member_interest_sets(&self, group_id: GroupId) -> RepoResult<Vec<BTreeSet<String>>>;
    /// Whether the user currently holds a membership in the group.
    fn is_member(&self, user_id: UserId, group_id: GroupId) -> RepoResult<bool>;
    /// Creates the `#1` group for a subject no existing group matches.
    /// Precondition (re-checked under the write lock): no group matches
    /// `subject` as a fuzzy query.
    fn create_first_group(&mut self, subject: &str, creator_id: UserId)
        -> RepoResult<ProvisionOutcome>;
    /// Creates a fresh zero-member group for a subject whose matched groups
    /// are all populated. Precondition (re-checked under the write lock):
    /// no zero-member group matches `subject` as a fuzzy query.
    fn create_overflow_group(
        &mut self,
        subject: &str,
        creator_id: UserId,
    ) -> RepoResult<ProvisionOutcome>;
}

/// SQLite-backed group repository.
pub struct SqliteGroupRepository<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> SqliteGroupRepository<'conn> {
    pub fn new(conn: &'conn mut Connection) -> Self {
        Self { conn }
    }
}

impl GroupRepository for SqliteGroupRepository<'_> {
    fn search_groups_by_subject(&self, query: &str) -> RepoResult<Vec<Group>> {
        let mut stmt = self.conn.prepare(&format!(
            "{GROUP_SELECT_SQL}
             WHERE instr(lower(subject), lower(?1)) > 0
             ORDER BY created_at ASC, ordinal ASC, id ASC;"
        ))?;

        let mut rows = stmt.query([query])?;
        let mut groups = Vec::new();
        while let Some(row) = rows.next()? {
            groups.push(parse_group_row(row)?);
        }

        Ok(groups)
    }

    fn get_group(&self, group_id: GroupId) -> RepoResult<Option<Group>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{GROUP_SELECT_SQL} WHERE id = ?1;"))?;

        let mut rows = stmt.query([group_id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_group_row(row)?));
        }

        Ok(None)
    }

    fn member_interest_sets(&self, group_id: GroupId) -> RepoResult<Vec<BTreeSet<String>>> {
        let mut stmt = self.conn.prepare(
            "SELECT m.user_id, ui.interest
             FROM group_members m
             LEFT JOIN user_interests ui ON ui.user_id = m.user_id
             WHERE m.group_id = ?1
             ORDER BY m.user_id ASC;",
        )?;

        let mut rows = stmt.query([group_id.to_string()])?;
        let mut sets: Vec<BTreeSet<String>> = Vec::new();
        let mut current_member: Option<String> = None;
        while let Some(row) = rows.next()? {
            let member: String = row.get(0)?;
            if current_member.as_deref() != Some(member.as_str()) {
                current_member = Some(member);
                sets.push(BTreeSet::new());
            }
            if let Some(interest) = row.get::<_, Option<String>>(1)? {
                if let Some(set) = sets.last_mut() {
                    set.insert(interest);
                }
            }
        }

        Ok(sets)
    }

    fn is_member(&self, user_id: UserId, group_id: GroupId) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(
                SELECT 1 FROM group_members WHERE user_id = ?1 AND group_id = ?2
            );",
            params![user_id.to_string(), group_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    fn create_first_group(
        &mut self,
        subject: &str,
        creator_id: UserId,
    ) -> RepoResult<ProvisionOutcome> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let any_match: i64 = tx.query_row(
            "SELECT EXISTS(
                SELECT 1 FROM groups WHERE instr(lower(subject), lower(?1)) > 0
            );",
            [subject],
            |row| row.get(0),
        )?;
        if any_match == 1 {
            return Ok(ProvisionOutcome::Raced);
        }

        let group = Group::provisioned(subject, 1, creator_id);
        if !insert_group(&tx, &group)? {
            return Ok(ProvisionOutcome::Raced);
        }
        tx.commit()?;
        Ok(ProvisionOutcome::Created(group))
    }

    fn create_overflow_group(
        &mut self,
        subject: &str,
        creator_id: UserId,
    ) -> RepoResult<ProvisionOutcome> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let empty_exists: i64 = tx.query_row(
            "SELECT EXISTS(
                SELECT 1 FROM groups g
                WHERE instr(lower(g.subject), lower(?1)) > 0
                  AND NOT EXISTS (
                      SELECT 1 FROM group_members m WHERE m.group_id = g.id
                  )
            );",
            [subject],
            |row| row.get(0),
        )?;
        if empty_exists == 1 {
            return Ok(ProvisionOutcome::Raced);
        }

        // Ordinal is allocated per exact stored subject so the generation
        // sequence stays dense under the unique constraint.
        let next_ordinal: u32 = tx.query_row(
            "SELECT COALESCE(MAX(ordinal), 0) + 1 FROM groups WHERE subject = ?1;",
            [subject],
            |row| row.get(0),
        )?;

        let group = Group::provisioned(subject, next_ordinal, creator_id);
        if !insert_group(&tx, &group)? {
            return Ok(ProvisionOutcome::Raced);
        }
        tx.commit()?;
        Ok(ProvisionOutcome::Created(group))
    }
}

/// Returns `false` when the unique `(subject, ordinal)` constraint rejected
/// the insert, meaning another writer won the generation slot.
fn insert_group(tx: &Transaction<'_>, group: &Group) -> RepoResult<bool> {
    let inserted = tx.execute(
        "INSERT INTO groups (id, subject, ordinal, name, description, creator_id, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
        params![
            group.id.to_string(),
            group.subject.as_str(),
            group.ordinal,
            group.name.as_str(),
            group.description.as_str(),
            group.creator_id.to_string(),
            group.created_at,
        ],
    );

    match inserted {
        Ok(_) => Ok(true),
        Err(err) if is_constraint_violation(&err) => Ok(false),
        Err(err) => Err(err.into()),
    }
}

fn parse_group_row(row: &Row<'_>) -> RepoResult<Group> {
    let id_text: String = row.get("id")?;
    let creator_text: String = row.get("creator_id")?;
    Ok(Group {
        id: parse_uuid(&id_text, "groups.id")?,
        subject: row.get("subject")?,
        ordinal: row.get("ordinal")?,
        name: row.get("name")?,
        description: row.get("description")?,
        creator_id: parse_uuid(&creator_text, "groups.creator_id")?,
        created_at: row.get("created_at")?,
    })
}
