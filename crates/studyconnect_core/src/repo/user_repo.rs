//! User repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Persist user profiles and their interest-tag sets.
//!
//! # Invariants
//! - `users.email` stays unique; a violated insert surfaces as `EmailTaken`.
//! - Interest replacement is atomic: the old set is never partially visible.
//! - Interest tags are stored verbatim (case-sensitive, no normalization).

use crate::model::user::{User, UserId};
use crate::repo::{is_constraint_violation, parse_uuid, RepoError, RepoResult};
use rusqlite::{params, Connection, TransactionBehavior};
use std::collections::BTreeSet;

/// Repository interface for user profiles and interests.
pub trait UserRepository {
    /// Persists a new user together with its interest set.
    fn create_user(&mut self, user: &User) -> RepoResult<()>;
    /// Gets one user (with interests) by stable ID.
    fn get_user(&self, user_id: UserId) -> RepoResult<Option<User>>;
    /// Finds a user by exact email.
    fn find_by_email(&self, email: &str) -> RepoResult<Option<User>>;
    /// Atomically replaces the full interest set for one user.
    fn replace_interests(&mut self, user_id: UserId, interests: &BTreeSet<String>)
        -> RepoResult<()>;
    /// Returns the interest set of one user; `UserNotFound` if absent.
    fn interests_of(&self, user_id: UserId) -> RepoResult<BTreeSet<String>>;
}

/// SQLite-backed user repository.
pub struct SqliteUserRepository<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> SqliteUserRepository<'conn> {
    pub fn new(conn: &'conn mut Connection) -> Self {
        Self { conn }
    }
}

impl UserRepository for SqliteUserRepository<'_> {
    fn create_user(&mut self, user: &User) -> RepoResult<()> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let inserted = tx.execute(
            "INSERT INTO users (id, email, name, major, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                user.id.to_string(),
                user.email.as_str(),
                user.name.as_str(),
                user.major.as_str(),
                user.created_at,
            ],
        );
        if let Err(err) = inserted {
            if is_constraint_violation(&err) {
                return Err(RepoError::EmailTaken(user.email.clone()));
            }
            return Err(err.into());
        }

        for interest in &user.interests {
            tx.execute(
                "INSERT INTO user_interests (user_id, interest) VALUES (?1, ?2);",
                params![user.id.to_string(), interest.as_str()],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    fn get_user(&self, user_id: UserId) -> RepoResult<Option<User>> {
        load_user(
            self.conn,
            "SELECT id, email, name, major, created_at FROM users WHERE id = ?1;",
            &user_id.to_string(),
        )
    }

    fn find_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        load_user(
            self.conn,
            "SELECT id, email, name, major, created_at FROM users WHERE email = ?1;",
            email,
        )
    }

    fn replace_interests(
        &mut self,
        user_id: UserId,
        interests: &BTreeSet<String>,
    ) -> RepoResult<()> {
        let user_id_text = user_id.to_string();
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        if !user_exists(&tx, &user_id_text)? {
            return Err(RepoError::UserNotFound(user_id));
        }

        tx.execute(
            "DELETE FROM user_interests WHERE user_id = ?1;",
            [user_id_text.as_str()],
        )?;
        for interest in interests {
            tx.execute(
                "INSERT INTO user_interests (user_id, interest) VALUES (?1, ?2);",
                params![user_id_text.as_str(), interest.as_str()],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    fn interests_of(&self, user_id: UserId) -> RepoResult<BTreeSet<String>> {
        let user_id_text = user_id.to_string();
        if !user_exists(self.conn, &user_id_text)? {
            return Err(RepoError::UserNotFound(user_id));
        }
        load_interests(self.conn, &user_id_text)
    }
}

fn load_user(conn: &Connection, sql: &str, key: &str) -> RepoResult<Option<User>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query([key])?;

    if let Some(row) = rows.next()? {
        let id_text: String = row.get("id")?;
        let id = parse_uuid(&id_text, "users.id")?;
        let interests = load_interests(conn, &id_text)?;
        return Ok(Some(User {
            id,
            email: row.get("email")?,
            name: row.get("name")?,
            major: row.get("major")?,
            interests,
            created_at: row.get("created_at")?,
        }));
    }

    Ok(None)
}

fn load_interests(conn: &Connection, user_id: &str) -> RepoResult<BTreeSet<String>> {
    let mut stmt = conn.prepare("SELECT interest FROM user_interests WHERE user_id = ?1;")?;
    let mut rows = stmt.query([user_id])?;
    let mut interests = BTreeSet::new();
    while let Some(row) = rows.next()? {
        interests.insert(row.get::<_, String>(0)?);
    }
    Ok(interests)
}

fn user_exists(conn: &Connection, user_id: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM users WHERE id = ?1);",
        [user_id],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}
