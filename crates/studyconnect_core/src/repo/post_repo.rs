//! Post and view-record repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Persist posts (the minimal write surface the engagement state needs).
//! - Own all reads/writes of `post_views` and the unread-set queries.
//!
//! # Invariants
//! - A post is unread for a member when it is active, created at or after
//!   the member's join timestamp, authored by someone else, and has no view
//!   record for that member.
//! - View-record creation is append-only and idempotent (`INSERT OR
//!   IGNORE` over the composite primary key).

use crate::model::group::GroupId;
use crate::model::now_millis;
use crate::model::post::{Post, PostId};
use crate::model::user::UserId;
use crate::repo::{parse_uuid, RepoError, RepoResult};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};

/// Storage-level outcome of a mark-read write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkReadWrite {
    /// View records were inserted for this many previously-unread posts.
    Marked(u32),
    /// The caller holds no membership in the group.
    NotMember,
    /// The target group does not exist.
    GroupMissing,
}

/// Repository interface for posts and engagement state.
pub trait PostRepository {
    /// Persists a new post and returns its stable id.
    fn create_post(&mut self, post: &Post) -> RepoResult<PostId>;
    /// Marks a post as softly deleted (tombstoned).
    fn soft_delete_post(&mut self, post_id: PostId) -> RepoResult<()>;
    /// Gets one post by id, tombstoned or not.
    fn get_post(&self, post_id: PostId) -> RepoResult<Option<Post>>;
    /// Returns `(group_id, unread_count)` for every group the user belongs
    /// to, including zero counts.
    fn unread_counts(&self, user_id: UserId) -> RepoResult<Vec<(GroupId, u32)>>;
    /// Inserts view records for every currently-unread post of the group,
    /// in one transaction.
    fn mark_group_read(&mut self, user_id: UserId, group_id: GroupId)
        -> RepoResult<MarkReadWrite>;
    /// Whether a view record exists for the (user, post) pair.
    fn has_view(&self, user_id: UserId, post_id: PostId) -> RepoResult<bool>;
}

/// SQLite-backed post/view repository.
pub struct SqlitePostRepository<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> SqlitePostRepository<'conn> {
    pub fn new(conn: &'conn mut Connection) -> Self {
        Self { conn }
    }
}

impl PostRepository for SqlitePostRepository<'_> {
    fn create_post(&mut self, post: &Post) -> RepoResult<PostId> {
        self.conn.execute(
            "INSERT INTO posts (id, group_id, author_id, title, content, created_at, deleted_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                post.id.to_string(),
                post.group_id.to_string(),
                post.author_id.to_string(),
                post.title.as_str(),
                post.content.as_str(),
                post.created_at,
                post.deleted_at,
            ],
        )?;

        Ok(post.id)
    }

    fn soft_delete_post(&mut self, post_id: PostId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE posts SET deleted_at = ?1 WHERE id = ?2 AND deleted_at IS NULL;",
            params![now_millis(), post_id.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::PostNotFound(post_id));
        }
        Ok(())
    }

    fn get_post(&self, post_id: PostId) -> RepoResult<Option<Post>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, group_id, author_id, title, content, created_at, deleted_at
             FROM posts
             WHERE id = ?1;",
        )?;

        let mut rows = stmt.query([post_id.to_string()])?;
        if let Some(row) = rows.next()? {
            let id_text: String = row.get("id")?;
            let group_text: String = row.get("group_id")?;
            let author_text: String = row.get("author_id")?;
            return Ok(Some(Post {
                id: parse_uuid(&id_text, "posts.id")?,
                group_id: parse_uuid(&group_text, "posts.group_id")?,
                author_id: parse_uuid(&author_text, "posts.author_id")?,
                title: row.get("title")?,
                content: row.get("content")?,
                created_at: row.get("created_at")?,
                deleted_at: row.get("deleted_at")?,
            }));
        }

        Ok(None)
    }

    fn unread_counts(&self, user_id: UserId) -> RepoResult<Vec<(GroupId, u32)>> {
        let mut stmt = self.conn.prepare(
            "SELECT m.group_id, COUNT(p.id)
             FROM group_members m
             LEFT JOIN posts p
                    ON p.group_id = m.group_id
                   AND p.deleted_at IS NULL
                   AND p.created_at >= m.joined_at
                   AND p.author_id <> m.user_id
                   AND NOT EXISTS (
                       SELECT 1 FROM post_views v
                       WHERE v.user_id = m.user_id AND v.post_id = p.id
                   )
             WHERE m.user_id = ?1
             GROUP BY m.group_id
             ORDER BY m.group_id ASC;",
        )?;

        let mut rows = stmt.query([user_id.to_string()])?;
        let mut counts = Vec::new();
        while let Some(row) = rows.next()? {
            let group_text: String = row.get(0)?;
            counts.push((
                parse_uuid(&group_text, "group_members.group_id")?,
                row.get::<_, u32>(1)?,
            ));
        }

        Ok(counts)
    }

    fn mark_group_read(
        &mut self,
        user_id: UserId,
        group_id: GroupId,
    ) -> RepoResult<MarkReadWrite> {
        let user_id_text = user_id.to_string();
        let group_id_text = group_id.to_string();
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let group_exists: i64 = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM groups WHERE id = ?1);",
            [group_id_text.as_str()],
            |row| row.get(0),
        )?;
        if group_exists == 0 {
            return Ok(MarkReadWrite::GroupMissing);
        }

        let joined_at: Option<i64> = tx
            .query_row(
                "SELECT joined_at FROM group_members WHERE user_id = ?1 AND group_id = ?2;",
                params![user_id_text.as_str(), group_id_text.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        let joined_at = match joined_at {
            Some(joined_at) => joined_at,
            None => return Ok(MarkReadWrite::NotMember),
        };

        let inserted = tx.execute(
            "INSERT OR IGNORE INTO post_views (user_id, post_id, viewed_at)
             SELECT ?1, p.id, ?2
             FROM posts p
             WHERE p.group_id = ?3
               AND p.deleted_at IS NULL
               AND p.created_at >= ?4
               AND p.author_id <> ?1;",
            params![
                user_id_text.as_str(),
                now_millis(),
                group_id_text.as_str(),
                joined_at,
            ],
        )?;

        tx.commit()?;
        Ok(MarkReadWrite::Marked(inserted as u32))
    }

    fn has_view(&self, user_id: UserId, post_id: PostId) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(
                SELECT 1 FROM post_views WHERE user_id = ?1 AND post_id = ?2
            );",
            params![user_id.to_string(), post_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }
}
