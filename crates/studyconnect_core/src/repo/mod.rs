//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts.
//! - Isolate SQLite query details from service/business orchestration.
//!
//! # Invariants
//! - Group and membership writes happen only through the group/membership
//!   repositories; view records only through the post repository.
//! - Multi-step writes run inside IMMEDIATE transactions so invariant
//!   checks and the write they guard cannot interleave with another writer.
//! - Repository APIs return semantic errors (`GroupNotFound`, `EmailTaken`)
//!   in addition to DB transport errors.

use crate::db::DbError;
use crate::model::group::GroupId;
use crate::model::post::PostId;
use crate::model::user::UserId;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub mod group_repo;
pub mod membership_repo;
pub mod post_repo;
pub mod user_repo;

pub type RepoResult<T> = Result<T, RepoError>;

/// Generic repository error for persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    GroupNotFound(GroupId),
    UserNotFound(UserId),
    PostNotFound(PostId),
    /// The unique email constraint rejected a registration.
    EmailTaken(String),
    InvalidData(String),
}

impl RepoError {
    /// Whether the underlying failure is transient store contention.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Db(err) => err.is_transient(),
            _ => false,
        }
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::GroupNotFound(id) => write!(f, "group not found: {id}"),
            Self::UserNotFound(id) => write!(f, "user not found: {id}"),
            Self::PostNotFound(id) => write!(f, "post not found: {id}"),
            Self::EmailTaken(email) => write!(f, "email already registered: {email}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

pub(crate) fn parse_uuid(value: &str, column: &str) -> RepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid value `{value}` in {column}")))
}

/// Whether a SQLite error is a constraint violation (unique/primary key).
pub(crate) fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.code == rusqlite::ErrorCode::ConstraintViolation
    )
}
