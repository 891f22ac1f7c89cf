//! Core use-case services and the shared error taxonomy.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Map storage-level errors onto the caller-facing error kinds.
//!
//! # Invariants
//! - A detected invariant violation is always surfaced as a typed error,
//!   never swallowed.
//! - Transient store contention surfaces as a retryable `Unavailable` kind.

use crate::model::group::GroupId;
use crate::model::post::PostId;
use crate::model::user::UserId;
use crate::repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod engagement;
pub mod matcher;
pub mod membership;
pub mod resolver;
pub mod user_service;

pub type CoreResult<T> = Result<T, CoreError>;

/// Caller-facing error classification. The excluded HTTP layer maps these
/// onto status codes; the core only decides the kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed request input; not retryable, the caller must fix it.
    InvalidInput,
    /// A referenced entity is absent.
    NotFound,
    /// The caller lacks the required membership/authorship.
    Forbidden,
    /// An invariant rejected the operation.
    Conflict,
    /// No valid identity on the request.
    Unauthenticated,
    /// Transient store failure or contention; retryable with backoff.
    Unavailable,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InvalidInput => "invalid-input",
            Self::NotFound => "not-found",
            Self::Forbidden => "forbidden",
            Self::Conflict => "conflict",
            Self::Unauthenticated => "unauthenticated",
            Self::Unavailable => "unavailable",
        }
    }
}

/// Service-level error for the exposed core operations.
#[derive(Debug)]
pub enum CoreError {
    InvalidInput(&'static str),
    GroupNotFound(GroupId),
    UserNotFound(UserId),
    PostNotFound(PostId),
    Forbidden(&'static str),
    Conflict(&'static str),
    Unauthenticated,
    /// Persistence-layer failure; the store could not serve the request.
    Store(RepoError),
    /// Provisioning retries exhausted under write contention.
    Contended(&'static str),
}

impl CoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::GroupNotFound(_) | Self::UserNotFound(_) | Self::PostNotFound(_) => {
                ErrorKind::NotFound
            }
            Self::Forbidden(_) => ErrorKind::Forbidden,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::Unauthenticated => ErrorKind::Unauthenticated,
            Self::Store(_) | Self::Contended(_) => ErrorKind::Unavailable,
        }
    }
}

impl Display for CoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidInput(message) => write!(f, "invalid input: {message}"),
            Self::GroupNotFound(id) => write!(f, "group not found: {id}"),
            Self::UserNotFound(id) => write!(f, "user not found: {id}"),
            Self::PostNotFound(id) => write!(f, "post not found: {id}"),
            Self::Forbidden(reason) => write!(f, "forbidden: {reason}"),
            Self::Conflict(reason) => write!(f, "conflict: {reason}"),
            Self::Unauthenticated => write!(f, "unauthenticated"),
            Self::Store(err) => write!(f, "storage unavailable: {err}"),
            Self::Contended(operation) => {
                write!(f, "storage contended, retries exhausted: {operation}")
            }
        }
    }
}

impl Error for CoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for CoreError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::GroupNotFound(id) => Self::GroupNotFound(id),
            RepoError::UserNotFound(id) => Self::UserNotFound(id),
            RepoError::PostNotFound(id) => Self::PostNotFound(id),
            RepoError::EmailTaken(_) => Self::Conflict("email-already-registered"),
            other => Self::Store(other),
        }
    }
}
