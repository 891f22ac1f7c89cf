//! Core domain logic for StudyConnect group coordination.
//! This crate is the single source of truth for business invariants:
//! group recommendation, lazy provisioning, subject-exclusive membership
//! and per-user engagement state.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use logging::{default_log_level, init_logging, logging_status};
pub use model::group::{Group, GroupId, Membership};
pub use model::post::{Post, PostId};
pub use model::user::{User, UserId};
pub use repo::group_repo::{GroupRepository, ProvisionOutcome, SqliteGroupRepository};
pub use repo::membership_repo::{MembershipRepository, SqliteMembershipRepository};
pub use repo::post_repo::{PostRepository, SqlitePostRepository};
pub use repo::user_repo::{SqliteUserRepository, UserRepository};
pub use repo::{RepoError, RepoResult};
pub use service::engagement::EngagementTracker;
pub use service::matcher::shared_interest_members;
pub use service::membership::{JoinOutcome, MembershipGuard};
pub use service::resolver::{GroupResolver, GroupSummary, Recommendation};
pub use service::user_service::UserService;
pub use service::{CoreError, CoreResult, ErrorKind};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
