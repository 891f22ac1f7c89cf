//! User domain model.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

/// Stable identifier for a registered user.
pub type UserId = Uuid;

/// Registered student profile.
///
/// Users are created at registration and never physically deleted; the
/// surrounding system owns any soft-delete semantics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Stable global ID.
    pub id: UserId,
    /// Institutional email address, unique across users.
    pub email: String,
    /// Display name.
    pub name: String,
    /// Declared subject major.
    pub major: String,
    /// Free-text interest tags. Compared case-sensitively on the exact
    /// strings; only the owning user may change them.
    pub interests: BTreeSet<String>,
    /// Creation timestamp in epoch milliseconds.
    pub created_at: i64,
}

impl User {
    /// Creates a new user with a generated stable ID.
    pub fn new(
        email: impl Into<String>,
        name: impl Into<String>,
        major: impl Into<String>,
        interests: BTreeSet<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: email.into(),
            name: name.into(),
            major: major.into(),
            interests,
            created_at: super::now_millis(),
        }
    }
}
