//! User registration and profile use-case service.
//!
//! # Responsibility
//! - Register students with a validated institutional email.
//! - Maintain the mutable interest-tag set feeding the resolver.
//!
//! # Invariants
//! - Only institutional addresses are accepted at registration.
//! - Interest tags are trimmed and deduplicated but never case-folded;
//!   matching is case-sensitive by contract.

use crate::model::user::{User, UserId};
use crate::repo::user_repo::UserRepository;
use crate::service::{CoreError, CoreResult};
use log::info;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;

static INSTITUTIONAL_EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+-]+@(student\.elte\.hu|inf\.elte\.hu)$")
        .expect("valid institutional email regex")
});

/// User service facade over the user repository.
pub struct UserService<R: UserRepository> {
    repo: R,
}

impl<R: UserRepository> UserService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Registers a new student. The email must be an institutional address
    /// and not yet registered; the major is mandatory.
    pub fn register(
        &mut self,
        email: &str,
        name: &str,
        major: &str,
        interests: Vec<String>,
    ) -> CoreResult<User> {
        let email = email.trim();
        if !INSTITUTIONAL_EMAIL_RE.is_match(email) {
            return Err(CoreError::InvalidInput(
                "email must be an institutional address",
            ));
        }
        let name = name.trim();
        if name.is_empty() {
            return Err(CoreError::InvalidInput("name must not be empty"));
        }
        let major = major.trim();
        if major.is_empty() {
            return Err(CoreError::InvalidInput("major must not be empty"));
        }

        let user = User::new(email, name, major, normalize_interests(interests));
        self.repo.create_user(&user)?;

        info!(
            "event=user_registered module=users status=ok user_id={} major={:?}",
            user.id, user.major
        );
        Ok(user)
    }

    /// Atomically replaces the user's interest-tag set and returns the
    /// stored result.
    pub fn update_interests(
        &mut self,
        user_id: UserId,
        interests: Vec<String>,
    ) -> CoreResult<BTreeSet<String>> {
        let normalized = normalize_interests(interests);
        self.repo.replace_interests(user_id, &normalized)?;
        Ok(normalized)
    }

    /// Returns the user's interest-tag set (the resolver's scoring input).
    pub fn interests_of(&self, user_id: UserId) -> CoreResult<BTreeSet<String>> {
        Ok(self.repo.interests_of(user_id)?)
    }

    /// Gets one user profile by stable ID.
    pub fn get_user(&self, user_id: UserId) -> CoreResult<User> {
        self.repo
            .get_user(user_id)?
            .ok_or(CoreError::UserNotFound(user_id))
    }
}

/// Trims tags, drops empties and deduplicates, preserving case.
pub fn normalize_interests(interests: Vec<String>) -> BTreeSet<String> {
    interests
        .into_iter()
        .map(|interest| interest.trim().to_string())
        .filter(|interest| !interest.is_empty())
        .collect()
}
