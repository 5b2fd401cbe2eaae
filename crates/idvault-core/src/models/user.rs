//! User domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::claim::Claim;
use crate::models::login::Login;
use crate::models::role::Role;
use crate::set;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Opaque identifier. An empty id is filled in on create.
    pub id: String,
    pub user_name: String,
    /// Maintained by the user store.
    pub normalized_user_name: String,
    pub email: Option<String>,
    /// Maintained by the user store.
    pub normalized_email: Option<String>,
    pub email_confirmed: bool,
    /// Salted hash produced by the caller; never a raw password.
    pub password_hash: Option<String>,
    /// Random value that changes whenever credentials change.
    pub security_stamp: Option<String>,
    pub phone_number: Option<String>,
    pub phone_number_confirmed: bool,
    pub two_factor_enabled: bool,
    /// Any instant in the past means the user is not locked out.
    pub lockout_end: Option<DateTime<Utc>>,
    pub lockout_enabled: bool,
    pub access_failed_count: u32,
    pub claims: Vec<Claim>,
    pub logins: Vec<Login>,
    /// Embedded role snapshots. The role table is authoritative; these
    /// copies may briefly lag behind a role update.
    pub roles: Vec<Role>,
}

impl User {
    /// New user with a generated id.
    pub fn new(user_name: impl Into<String>) -> Self {
        Self {
            id: crate::models::generate_id(),
            user_name: user_name.into(),
            ..Self::default()
        }
    }

    /// Own claims followed by every embedded role's claims, without
    /// duplicates.
    pub fn all_claims(&self) -> Vec<Claim> {
        let role_claims = self.roles.iter().flat_map(|r| r.claims.iter());
        set::union_distinct(self.claims.iter().chain(role_claims), Claim::matches)
    }

    pub fn has_password(&self) -> bool {
        self.password_hash.as_deref().is_some_and(|h| !h.is_empty())
    }

    pub fn is_locked_out(&self, now: DateTime<Utc>) -> bool {
        self.lockout_enabled && self.lockout_end.is_some_and(|end| end > now)
    }

    /// Records a failed access attempt and returns the new count.
    pub fn increment_access_failed_count(&mut self) -> u32 {
        self.access_failed_count = self.access_failed_count.saturating_add(1);
        self.access_failed_count
    }

    pub fn reset_access_failed_count(&mut self) {
        self.access_failed_count = 0;
    }

    /// Embedded snapshot for the role with the given normalized name.
    pub fn role_by_normalized_name(&self, normalized_name: &str) -> Option<&Role> {
        self.roles
            .iter()
            .find(|r| r.normalized_name == normalized_name)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    #[test]
    fn all_claims_is_deduplicated_union() {
        let c1 = Claim::new("ClaimType1", "some value");
        let c2 = Claim::new("ClaimType2", "some other value");
        let c3 = Claim::new("other type", "some other value");

        let mut user = User::new("alice");
        user.claims = vec![c1.clone(), c2.clone()];
        user.roles = vec![Role::new("Role 1").with_claims([
            Claim::new("CLAIMTYPE1", "SOME VALUE"),
            c3.clone(),
        ])];

        let all = user.all_claims();
        assert_eq!(all.len(), 3);
        assert_eq!(all, vec![c1, c2, c3]);
    }

    #[test]
    fn all_claims_dedupes_across_roles() {
        let shared = Claim::new("scope", "read");
        let mut user = User::new("bob");
        user.roles = vec![
            Role::new("a").with_claims([shared.clone()]),
            Role::new("b").with_claims([shared.clone()]),
        ];
        assert_eq!(user.all_claims(), vec![shared]);
    }

    #[test]
    fn all_claims_of_empty_user_is_empty() {
        assert!(User::new("carol").all_claims().is_empty());
    }

    #[test]
    fn new_users_get_distinct_ids() {
        assert_ne!(User::new("a").id, User::new("a").id);
    }

    #[test]
    fn lockout_requires_flag_and_future_end() {
        let now = Utc::now();
        let mut user = User::new("dave");
        user.lockout_end = Some(now + Duration::minutes(5));
        assert!(!user.is_locked_out(now));

        user.lockout_enabled = true;
        assert!(user.is_locked_out(now));

        user.lockout_end = Some(now - Duration::minutes(5));
        assert!(!user.is_locked_out(now));
    }

    #[test]
    fn access_failed_count_increments_and_resets() {
        let mut user = User::new("erin");
        assert_eq!(user.increment_access_failed_count(), 1);
        assert_eq!(user.increment_access_failed_count(), 2);
        user.reset_access_failed_count();
        assert_eq!(user.access_failed_count, 0);
    }

    #[test]
    fn has_password_ignores_empty_hash() {
        let mut user = User::new("frank");
        assert!(!user.has_password());
        user.password_hash = Some(String::new());
        assert!(!user.has_password());
        user.password_hash = Some("AQAAAAEAACcQ".into());
        assert!(user.has_password());
    }
}
