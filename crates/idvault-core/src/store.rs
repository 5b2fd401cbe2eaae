//! Store trait definitions for user and role persistence.
//!
//! All persistence operations are async. Lookups return `Ok(None)` when
//! nothing matches, and deletes of missing records succeed. Once a store is
//! disposed every method, including the in-memory accessors, fails with
//! [`IdentityError::Disposed`](crate::error::IdentityError::Disposed).

use crate::error::IdentityResult;
use crate::models::{Claim, Login, Role, User};

/// Outcome of fanning a role change out to the users that embed it.
///
/// A role write is committed before fan-out starts, so a partial fan-out is
/// reported here rather than as an error. Users counted in `failed` keep a
/// stale snapshot until the role is written again.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Propagation {
    /// Users whose embedded roles referenced the role.
    pub matched: usize,
    pub updated: usize,
    pub failed: usize,
    /// The query for referencing users failed, so `matched` is unknown and
    /// no embedded copy was touched.
    pub lookup_failed: bool,
}

impl Propagation {
    pub fn is_complete(&self) -> bool {
        self.failed == 0 && !self.lookup_failed
    }
}

pub trait RoleStore: Send + Sync {
    /// Inserts the role, generating an id when it is empty.
    fn create(&self, role: &mut Role) -> impl Future<Output = IdentityResult<()>> + Send;
    /// Replaces (or inserts) the role, then refreshes every embedded copy.
    fn update(&self, role: &mut Role) -> impl Future<Output = IdentityResult<Propagation>> + Send;
    /// Removes the role and pulls it from every user that embeds it.
    fn delete(&self, role: &Role) -> impl Future<Output = IdentityResult<Propagation>> + Send;
    fn find_by_id(&self, role_id: &str)
    -> impl Future<Output = IdentityResult<Option<Role>>> + Send;
    fn find_by_normalized_name(
        &self,
        normalized_name: &str,
    ) -> impl Future<Output = IdentityResult<Option<Role>>> + Send;
    fn add_claim(
        &self,
        role: &mut Role,
        claim: Claim,
    ) -> impl Future<Output = IdentityResult<Propagation>> + Send;
    fn remove_claim(
        &self,
        role: &mut Role,
        claim: &Claim,
    ) -> impl Future<Output = IdentityResult<Propagation>> + Send;

    fn claims(&self, role: &Role) -> IdentityResult<Vec<Claim>>;
    fn role_id(&self, role: &Role) -> IdentityResult<String>;
    fn role_name(&self, role: &Role) -> IdentityResult<String>;
    fn normalized_role_name(&self, role: &Role) -> IdentityResult<String>;
    /// Sets the display name and derives the normalized name from it.
    fn set_role_name(&self, role: &mut Role, name: &str) -> IdentityResult<()>;
    /// Overrides the normalized name; the value is still case-folded.
    fn set_normalized_role_name(&self, role: &mut Role, normalized_name: &str)
    -> IdentityResult<()>;

    fn dispose(&self);
}

pub trait UserStore: Send + Sync {
    /// Inserts the user, generating an id when it is empty.
    fn create(&self, user: &mut User) -> impl Future<Output = IdentityResult<()>> + Send;
    /// Replaces (or inserts) the whole user document.
    fn update(&self, user: &mut User) -> impl Future<Output = IdentityResult<()>> + Send;
    fn delete(&self, user: &User) -> impl Future<Output = IdentityResult<()>> + Send;
    fn find_by_id(&self, user_id: &str)
    -> impl Future<Output = IdentityResult<Option<User>>> + Send;
    fn find_by_normalized_user_name(
        &self,
        normalized_user_name: &str,
    ) -> impl Future<Output = IdentityResult<Option<User>>> + Send;
    fn find_by_normalized_email(
        &self,
        normalized_email: &str,
    ) -> impl Future<Output = IdentityResult<Option<User>>> + Send;

    fn user_id(&self, user: &User) -> IdentityResult<String>;
    fn user_name(&self, user: &User) -> IdentityResult<String>;
    fn normalized_user_name(&self, user: &User) -> IdentityResult<String>;
    fn email(&self, user: &User) -> IdentityResult<Option<String>>;
    fn normalized_email(&self, user: &User) -> IdentityResult<Option<String>>;
    /// Sets the user name and derives the normalized name from it.
    fn set_user_name(&self, user: &mut User, user_name: &str) -> IdentityResult<()>;
    fn set_normalized_user_name(
        &self,
        user: &mut User,
        normalized_user_name: &str,
    ) -> IdentityResult<()>;
    /// Sets the email and derives (or clears) the normalized email.
    fn set_email(&self, user: &mut User, email: Option<&str>) -> IdentityResult<()>;
    fn set_normalized_email(
        &self,
        user: &mut User,
        normalized_email: Option<&str>,
    ) -> IdentityResult<()>;

    // -- Claims ----------------------------------------------------------

    /// The user's own claims merged with the claims of every embedded role.
    fn claims(&self, user: &User) -> IdentityResult<Vec<Claim>>;
    fn add_claims(
        &self,
        user: &mut User,
        claims: &[Claim],
    ) -> impl Future<Output = IdentityResult<()>> + Send;
    fn remove_claims(
        &self,
        user: &mut User,
        claims: &[Claim],
    ) -> impl Future<Output = IdentityResult<()>> + Send;
    fn replace_claim(
        &self,
        user: &mut User,
        claim: &Claim,
        new_claim: Claim,
    ) -> impl Future<Output = IdentityResult<()>> + Send;
    /// Users holding the claim directly or through an embedded role.
    fn users_for_claim(&self, claim: &Claim)
    -> impl Future<Output = IdentityResult<Vec<User>>> + Send;

    // -- Logins ----------------------------------------------------------

    fn logins(&self, user: &User) -> IdentityResult<Vec<Login>>;
    fn add_login(
        &self,
        user: &mut User,
        login: Login,
    ) -> impl Future<Output = IdentityResult<()>> + Send;
    fn remove_login(
        &self,
        user: &mut User,
        login_provider: &str,
        provider_key: &str,
    ) -> impl Future<Output = IdentityResult<()>> + Send;
    fn find_by_login(
        &self,
        login_provider: &str,
        provider_key: &str,
    ) -> impl Future<Output = IdentityResult<Option<User>>> + Send;

    // -- Role membership -------------------------------------------------

    /// Embeds a fresh snapshot of the named role.
    fn add_to_role(
        &self,
        user: &mut User,
        role_name: &str,
    ) -> impl Future<Output = IdentityResult<()>> + Send;
    fn remove_from_role(
        &self,
        user: &mut User,
        role_name: &str,
    ) -> impl Future<Output = IdentityResult<()>> + Send;
    /// Names of the embedded roles.
    fn roles(&self, user: &User) -> IdentityResult<Vec<String>>;
    fn is_in_role(&self, user: &User, role_name: &str) -> IdentityResult<bool>;
    fn users_in_role(&self, role_name: &str)
    -> impl Future<Output = IdentityResult<Vec<User>>> + Send;

    fn dispose(&self);
}
