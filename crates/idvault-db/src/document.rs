//! DB-side document shapes and conversions to the domain models.
//!
//! `*Content` structs are written with `CONTENT $content` and carry no id;
//! the record id is the entity id. `*RowWithId` structs read it back through
//! `meta::id(id) AS record_id`.

use chrono::{DateTime, Utc};
use idvault_core::models::{Claim, Login, Role, User};
use surrealdb_types::SurrealValue;

#[derive(Debug, Clone, SurrealValue)]
pub(crate) struct ClaimDoc {
    claim_type: String,
    claim_value: String,
}

impl From<&Claim> for ClaimDoc {
    fn from(claim: &Claim) -> Self {
        Self {
            claim_type: claim.claim_type.clone(),
            claim_value: claim.claim_value.clone(),
        }
    }
}

impl From<ClaimDoc> for Claim {
    fn from(doc: ClaimDoc) -> Self {
        Claim::new(doc.claim_type, doc.claim_value)
    }
}

#[derive(Debug, Clone, SurrealValue)]
pub(crate) struct LoginDoc {
    login_provider: String,
    provider_key: String,
    provider_display_name: Option<String>,
}

impl From<&Login> for LoginDoc {
    fn from(login: &Login) -> Self {
        Self {
            login_provider: login.login_provider.clone(),
            provider_key: login.provider_key.clone(),
            provider_display_name: login.provider_display_name.clone(),
        }
    }
}

impl From<LoginDoc> for Login {
    fn from(doc: LoginDoc) -> Self {
        Login::new(doc.login_provider, doc.provider_key, doc.provider_display_name)
    }
}

/// A role as embedded inside a user document. Unlike the role table, the
/// id travels inside the object so fan-out updates can match on it.
#[derive(Debug, Clone, SurrealValue)]
pub(crate) struct RoleSnapshot {
    id: String,
    name: String,
    normalized_name: String,
    claims: Vec<ClaimDoc>,
}

impl From<&Role> for RoleSnapshot {
    fn from(role: &Role) -> Self {
        Self {
            id: role.id.clone(),
            name: role.name.clone(),
            normalized_name: role.normalized_name.clone(),
            claims: claim_docs(&role.claims),
        }
    }
}

impl From<RoleSnapshot> for Role {
    fn from(doc: RoleSnapshot) -> Self {
        Role {
            id: doc.id,
            name: doc.name,
            normalized_name: doc.normalized_name,
            claims: doc.claims.into_iter().map(Claim::from).collect(),
        }
    }
}

#[derive(Debug, SurrealValue)]
pub(crate) struct RoleContent {
    name: String,
    normalized_name: String,
    claims: Vec<ClaimDoc>,
}

impl From<&Role> for RoleContent {
    fn from(role: &Role) -> Self {
        Self {
            name: role.name.clone(),
            normalized_name: role.normalized_name.clone(),
            claims: claim_docs(&role.claims),
        }
    }
}

#[derive(Debug, SurrealValue)]
pub(crate) struct RoleRowWithId {
    record_id: String,
    name: String,
    normalized_name: String,
    claims: Vec<ClaimDoc>,
}

impl From<RoleRowWithId> for Role {
    fn from(row: RoleRowWithId) -> Self {
        Role {
            id: row.record_id,
            name: row.name,
            normalized_name: row.normalized_name,
            claims: row.claims.into_iter().map(Claim::from).collect(),
        }
    }
}

#[derive(Debug, SurrealValue)]
pub(crate) struct UserContent {
    user_name: String,
    normalized_user_name: String,
    email: Option<String>,
    normalized_email: Option<String>,
    email_confirmed: bool,
    password_hash: Option<String>,
    security_stamp: Option<String>,
    phone_number: Option<String>,
    phone_number_confirmed: bool,
    two_factor_enabled: bool,
    lockout_end: Option<DateTime<Utc>>,
    lockout_enabled: bool,
    access_failed_count: u32,
    claims: Vec<ClaimDoc>,
    logins: Vec<LoginDoc>,
    roles: Vec<RoleSnapshot>,
}

impl From<&User> for UserContent {
    fn from(user: &User) -> Self {
        Self {
            user_name: user.user_name.clone(),
            normalized_user_name: user.normalized_user_name.clone(),
            email: user.email.clone(),
            normalized_email: user.normalized_email.clone(),
            email_confirmed: user.email_confirmed,
            password_hash: user.password_hash.clone(),
            security_stamp: user.security_stamp.clone(),
            phone_number: user.phone_number.clone(),
            phone_number_confirmed: user.phone_number_confirmed,
            two_factor_enabled: user.two_factor_enabled,
            lockout_end: user.lockout_end,
            lockout_enabled: user.lockout_enabled,
            access_failed_count: user.access_failed_count,
            claims: claim_docs(&user.claims),
            logins: login_docs(&user.logins),
            roles: role_snapshots(&user.roles),
        }
    }
}

#[derive(Debug, SurrealValue)]
pub(crate) struct UserRowWithId {
    record_id: String,
    user_name: String,
    normalized_user_name: String,
    email: Option<String>,
    normalized_email: Option<String>,
    email_confirmed: bool,
    password_hash: Option<String>,
    security_stamp: Option<String>,
    phone_number: Option<String>,
    phone_number_confirmed: bool,
    two_factor_enabled: bool,
    lockout_end: Option<DateTime<Utc>>,
    lockout_enabled: bool,
    access_failed_count: u32,
    claims: Vec<ClaimDoc>,
    logins: Vec<LoginDoc>,
    roles: Vec<RoleSnapshot>,
}

impl From<UserRowWithId> for User {
    fn from(row: UserRowWithId) -> Self {
        User {
            id: row.record_id,
            user_name: row.user_name,
            normalized_user_name: row.normalized_user_name,
            email: row.email,
            normalized_email: row.normalized_email,
            email_confirmed: row.email_confirmed,
            password_hash: row.password_hash,
            security_stamp: row.security_stamp,
            phone_number: row.phone_number,
            phone_number_confirmed: row.phone_number_confirmed,
            two_factor_enabled: row.two_factor_enabled,
            lockout_end: row.lockout_end,
            lockout_enabled: row.lockout_enabled,
            access_failed_count: row.access_failed_count,
            claims: row.claims.into_iter().map(Claim::from).collect(),
            logins: row.logins.into_iter().map(Login::from).collect(),
            roles: row.roles.into_iter().map(Role::from).collect(),
        }
    }
}

pub(crate) fn claim_docs(claims: &[Claim]) -> Vec<ClaimDoc> {
    claims.iter().map(ClaimDoc::from).collect()
}

pub(crate) fn login_docs(logins: &[Login]) -> Vec<LoginDoc> {
    logins.iter().map(LoginDoc::from).collect()
}

pub(crate) fn role_snapshots(roles: &[Role]) -> Vec<RoleSnapshot> {
    roles.iter().map(RoleSnapshot::from).collect()
}
