//! Domain models for idvault.
//!
//! `Claim` and `Login` are value objects with case-insensitive equality.
//! `User` and `Role` are the two persisted aggregates.

pub mod claim;
pub mod login;
pub mod role;
pub mod user;

pub use claim::Claim;
pub use login::Login;
pub use role::Role;
pub use user::User;

/// Fresh opaque identifier for a new user or role.
pub fn generate_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
