//! Error types for idvault stores.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("User name '{user_name}' is already taken")]
    DuplicateUserName { user_name: String },

    #[error("Role name '{role_name}' is already taken")]
    DuplicateRoleName { role_name: String },

    #[error("Role '{role_name}' does not exist")]
    RoleNotFound { role_name: String },

    #[error("Missing required argument: {name}")]
    InvalidArgument { name: &'static str },

    #[error("{store} has been disposed")]
    Disposed { store: &'static str },

    #[error("Database error: {0}")]
    Database(String),
}

impl IdentityError {
    /// Duplicate-name failures are expected outcomes the caller reports to
    /// the user, not store faults.
    pub fn is_validation_failure(&self) -> bool {
        matches!(
            self,
            IdentityError::DuplicateUserName { .. } | IdentityError::DuplicateRoleName { .. }
        )
    }
}

pub type IdentityResult<T> = Result<T, IdentityError>;

/// Rejects an empty required string argument before any I/O happens.
pub fn require(value: &str, name: &'static str) -> IdentityResult<()> {
    if value.trim().is_empty() {
        return Err(IdentityError::InvalidArgument { name });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_names_are_validation_failures() {
        let err = IdentityError::DuplicateUserName {
            user_name: "alice".into(),
        };
        assert!(err.is_validation_failure());
        assert_eq!(err.to_string(), "User name 'alice' is already taken");

        let err = IdentityError::Database("boom".into());
        assert!(!err.is_validation_failure());
    }

    #[test]
    fn require_rejects_blank() {
        assert!(matches!(
            require("  ", "user_id"),
            Err(IdentityError::InvalidArgument { name: "user_id" })
        ));
        assert!(require("abc", "user_id").is_ok());
    }
}
