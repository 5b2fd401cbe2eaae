//! External login value type.

use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::normalize::{fold_eq, fold_hash};

/// A reference to an identity held by an external provider
/// (e.g. google, github).
///
/// Identity is the `(login_provider, provider_key)` pair compared
/// case-insensitively. The display name is payload and takes no part in
/// equality or hashing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Login {
    pub login_provider: String,
    pub provider_key: String,
    pub provider_display_name: Option<String>,
}

impl Login {
    pub fn new(
        login_provider: impl Into<String>,
        provider_key: impl Into<String>,
        provider_display_name: Option<String>,
    ) -> Self {
        Self {
            login_provider: login_provider.into(),
            provider_key: provider_key.into(),
            provider_display_name,
        }
    }

    /// Case-insensitive match on provider and key.
    pub fn matches(&self, other: &Login) -> bool {
        self.is_for(&other.login_provider, &other.provider_key)
    }

    /// Whether this login is the given provider/key pair, ignoring case.
    pub fn is_for(&self, login_provider: &str, provider_key: &str) -> bool {
        fold_eq(&self.login_provider, login_provider) && fold_eq(&self.provider_key, provider_key)
    }
}

impl PartialEq for Login {
    fn eq(&self, other: &Self) -> bool {
        self.matches(other)
    }
}

impl Eq for Login {}

impl Hash for Login {
    fn hash<H: Hasher>(&self, state: &mut H) {
        fold_hash(&self.login_provider, state);
        fold_hash(&self.provider_key, state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn login(provider: &str, key: &str, display: &str) -> Login {
        Login::new(provider, key, Some(display.to_string()))
    }

    #[test]
    fn equal_ignores_case_and_display_name() {
        let a = login("Google", "KEY-1", "Alice");
        let b = login("google", "key-1", "Someone else");
        assert_eq!(a, b);
    }

    #[test]
    fn different_key_is_not_equal() {
        assert_ne!(login("google", "key", "x"), login("google", "key different", "x"));
    }

    #[test]
    fn different_provider_is_not_equal() {
        assert_ne!(login("google", "key", "x"), login("github", "key", "x"));
    }

    #[test]
    fn is_for_matches_case_insensitively() {
        let l = login("a login provider", "key", "display name");
        assert!(l.is_for("A LOGIN PROVIDER", "KEY"));
        assert!(!l.is_for("a login provider", "other"));
    }
}
