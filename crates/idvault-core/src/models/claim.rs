//! Claim value type.

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::normalize::{fold_eq, fold_hash};

/// A `(type, value)` assertion about a principal.
///
/// Two claims are equal when both the type and the value match
/// case-insensitively. `Hash` agrees with that definition, so claims can be
/// collected into hash sets directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claim {
    pub claim_type: String,
    pub claim_value: String,
}

impl Claim {
    pub fn new(claim_type: impl Into<String>, claim_value: impl Into<String>) -> Self {
        Self {
            claim_type: claim_type.into(),
            claim_value: claim_value.into(),
        }
    }

    /// Case-insensitive match on type and value.
    pub fn matches(&self, other: &Claim) -> bool {
        fold_eq(&self.claim_type, &other.claim_type)
            && fold_eq(&self.claim_value, &other.claim_value)
    }
}

impl PartialEq for Claim {
    fn eq(&self, other: &Self) -> bool {
        self.matches(other)
    }
}

impl Eq for Claim {}

impl Hash for Claim {
    fn hash<H: Hasher>(&self, state: &mut H) {
        fold_hash(&self.claim_type, state);
        fold_hash(&self.claim_value, state);
    }
}

impl fmt::Display for Claim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.claim_type, self.claim_value)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn equal_when_type_and_value_match_ignoring_case() {
        let a = Claim::new("ClaimType1", "some value");
        let b = Claim::new("CLAIMTYPE1", "Some Value");
        assert_eq!(a, b);
        assert!(a.matches(&b));
        assert!(b.matches(&a));
    }

    #[test]
    fn different_value_is_not_equal() {
        let a = Claim::new("ClaimType1", "some value");
        let b = Claim::new("ClaimType1", "some value different");
        assert_ne!(a, b);
    }

    #[test]
    fn different_type_is_not_equal() {
        let a = Claim::new("ClaimType1", "some value");
        let b = Claim::new("ClaimType2", "some value");
        assert_ne!(a, b);
    }

    #[test]
    fn hash_agrees_with_equality() {
        let set: HashSet<Claim> = [
            Claim::new("role", "Admin"),
            Claim::new("ROLE", "admin"),
            Claim::new("role", "user"),
        ]
        .into_iter()
        .collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn field_boundaries_affect_hash_equality() {
        let a = Claim::new("ab", "c");
        let b = Claim::new("a", "bc");
        assert_ne!(a, b);
        let set: HashSet<Claim> = [a, b].into_iter().collect();
        assert_eq!(set.len(), 2);
    }
}
