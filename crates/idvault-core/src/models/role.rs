//! Role domain model.

use serde::{Deserialize, Serialize};

use crate::models::claim::Claim;

/// A named group of claims.
///
/// The role table holds the authoritative copy. Users embed full snapshots
/// of their roles, which the role store keeps in sync.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Role {
    /// Opaque identifier. An empty id is filled in on create.
    pub id: String,
    pub name: String,
    /// Case-folded copy of `name` used for uniqueness and lookups.
    /// Maintained by the role store.
    pub normalized_name: String,
    pub claims: Vec<Claim>,
}

impl Role {
    /// New role with a generated id. The normalized name is derived when
    /// the role is handed to a store.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: crate::models::generate_id(),
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_claims(mut self, claims: impl IntoIterator<Item = Claim>) -> Self {
        for claim in claims {
            crate::set::add_distinct(&mut self.claims, claim, Claim::matches);
        }
        self
    }

    pub fn has_claim(&self, claim: &Claim) -> bool {
        self.claims.iter().any(|c| c.matches(claim))
    }
}
