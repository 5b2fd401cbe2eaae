//! idvault core: identity model, value equality and store traits.
//!
//! Users embed snapshots of the roles they hold. The traits in [`store`]
//! describe how those snapshots are kept in step with the role table; the
//! `idvault-db` crate implements them on SurrealDB.

pub mod error;
pub mod models;
pub mod normalize;
pub mod set;
pub mod store;

pub use error::{IdentityError, IdentityResult};
pub use normalize::{CaseFold, Normalizer};
pub use store::{Propagation, RoleStore, UserStore};
