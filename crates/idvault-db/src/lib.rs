//! idvault Database: SurrealDB-backed identity stores.
//!
//! This crate provides:
//! - Connection management ([`DbManager`], [`DbConfig`])
//! - The shared store context and its options ([`IdentityContext`],
//!   [`IdentityOptions`]), including the idempotent table and index bootstrap
//! - [`SurrealUserStore`] and [`SurrealRoleStore`], implementing the
//!   `idvault-core` store traits
//! - Error types ([`DbError`])
//!
//! Users embed snapshots of their roles. Role writes go through
//! [`SurrealRoleStore`], which fans each change out to the embedding users
//! and reports the outcome as a [`Propagation`](idvault_core::Propagation).

mod connection;
mod context;
mod document;
mod error;
pub mod schema;
mod store;

pub use connection::{DbConfig, DbManager};
pub use context::{IdentityContext, IdentityOptions};
pub use error::DbError;
pub use store::{SurrealRoleStore, SurrealUserStore};
