//! Database-specific error types and conversions.

use idvault_core::error::IdentityError;

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SurrealDB error: {0}")]
    Surreal(#[from] surrealdb::Error),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Bootstrap failed: {0}")]
    Bootstrap(String),

    #[error("Invalid table name: {0:?}")]
    InvalidTableName(String),
}

impl From<DbError> for IdentityError {
    fn from(err: DbError) -> Self {
        IdentityError::Database(err.to_string())
    }
}

/// Whether a write was rejected by a unique index or because the record id
/// is already taken.
pub(crate) fn is_duplicate(err: &surrealdb::Error) -> bool {
    let message = err.to_string();
    message.contains("already contains") || message.contains("already exists")
}

/// Maps a failed write, reporting unique violations with `duplicate`.
pub(crate) fn write_error(
    err: surrealdb::Error,
    duplicate: impl FnOnce() -> IdentityError,
) -> IdentityError {
    if is_duplicate(&err) {
        duplicate()
    } else {
        DbError::Query(err.to_string()).into()
    }
}
